#![allow(dead_code)]
#![allow(unused_imports)]

pub mod app_config;
pub mod error;
pub mod job;
pub mod time_util;
pub mod trading;

use dotenv::dotenv;
use tracing::info;

use crate::app_config::env::env_is_true;

/// 应用初始化：加载环境变量，按需建立数据库连接
///
/// 干跑模式（IS_DRY_RUN=true）下不连接 MySQL，引擎使用内存仓储运行，
/// 方便本地调试与集成测试。
pub async fn app_init() -> anyhow::Result<()> {
    dotenv().ok();

    if env_is_true("IS_DRY_RUN", false) {
        info!("dry-run 模式，跳过数据库初始化");
        return Ok(());
    }

    app_config::db::init_db().await;
    info!("✓ 数据库连接池初始化成功");
    Ok(())
}
