//! 引擎仓储接口
//!
//! services 层依赖接口，具体实现分 MySQL（生产）与内存（dry-run/测试）两套。

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::trading::model::audit::AuditEntity;
use crate::trading::model::execution_log::ExecutionLogEntity;
use crate::trading::model::position::PositionEntity;
use crate::trading::model::risk_settings::RiskSettingsEntity;
use crate::trading::model::signal::SignalEntity;
use crate::trading::model::trade::TradeEntity;

pub use memory::MemEngineRepository;
pub use mysql::MysqlEngineRepository;

#[async_trait]
pub trait EngineRepository: Send + Sync {
    // ---- 信号 ----
    async fn insert_signal(&self, signal: &SignalEntity) -> Result<(), AppError>;
    async fn update_signal(&self, signal: &SignalEntity) -> Result<(), AppError>;
    async fn get_signal(&self, id: &str) -> Result<Option<SignalEntity>, AppError>;
    /// 创建时间早于 cutoff 且仍未到终态的信号（兜底回收用）
    async fn stale_pending_signals(&self, cutoff_ms: i64) -> Result<Vec<SignalEntity>, AppError>;

    // ---- 风控配置 / 账户 ----
    async fn get_risk_settings(&self, user_id: &str)
        -> Result<Option<RiskSettingsEntity>, AppError>;
    /// 账户净值（USD），账户管理侧维护，引擎只读
    async fn account_equity(&self, user_id: &str) -> Result<Option<Decimal>, AppError>;

    // ---- 持仓 ----
    async fn open_positions(&self, user_id: &str) -> Result<Vec<PositionEntity>, AppError>;
    /// strategy_id 传 Some 时要求策略也匹配（对冲模式），None 时同键任一 open 持仓即命中
    async fn find_open_position(
        &self,
        user_id: &str,
        exchange: &str,
        symbol: &str,
        strategy_id: Option<&str>,
    ) -> Result<Option<PositionEntity>, AppError>;
    async fn insert_position(&self, position: &PositionEntity) -> Result<(), AppError>;
    async fn update_position(&self, position: &PositionEntity) -> Result<(), AppError>;

    // ---- 订单 ----
    async fn insert_trade(&self, trade: &TradeEntity) -> Result<(), AppError>;
    async fn update_trade(&self, trade: &TradeEntity) -> Result<(), AppError>;
    /// 某持仓名下的全部订单（平仓时汇总历史已实现盈亏）
    async fn trades_by_position(&self, position_id: &str) -> Result<Vec<TradeEntity>, AppError>;
    async fn daily_trade_count(&self, user_id: &str, day_start_ms: i64) -> Result<i64, AppError>;
    async fn daily_realized_pnl(
        &self,
        user_id: &str,
        day_start_ms: i64,
    ) -> Result<Decimal, AppError>;

    // ---- 执行日志 ----
    async fn insert_execution_log(&self, entry: &ExecutionLogEntity) -> Result<(), AppError>;
    async fn update_execution_log(&self, entry: &ExecutionLogEntity) -> Result<(), AppError>;
    async fn find_execution_log_by_signal(
        &self,
        signal_id: &str,
    ) -> Result<Option<ExecutionLogEntity>, AppError>;

    // ---- 审计 ----
    async fn insert_audit(&self, entry: &AuditEntity) -> Result<(), AppError>;
}
