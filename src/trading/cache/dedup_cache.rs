//! 信号去重缓存
//!
//! 指纹在窗口内首次出现返回 true（认领成功），窗口内重复返回 false。
//! 生产走 redis SET NX EX，多实例共享窗口；LOCAL/dry-run 退化为进程内
//! DashMap，由定时任务清理过期项。

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::app_config::env::env_is_true;
use crate::app_config::redis::{get_redis_connection, signal_dedup_key};
use crate::time_util::now_timestamp_mills;

pub struct DedupCache {
    window_secs: u64,
    use_redis: bool,
    /// 指纹 -> 认领时间（毫秒），仅内存模式使用
    claims: DashMap<String, i64>,
}

impl DedupCache {
    pub fn new(window_secs: u64, use_redis: bool) -> Self {
        Self {
            window_secs,
            use_redis,
            claims: DashMap::new(),
        }
    }

    /// 按环境构造：非 dry-run 且配置了 REDIS_HOST 时走 redis
    pub fn from_env(window_secs: u64) -> Self {
        let use_redis = !env_is_true("IS_DRY_RUN", false) && std::env::var("REDIS_HOST").is_ok();
        Self::new(window_secs, use_redis)
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// 认领指纹。返回 true 表示窗口内首次出现
    pub async fn try_claim(&self, fingerprint: &str) -> bool {
        if self.use_redis {
            match self.try_claim_redis(fingerprint).await {
                Ok(claimed) => return claimed,
                Err(e) => {
                    // redis 不可用时退化为进程内去重，不阻塞信号摄入
                    warn!("redis 去重不可用，退化为内存去重: {}", e);
                }
            }
        }
        self.try_claim_memory(fingerprint)
    }

    async fn try_claim_redis(&self, fingerprint: &str) -> anyhow::Result<bool> {
        let mut conn = get_redis_connection().await?;
        let key = signal_dedup_key(fingerprint);
        // SET key 1 NX EX window
        let claimed: bool = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.window_secs)
            .query_async(&mut conn)
            .await?;
        Ok(claimed)
    }

    fn try_claim_memory(&self, fingerprint: &str) -> bool {
        let now = now_timestamp_mills();
        let window_ms = self.window_secs as i64 * 1000;
        match self.claims.get(fingerprint) {
            Some(claimed_at) if now - *claimed_at < window_ms => {
                debug!("信号指纹窗口内重复: {}", fingerprint);
                false
            }
            _ => {
                self.claims.insert(fingerprint.to_string(), now);
                true
            }
        }
    }

    /// 清理过期的内存认领项（定时任务调用）
    pub fn sweep_expired(&self) {
        let now = now_timestamp_mills();
        let window_ms = self.window_secs as i64 * 1000;
        self.claims.retain(|_, claimed_at| now - *claimed_at < window_ms);
    }
}
