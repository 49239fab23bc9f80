//! 重试策略
//!
//! 显式的有界状态机：尝试次数、下一次退避延迟、错误分类三者都可独立
//! 测试。延迟序列来自 tokio-retry 的指数退避加抖动。

use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::trading::exchange::ExchangeError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 单次适配器调用超时
    pub attempt_timeout: Duration,
    /// 退避基数（毫秒），序列为 base*2, base*4, ...
    pub backoff_base_ms: u64,
    /// 退避上限
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff_base_ms: 250,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        use crate::app_config::env::env_parse_or;
        Self {
            max_attempts: env_parse_or("EXEC_MAX_ATTEMPTS", 3u32).max(1),
            attempt_timeout: Duration::from_millis(env_parse_or(
                "EXEC_ATTEMPT_TIMEOUT_MS",
                10_000u64,
            )),
            backoff_base_ms: env_parse_or("EXEC_BACKOFF_BASE_MS", 250u64),
            max_backoff: Duration::from_millis(env_parse_or("EXEC_MAX_BACKOFF_MS", 5_000u64)),
        }
    }

    /// 生成一次执行的重试排程
    pub fn schedule(&self) -> RetrySchedule {
        // 指数底为 2，factor 缩放到 base*2^n 毫秒，叠加抖动
        let delays: Vec<Duration> = ExponentialBackoff::from_millis(2)
            .factor(self.backoff_base_ms)
            .max_delay(self.max_backoff)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1) as usize)
            .collect();
        RetrySchedule {
            delays,
            attempt: 1,
            max_attempts: self.max_attempts,
        }
    }
}

/// 对一次错误的处置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// 等待 delay 后发起第 next_attempt 次尝试
    Retry {
        next_attempt: u32,
        delay: Duration,
    },
    /// 致命错误，立即放弃
    GiveUpFatal,
    /// 瞬时错误但次数耗尽
    GiveUpExhausted,
}

/// 单次执行的重试状态
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
    attempt: u32,
    max_attempts: u32,
}

impl RetrySchedule {
    /// 当前是第几次尝试（从 1 开始）
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 已经发生的重试次数
    pub fn retry_count(&self) -> u32 {
        self.attempt - 1
    }

    /// 根据错误分类决定下一步，Retry 时推进状态
    pub fn on_error(&mut self, error: &ExchangeError) -> RetryDecision {
        if !error.is_transient() {
            return RetryDecision::GiveUpFatal;
        }
        if self.attempt >= self.max_attempts {
            return RetryDecision::GiveUpExhausted;
        }
        let delay = self
            .delays
            .get((self.attempt - 1) as usize)
            .copied()
            .unwrap_or_default();
        self.attempt += 1;
        RetryDecision::Retry {
            next_attempt: self.attempt,
            delay,
        }
    }
}
