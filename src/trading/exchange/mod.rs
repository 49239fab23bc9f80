//! 交易所抽象接口
//!
//! 定义下单/撤单/持仓查询的统一接口，具体交易所各自实现。
//! services 层只依赖接口，错误必须区分瞬时/致命，供重试策略分类。

pub mod paper;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trading::model::trade::{OrderType, TradeSide, TradeStatus};

pub use paper::PaperExchange;

/// 交易所错误，瞬时错误可重试，致命错误立即失败
#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    /// 网络超时、限流、5xx 一类，重试可能成功
    #[error("交易所瞬时错误: {0}")]
    Transient(String),

    /// 余额不足、无效交易对、订单被拒一类，重试无意义
    #[error("交易所致命错误: {0}")]
    Fatal(String),
}

impl ExchangeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Transient(_))
    }

    /// 执行日志里的 error_type 字段取值
    pub fn error_type(&self) -> &'static str {
        match self {
            ExchangeError::Transient(_) => "transient",
            ExchangeError::Fatal(_) => "fatal",
        }
    }
}

/// 下单请求，client_order_id 即幂等键（信号 id）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: String,
    pub exchange: String,
    pub symbol: String,
    pub side: TradeSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub client_order_id: String,
}

/// 下单回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub exchange_order_id: String,
    pub status: TradeStatus,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub fee: Option<Decimal>,
}

/// 交易所侧持仓快照（对账用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangePositionSnapshot {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_price: Decimal,
}

/// 交易所凭证，引擎不落盘、不打日志
#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 凭证内容不进入任何日志
        f.debug_struct("ExchangeCredentials").finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// 交易所名称
    fn name(&self) -> &'static str;

    /// 下单。适配器支持幂等键时，同一 client_order_id 的重复提交必须返回原回执
    async fn place_order(
        &self,
        credentials: &ExchangeCredentials,
        request: &OrderRequest,
    ) -> Result<OrderAck, ExchangeError>;

    /// 撤单
    async fn cancel_order(
        &self,
        credentials: &ExchangeCredentials,
        exchange_order_id: &str,
    ) -> Result<(), ExchangeError>;

    /// 查询交易所侧持仓
    async fn get_position(
        &self,
        credentials: &ExchangeCredentials,
        symbol: &str,
    ) -> Result<Option<ExchangePositionSnapshot>, ExchangeError>;
}

/// 凭证解密能力（外部系统实现，引擎只消费）
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn decrypt_credentials(
        &self,
        user_id: &str,
        exchange: &str,
    ) -> anyhow::Result<ExchangeCredentials>;
}

/// 行情能力：标记价查询
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn get_mark_price(&self, symbol: &str, exchange: &str) -> anyhow::Result<Decimal>;
}

/// 静态凭证提供者：环境注入的单组凭证，dry-run 与单交易所部署够用
pub struct StaticCredentialProvider {
    credentials: ExchangeCredentials,
}

impl StaticCredentialProvider {
    pub fn new(credentials: ExchangeCredentials) -> Self {
        Self { credentials }
    }

    pub fn from_env() -> Self {
        Self {
            credentials: ExchangeCredentials {
                api_key: std::env::var("EXCHANGE_API_KEY").unwrap_or_default(),
                api_secret: std::env::var("EXCHANGE_API_SECRET").unwrap_or_default(),
                passphrase: std::env::var("EXCHANGE_PASSPHRASE").ok(),
            },
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn decrypt_credentials(
        &self,
        _user_id: &str,
        _exchange: &str,
    ) -> anyhow::Result<ExchangeCredentials> {
        Ok(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ExchangeError::Transient("timeout".to_string()).is_transient());
        assert!(!ExchangeError::Fatal("insufficient balance".to_string()).is_transient());
        assert_eq!(
            ExchangeError::Transient("x".to_string()).error_type(),
            "transient"
        );
        assert_eq!(ExchangeError::Fatal("x".to_string()).error_type(), "fatal");
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = ExchangeCredentials {
            api_key: "ak-plaintext".to_string(),
            api_secret: "sk-plaintext".to_string(),
            passphrase: Some("pp-plaintext".to_string()),
        };
        let out = format!("{:?}", creds);
        assert!(!out.contains("ak-plaintext"));
        assert!(!out.contains("sk-plaintext"));
        assert!(!out.contains("pp-plaintext"));
    }
}
