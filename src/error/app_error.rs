use thiserror::Error;

use crate::trading::exchange::ExchangeError;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 业务错误
    #[error("业务错误: {0}")]
    BizError(String),

    /// 信号校验失败（字段缺失、方向与价格不一致等），不重试
    #[error("信号校验失败: {0}")]
    ValidationError(String),

    /// 风控拒绝，属预期结果，不重试
    #[error("风控拒绝: {0}")]
    RiskRejected(String),

    /// 数据库错误
    #[error("数据库错误: {0}")]
    DbError(String),

    /// 交易所适配器错误（保留瞬时/致命分类）
    #[error("交易所错误: {0}")]
    ExchangeError(#[from] ExchangeError),

    /// 凭证获取失败
    #[error("凭证错误: {0}")]
    CredentialError(String),

    /// 未知错误
    #[error("未知错误: {0}")]
    Unknown(String),
}

impl From<rbatis::Error> for AppError {
    fn from(err: rbatis::Error) -> Self {
        AppError::DbError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Unknown(err.to_string())
    }
}
