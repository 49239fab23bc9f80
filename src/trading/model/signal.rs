extern crate rbatis;

use rbatis::{crud, impl_select};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::trading::model::position::PositionSide;
use crate::trading::model::trade::TradeSide;

/// 信号方向：入场/离场 × 多/空
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    LongEntry,
    LongExit,
    ShortEntry,
    ShortExit,
}

impl SignalDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalDirection::LongEntry => "long_entry",
            SignalDirection::LongExit => "long_exit",
            SignalDirection::ShortEntry => "short_entry",
            SignalDirection::ShortExit => "short_exit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "long_entry" => Some(SignalDirection::LongEntry),
            "long_exit" => Some(SignalDirection::LongExit),
            "short_entry" => Some(SignalDirection::ShortEntry),
            "short_exit" => Some(SignalDirection::ShortExit),
            _ => None,
        }
    }

    /// 是否开仓方向
    pub fn is_entry(&self) -> bool {
        matches!(self, SignalDirection::LongEntry | SignalDirection::ShortEntry)
    }

    /// 对应的持仓方向
    pub fn position_side(&self) -> PositionSide {
        match self {
            SignalDirection::LongEntry | SignalDirection::LongExit => PositionSide::Long,
            SignalDirection::ShortEntry | SignalDirection::ShortExit => PositionSide::Short,
        }
    }

    /// 对应的下单买卖方向
    pub fn trade_side(&self) -> TradeSide {
        match self {
            SignalDirection::LongEntry | SignalDirection::ShortExit => TradeSide::Buy,
            SignalDirection::LongExit | SignalDirection::ShortEntry => TradeSide::Sell,
        }
    }
}

/// 信号状态机：received → validated → queued → {executed, failed, skipped}
///
/// 终态之后不可再变更，非法迁移在 transition_to 中拦截。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Received,
    Validated,
    Queued,
    Executed,
    Failed,
    Skipped,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Received => "received",
            SignalStatus::Validated => "validated",
            SignalStatus::Queued => "queued",
            SignalStatus::Executed => "executed",
            SignalStatus::Failed => "failed",
            SignalStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignalStatus::Executed | SignalStatus::Failed | SignalStatus::Skipped
        )
    }

    /// 状态只能单调前进
    pub fn can_transition_to(&self, next: SignalStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (SignalStatus::Received, SignalStatus::Validated) => true,
            (SignalStatus::Received, SignalStatus::Failed) => true,
            (SignalStatus::Received, SignalStatus::Skipped) => true,
            (SignalStatus::Validated, SignalStatus::Queued) => true,
            (SignalStatus::Validated, SignalStatus::Failed) => true,
            (SignalStatus::Validated, SignalStatus::Skipped) => true,
            (SignalStatus::Queued, SignalStatus::Executed) => true,
            (SignalStatus::Queued, SignalStatus::Failed) => true,
            (SignalStatus::Queued, SignalStatus::Skipped) => true,
            _ => false,
        }
    }
}

/// 信号表：入站交易意图，只追加，终态后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEntity {
    pub id: String,
    pub user_id: String,
    pub strategy_id: Option<String>,
    pub exchange: String,
    pub symbol: String,
    pub direction: SignalDirection,
    pub suggested_entry: Option<Decimal>,
    pub suggested_stop_loss: Option<Decimal>,
    pub suggested_take_profit: Option<Decimal>,
    pub leverage: Option<i32>,
    pub source: String,
    pub raw_payload: String,
    pub fingerprint: String,
    pub status: SignalStatus,
    pub status_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

crud!(SignalEntity {}, "signals");
impl_select!(SignalEntity{select_by_id(id:&str) => "`where id = #{id} limit 1`"},"signals");
impl_select!(SignalEntity{select_stale_pending(cutoff:i64) =>
    "`where status in ('received','validated','queued') and created_at < #{cutoff}`"},"signals");

impl SignalEntity {
    /// 状态迁移，非法迁移报业务错误
    pub fn transition_to(
        &mut self,
        next: SignalStatus,
        reason: Option<String>,
        now_ms: i64,
    ) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::BizError(format!(
                "信号状态非法迁移: {} -> {}, signal_id={}",
                self.status.as_str(),
                next.as_str(),
                self.id
            )));
        }
        self.status = next;
        self.status_reason = reason;
        self.updated_at = now_ms;
        Ok(())
    }

    /// 执行分区键：同键信号严格串行
    pub fn execution_key(&self) -> String {
        format!("{}:{}:{}", self.user_id, self.exchange, self.symbol)
    }
}
