//! 信号摄入与校验
//!
//! 入站信号先落库（received），再做形状校验与指纹去重，把最终状态
//! （validated / skipped / failed）写回后才返回回执——落库本身就是
//! 摄入环节的审计记录。webhook 重发导致的窗口内重复是预期行为，
//! 标记 skipped 而不是 failed。

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::time_util::{dedup_bucket, now_timestamp_mills};
use crate::trading::cache::DedupCache;
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::signal::{SignalDirection, SignalEntity, SignalStatus};
use crate::trading::services::audit_service::AuditRecorder;

/// 当前支持的交易所
const KNOWN_EXCHANGES: [&str; 4] = ["okx", "binance", "bybit", "paper"];

/// 入站信号请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub user_id: String,
    pub strategy_id: Option<String>,
    pub exchange: String,
    pub symbol: String,
    /// long_entry / long_exit / short_entry / short_exit
    pub signal_type: String,
    pub suggested_entry: Option<Decimal>,
    pub suggested_stop_loss: Option<Decimal>,
    pub suggested_take_profit: Option<Decimal>,
    pub leverage: Option<i32>,
    pub source: String,
    pub raw_payload: serde_json::Value,
}

/// 摄入回执：实际执行是异步的，这里只确认收下与否
#[derive(Debug, Clone, Serialize)]
pub struct IngestAck {
    pub signal_id: String,
    pub status: SignalStatus,
    pub reason: Option<String>,
}

pub struct SignalService {
    repository: Arc<dyn EngineRepository>,
    dedup: Arc<DedupCache>,
    audit: AuditRecorder,
}

impl SignalService {
    pub fn new(repository: Arc<dyn EngineRepository>, dedup: Arc<DedupCache>) -> Self {
        Self {
            audit: AuditRecorder::new(repository.clone()),
            repository,
            dedup,
        }
    }

    /// 摄入一条信号，返回回执。回执状态为 validated 的信号可进入执行队列。
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestAck, AppError> {
        let now = now_timestamp_mills();
        let direction = SignalDirection::parse(request.signal_type.trim());

        let mut signal = SignalEntity {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.trim().to_string(),
            strategy_id: request
                .strategy_id
                .as_deref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            exchange: request.exchange.trim().to_lowercase(),
            symbol: request.symbol.trim().to_uppercase(),
            // 无法解析的方向也要留痕，落一条 failed 信号行
            direction: direction.unwrap_or(SignalDirection::LongEntry),
            suggested_entry: request.suggested_entry,
            suggested_stop_loss: request.suggested_stop_loss,
            suggested_take_profit: request.suggested_take_profit,
            leverage: request.leverage,
            source: request.source.trim().to_string(),
            raw_payload: request.raw_payload.to_string(),
            fingerprint: String::new(),
            status: SignalStatus::Received,
            status_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_signal(&signal).await?;

        // 形状校验，失败即终态 failed，不进入流水线
        if let Err(reason) = validate_shape(&signal, direction.is_some()) {
            signal.transition_to(SignalStatus::Failed, Some(reason.to_string()), now)?;
            self.repository.update_signal(&signal).await?;
            self.audit
                .record::<(), _>(
                    Some(&signal.user_id),
                    "signal_rejected",
                    "signal",
                    &signal.id,
                    None,
                    Some(&signal),
                    false,
                    Some(reason),
                )
                .await;
            warn!("信号校验失败: signal_id={}, reason={}", signal.id, reason);
            return Ok(IngestAck {
                signal_id: signal.id.clone(),
                status: signal.status,
                reason: Some(reason.to_string()),
            });
        }

        // 指纹去重：窗口内重复直接 skipped
        signal.fingerprint = fingerprint(&signal, self.dedup.window_secs());
        if !self.dedup.try_claim(&signal.fingerprint).await {
            signal.transition_to(
                SignalStatus::Skipped,
                Some("duplicate_signal".to_string()),
                now,
            )?;
            self.repository.update_signal(&signal).await?;
            self.audit
                .record::<(), _>(
                    Some(&signal.user_id),
                    "signal_deduplicated",
                    "signal",
                    &signal.id,
                    None,
                    Some(&signal),
                    true,
                    None,
                )
                .await;
            info!(
                "重复信号已跳过: signal_id={}, fingerprint={}",
                signal.id, signal.fingerprint
            );
            return Ok(IngestAck {
                signal_id: signal.id.clone(),
                status: signal.status,
                reason: Some("duplicate_signal".to_string()),
            });
        }

        signal.transition_to(SignalStatus::Validated, None, now)?;
        self.repository.update_signal(&signal).await?;
        self.audit
            .record::<(), _>(
                Some(&signal.user_id),
                "signal_validated",
                "signal",
                &signal.id,
                None,
                Some(&signal),
                true,
                None,
            )
            .await;
        Ok(IngestAck {
            signal_id: signal.id.clone(),
            status: signal.status,
            reason: None,
        })
    }
}

/// 去重指纹：同 (user, strategy, exchange, symbol, direction, source, 时间桶)
/// 的信号视为同一条
pub fn fingerprint(signal: &SignalEntity, window_secs: u64) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        signal.user_id,
        signal.strategy_id.as_deref().unwrap_or("-"),
        signal.exchange,
        signal.symbol,
        signal.direction.as_str(),
        signal.source,
        dedup_bucket(signal.created_at, window_secs)
    )
}

/// 形状校验：必填字段、交易所白名单、价格内部一致性
fn validate_shape(signal: &SignalEntity, direction_parsed: bool) -> Result<(), &'static str> {
    if !direction_parsed {
        return Err("invalid_signal_type");
    }
    if signal.user_id.is_empty() {
        return Err("missing_user_id");
    }
    if signal.symbol.is_empty() {
        return Err("missing_symbol");
    }
    if signal.source.is_empty() {
        return Err("missing_source");
    }
    if !KNOWN_EXCHANGES.contains(&signal.exchange.as_str()) {
        return Err("unknown_exchange");
    }

    for price in [
        signal.suggested_entry,
        signal.suggested_stop_loss,
        signal.suggested_take_profit,
    ]
    .into_iter()
    .flatten()
    {
        if price <= Decimal::ZERO {
            return Err("invalid_price");
        }
    }
    if let Some(lev) = signal.leverage {
        if lev < 1 {
            return Err("invalid_leverage");
        }
    }

    // 入场信号必须带参考入场价，止损/止盈必须在正确一侧
    if signal.direction.is_entry() {
        let entry = match signal.suggested_entry {
            Some(p) => p,
            None => return Err("missing_entry_price"),
        };
        let is_long = signal.direction == SignalDirection::LongEntry;
        if let Some(stop) = signal.suggested_stop_loss {
            let ok = if is_long { stop < entry } else { stop > entry };
            if !ok {
                return Err("stop_loss_on_wrong_side");
            }
        }
        if let Some(tp) = signal.suggested_take_profit {
            let ok = if is_long { tp > entry } else { tp < entry };
            if !ok {
                return Err("take_profit_on_wrong_side");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_signal() -> SignalEntity {
        SignalEntity {
            id: "sig-1".to_string(),
            user_id: "u1".to_string(),
            strategy_id: Some("strat-1".to_string()),
            exchange: "okx".to_string(),
            symbol: "BTC-USDT".to_string(),
            direction: SignalDirection::LongEntry,
            suggested_entry: Some(dec!(100)),
            suggested_stop_loss: Some(dec!(95)),
            suggested_take_profit: Some(dec!(120)),
            leverage: Some(3),
            source: "webhook".to_string(),
            raw_payload: "{}".to_string(),
            fingerprint: String::new(),
            status: SignalStatus::Received,
            status_reason: None,
            created_at: 1_718_371_780_000,
            updated_at: 1_718_371_780_000,
        }
    }

    #[test]
    fn test_valid_signal_passes() {
        assert!(validate_shape(&base_signal(), true).is_ok());
    }

    #[test]
    fn test_unknown_exchange_rejected() {
        let mut sig = base_signal();
        sig.exchange = "hyperliquid".to_string();
        assert_eq!(validate_shape(&sig, true), Err("unknown_exchange"));
    }

    #[test]
    fn test_stop_loss_side_checked() {
        let mut sig = base_signal();
        sig.suggested_stop_loss = Some(dec!(105));
        assert_eq!(validate_shape(&sig, true), Err("stop_loss_on_wrong_side"));

        // 做空方向止损在上方是合法的
        let mut short = base_signal();
        short.direction = SignalDirection::ShortEntry;
        short.suggested_stop_loss = Some(dec!(105));
        short.suggested_take_profit = Some(dec!(90));
        assert!(validate_shape(&short, true).is_ok());
    }

    #[test]
    fn test_entry_requires_price() {
        let mut sig = base_signal();
        sig.suggested_entry = None;
        assert_eq!(validate_shape(&sig, true), Err("missing_entry_price"));

        // 离场信号可以不带参考价
        let mut exit = base_signal();
        exit.direction = SignalDirection::LongExit;
        exit.suggested_entry = None;
        exit.suggested_stop_loss = None;
        exit.suggested_take_profit = None;
        assert!(validate_shape(&exit, true).is_ok());
    }

    #[test]
    fn test_fingerprint_stable_within_bucket() {
        let a = base_signal();
        let mut b = base_signal();
        b.id = "sig-2".to_string();
        b.created_at += 10_000;
        assert_eq!(fingerprint(&a, 60), fingerprint(&b, 60));

        let mut c = base_signal();
        c.created_at += 120_000;
        assert_ne!(fingerprint(&a, 60), fingerprint(&c, 60));
    }
}
