//! 持仓与成交台账
//!
//! 成交落账：开仓、加权平均加仓、按比例实现盈亏减仓、数量归零平仓。
//! 本服务不持有自己的锁，串行化完全复用执行协调器的分区键临界区，
//! 必须在该临界区内调用。

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::time_util::now_timestamp_mills;
use crate::trading::model::position::{PositionEntity, PositionStatus};
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::signal::SignalEntity;
use crate::trading::model::trade::TradeEntity;

/// 一次成交落账的结果
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub position: PositionEntity,
    /// 本次成交实现的盈亏（减仓/平仓时非零）
    pub realized_pnl: Decimal,
    /// 本次是否新开仓
    pub opened: bool,
}

pub struct PositionService {
    repository: Arc<dyn EngineRepository>,
    /// 对冲模式下持仓按 (key, strategy) 区分
    allow_hedging: bool,
}

impl PositionService {
    pub fn new(repository: Arc<dyn EngineRepository>, allow_hedging: bool) -> Self {
        Self {
            repository,
            allow_hedging,
        }
    }

    /// 把订单的一笔成交作用到持仓上并持久化
    ///
    /// 入场方向且无同键持仓时新开仓；否则按方向加仓或减仓。
    /// 标记价用于刷新未实现盈亏，由行情能力提供。
    pub async fn apply_fill(
        &self,
        signal: &SignalEntity,
        trade: &TradeEntity,
        fill_quantity: Decimal,
        fill_price: Decimal,
        mark_price: Decimal,
    ) -> Result<FillOutcome, AppError> {
        let now = now_timestamp_mills();
        let strategy_filter = if self.allow_hedging {
            signal.strategy_id.as_deref()
        } else {
            None
        };
        let existing = self
            .repository
            .find_open_position(
                &signal.user_id,
                &signal.exchange,
                &signal.symbol,
                strategy_filter,
            )
            .await?;

        match existing {
            None => {
                if !signal.direction.is_entry() {
                    return Err(AppError::BizError(format!(
                        "离场成交找不到对应持仓: signal_id={}",
                        signal.id
                    )));
                }
                let mut position = PositionEntity {
                    id: Uuid::new_v4().to_string(),
                    user_id: signal.user_id.clone(),
                    exchange: signal.exchange.clone(),
                    symbol: signal.symbol.clone(),
                    side: signal.direction.position_side(),
                    status: PositionStatus::Open,
                    entry_price: fill_price,
                    quantity: fill_quantity,
                    leverage: signal.leverage.unwrap_or(1),
                    stop_loss: signal.suggested_stop_loss,
                    take_profit: signal.suggested_take_profit,
                    unrealized_pnl: Decimal::ZERO,
                    realized_pnl: None,
                    margin: None,
                    liquidation_price: None,
                    strategy_id: signal.strategy_id.clone(),
                    opened_at: now,
                    closed_at: None,
                };
                position.refresh_unrealized_pnl(mark_price);
                self.repository.insert_position(&position).await?;
                info!(
                    "新开仓: position_id={}, symbol={}, qty={}, entry={}",
                    position.id, position.symbol, position.quantity, position.entry_price
                );
                Ok(FillOutcome {
                    position,
                    realized_pnl: Decimal::ZERO,
                    opened: true,
                })
            }
            Some(mut position) => {
                // 此前减仓已实现的盈亏记在该持仓名下的订单上，平仓时一并固定
                let prior_realized: Decimal = self
                    .repository
                    .trades_by_position(&position.id)
                    .await?
                    .iter()
                    .filter_map(|t| t.realized_pnl)
                    .sum();
                let realized =
                    position.apply_fill(trade.side, fill_quantity, fill_price, prior_realized, now)?;
                position.refresh_unrealized_pnl(mark_price);
                self.repository.update_position(&position).await?;
                if position.status == PositionStatus::Closed {
                    info!(
                        "平仓: position_id={}, realized_pnl={:?}",
                        position.id, position.realized_pnl
                    );
                }
                Ok(FillOutcome {
                    position,
                    realized_pnl: realized,
                    opened: false,
                })
            }
        }
    }
}
