//! 风控引擎
//!
//! 对已校验的信号做纯计算评估：七条规则按序检查，首个硬性失败即短路；
//! 全部通过后按止损距离计算下单数量。不做任何 IO，持仓/日内统计以显式
//! 快照传入，快照的采集与后续下单在同一个分区键临界区内完成。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::trading::model::position::PositionEntity;
use crate::trading::model::risk_settings::RiskSettingsEntity;
use crate::trading::model::signal::SignalEntity;

/// 风控拒绝原因码（写入 risk_check_details 与信号终态原因）
pub const REASON_MISSING_STOP_LOSS: &str = "missing_stop_loss";
pub const REASON_MAX_OPEN_POSITIONS: &str = "max_open_positions_exceeded";
pub const REASON_LEVERAGE_EXCEEDED: &str = "max_leverage_exceeded";
pub const REASON_POSITION_SIZE_EXCEEDED: &str = "max_position_size_exceeded";
pub const REASON_MAX_DAILY_TRADES: &str = "max_daily_trades_exceeded";
pub const REASON_DAILY_LOSS_LIMIT: &str = "daily_loss_limit_exceeded";
pub const REASON_PORTFOLIO_EXPOSURE: &str = "portfolio_exposure_exceeded";
pub const REASON_NO_OPEN_POSITION: &str = "no_open_position";
pub const REASON_ENTRY_PRICE_MISSING: &str = "entry_price_missing";
pub const REASON_INVALID_STOP_DISTANCE: &str = "invalid_stop_distance";
pub const REASON_ACCOUNT_EQUITY_INVALID: &str = "account_equity_invalid";

/// 用户账户快照：风控决策的全部事实来源，取数后在键内串行区间内不再变化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub open_positions: Vec<PositionEntity>,
    pub daily_trade_count: i64,
    pub daily_realized_pnl: Decimal,
    pub portfolio_value_usd: Decimal,
}

/// 通过风控后的下单参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSizing {
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub notional_usd: Decimal,
    pub leverage: i32,
    /// 离场信号：只减仓
    pub reduce_only: bool,
}

/// 风控决策结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecision {
    pub pass: bool,
    pub reasons: Vec<String>,
    pub sizing: Option<OrderSizing>,
}

impl RiskDecision {
    fn reject(reason: &str) -> Self {
        Self {
            pass: false,
            reasons: vec![reason.to_string()],
            sizing: None,
        }
    }

    fn accept(sizing: OrderSizing) -> Self {
        Self {
            pass: true,
            reasons: vec![],
            sizing: Some(sizing),
        }
    }
}

pub struct RiskEngine {
    /// 是否允许同键多持仓（对冲），默认关闭
    allow_hedging: bool,
}

impl RiskEngine {
    pub fn new(allow_hedging: bool) -> Self {
        Self { allow_hedging }
    }

    /// 在快照里找信号同键的 open 持仓
    pub fn find_existing_position<'a>(
        &self,
        signal: &SignalEntity,
        snapshot: &'a AccountSnapshot,
    ) -> Option<&'a PositionEntity> {
        snapshot.open_positions.iter().find(|p| {
            p.exchange == signal.exchange
                && p.symbol == signal.symbol
                && (!self.allow_hedging
                    || p.strategy_id.as_deref() == signal.strategy_id.as_deref())
        })
    }

    /// 评估信号。离场信号只要求对应持仓存在；入场信号依次过七条规则。
    pub fn evaluate(
        &self,
        signal: &SignalEntity,
        settings: &RiskSettingsEntity,
        snapshot: &AccountSnapshot,
    ) -> RiskDecision {
        let existing = self.find_existing_position(signal, snapshot);

        if !signal.direction.is_entry() {
            return self.evaluate_exit(signal, existing);
        }

        // 1. 强制止损
        if settings.require_stop_loss && signal.suggested_stop_loss.is_none() {
            return RiskDecision::reject(REASON_MISSING_STOP_LOSS);
        }

        // 2. 持仓数上限（加仓不占新额度）
        if existing.is_none()
            && snapshot.open_positions.len() as i32 >= settings.max_open_positions
        {
            return RiskDecision::reject(REASON_MAX_OPEN_POSITIONS);
        }

        // 3. 杠杆上限
        let leverage = signal.leverage.unwrap_or(1);
        if leverage > settings.max_leverage {
            return RiskDecision::reject(REASON_LEVERAGE_EXCEEDED);
        }

        let entry_price = match signal.suggested_entry {
            Some(p) if p > Decimal::ZERO => p,
            _ => return RiskDecision::reject(REASON_ENTRY_PRICE_MISSING),
        };
        if snapshot.portfolio_value_usd <= Decimal::ZERO {
            return RiskDecision::reject(REASON_ACCOUNT_EQUITY_INVALID);
        }

        // 按单笔风险预算与止损距离计算数量，上限为单仓名义价值
        let quantity = match self.size_entry(signal, settings, snapshot, entry_price) {
            Ok(q) => q,
            Err(reason) => return RiskDecision::reject(reason),
        };
        let notional = (quantity * entry_price).round_dp(8);

        // 4. 单仓名义价值上限（含同键已有持仓）
        let existing_notional = existing
            .map(|p| p.notional_usd())
            .unwrap_or(Decimal::ZERO);
        if existing_notional + notional > settings.max_position_size_usd {
            return RiskDecision::reject(REASON_POSITION_SIZE_EXCEEDED);
        }

        // 5. 日内交易次数上限
        if snapshot.daily_trade_count >= settings.max_daily_trades as i64 {
            return RiskDecision::reject(REASON_MAX_DAILY_TRADES);
        }

        // 6. 日内已实现亏损上限
        let daily_loss = if snapshot.daily_realized_pnl < Decimal::ZERO {
            -snapshot.daily_realized_pnl
        } else {
            Decimal::ZERO
        };
        let loss_percent = daily_loss / snapshot.portfolio_value_usd * Decimal::ONE_HUNDRED;
        if loss_percent >= settings.max_daily_loss_percent {
            return RiskDecision::reject(REASON_DAILY_LOSS_LIMIT);
        }

        // 7. 组合总敞口上限
        let open_exposure: Decimal = snapshot
            .open_positions
            .iter()
            .map(|p| p.notional_usd())
            .sum();
        let exposure_limit =
            snapshot.portfolio_value_usd * settings.max_portfolio_exposure_percent
                / Decimal::ONE_HUNDRED;
        if open_exposure + notional > exposure_limit {
            return RiskDecision::reject(REASON_PORTFOLIO_EXPOSURE);
        }

        debug!(
            "风控通过: signal_id={}, quantity={}, notional={}",
            signal.id, quantity, notional
        );
        RiskDecision::accept(OrderSizing {
            quantity,
            entry_price,
            stop_loss: signal.suggested_stop_loss,
            take_profit: signal.suggested_take_profit,
            notional_usd: notional,
            leverage,
            reduce_only: false,
        })
    }

    fn evaluate_exit(
        &self,
        signal: &SignalEntity,
        existing: Option<&PositionEntity>,
    ) -> RiskDecision {
        let position = match existing {
            Some(p) if p.side == signal.direction.position_side() => p,
            _ => return RiskDecision::reject(REASON_NO_OPEN_POSITION),
        };
        let entry_price = signal.suggested_entry.unwrap_or(position.entry_price);
        RiskDecision::accept(OrderSizing {
            quantity: position.quantity,
            entry_price,
            stop_loss: None,
            take_profit: None,
            notional_usd: (position.quantity * entry_price).round_dp(8),
            leverage: position.leverage,
            reduce_only: true,
        })
    }

    /// 风险预算法定量：quantity = 风险预算 / |entry - stop|，无止损时名义价值取风险预算
    fn size_entry(
        &self,
        signal: &SignalEntity,
        settings: &RiskSettingsEntity,
        snapshot: &AccountSnapshot,
        entry_price: Decimal,
    ) -> Result<Decimal, &'static str> {
        let risk_budget = snapshot.portfolio_value_usd
            * settings.default_risk_per_trade_percent
            / Decimal::ONE_HUNDRED;

        let raw_quantity = match signal.suggested_stop_loss {
            Some(stop) => {
                let distance = (entry_price - stop).abs();
                if distance.is_zero() {
                    return Err(REASON_INVALID_STOP_DISTANCE);
                }
                risk_budget / distance
            }
            None => risk_budget / entry_price,
        };

        // 名义价值封顶
        let max_quantity = settings.max_position_size_usd / entry_price;
        Ok(raw_quantity.min(max_quantity).round_dp(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::model::position::{PositionSide, PositionStatus};
    use crate::trading::model::signal::{SignalDirection, SignalStatus};
    use rust_decimal_macros::dec;

    fn settings() -> RiskSettingsEntity {
        RiskSettingsEntity {
            user_id: "u1".to_string(),
            max_position_size_usd: dec!(50000),
            max_leverage: 10,
            max_open_positions: 5,
            max_daily_trades: 20,
            max_daily_loss_percent: dec!(5),
            max_portfolio_exposure_percent: dec!(80),
            default_risk_per_trade_percent: dec!(2),
            require_stop_loss: true,
            updated_at: 0,
        }
    }

    fn snapshot() -> AccountSnapshot {
        AccountSnapshot {
            open_positions: vec![],
            daily_trade_count: 0,
            daily_realized_pnl: Decimal::ZERO,
            portfolio_value_usd: dec!(50000),
        }
    }

    fn entry_signal(entry: Decimal, stop: Option<Decimal>) -> SignalEntity {
        SignalEntity {
            id: "sig-1".to_string(),
            user_id: "u1".to_string(),
            strategy_id: None,
            exchange: "okx".to_string(),
            symbol: "BTC-USDT".to_string(),
            direction: SignalDirection::LongEntry,
            suggested_entry: Some(entry),
            suggested_stop_loss: stop,
            suggested_take_profit: None,
            leverage: Some(3),
            source: "webhook".to_string(),
            raw_payload: "{}".to_string(),
            fingerprint: "fp".to_string(),
            status: SignalStatus::Validated,
            status_reason: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn open_position(symbol: &str, entry: Decimal, qty: Decimal) -> PositionEntity {
        PositionEntity {
            id: format!("pos-{}", symbol),
            user_id: "u1".to_string(),
            exchange: "okx".to_string(),
            symbol: symbol.to_string(),
            side: PositionSide::Long,
            status: PositionStatus::Open,
            entry_price: entry,
            quantity: qty,
            leverage: 1,
            stop_loss: None,
            take_profit: None,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: None,
            margin: None,
            liquidation_price: None,
            strategy_id: None,
            opened_at: 0,
            closed_at: None,
        }
    }

    #[test]
    fn test_missing_stop_loss_rejected() {
        let engine = RiskEngine::new(false);
        let decision = engine.evaluate(&entry_signal(dec!(100), None), &settings(), &snapshot());
        assert!(!decision.pass);
        assert_eq!(decision.reasons, vec![REASON_MISSING_STOP_LOSS.to_string()]);
    }

    #[test]
    fn test_max_open_positions_rejected() {
        let engine = RiskEngine::new(false);
        let mut snap = snapshot();
        for i in 0..5 {
            snap.open_positions
                .push(open_position(&format!("SYM-{}", i), dec!(10), dec!(1)));
        }
        let decision =
            engine.evaluate(&entry_signal(dec!(100), Some(dec!(95))), &settings(), &snap);
        assert!(!decision.pass);
        assert_eq!(
            decision.reasons,
            vec![REASON_MAX_OPEN_POSITIONS.to_string()]
        );
    }

    #[test]
    fn test_risk_per_trade_sizing() {
        // 组合 50000，风险 2% => 预算 1000；entry=100 stop=95 => 距离 5 => 200
        let engine = RiskEngine::new(false);
        let decision = engine.evaluate(
            &entry_signal(dec!(100), Some(dec!(95))),
            &settings(),
            &snapshot(),
        );
        assert!(decision.pass, "reasons: {:?}", decision.reasons);
        let sizing = decision.sizing.unwrap();
        assert_eq!(sizing.quantity, dec!(200));
        assert_eq!(sizing.notional_usd, dec!(20000));
    }

    #[test]
    fn test_sizing_capped_by_max_position_size() {
        let engine = RiskEngine::new(false);
        let mut s = settings();
        s.max_position_size_usd = dec!(10000);
        let decision = engine.evaluate(
            &entry_signal(dec!(100), Some(dec!(95))),
            &s,
            &snapshot(),
        );
        assert!(decision.pass, "reasons: {:?}", decision.reasons);
        // 未封顶时 200 手名义 20000，封顶后 100 手
        assert_eq!(decision.sizing.unwrap().quantity, dec!(100));
    }

    #[test]
    fn test_leverage_exceeded() {
        let engine = RiskEngine::new(false);
        let mut sig = entry_signal(dec!(100), Some(dec!(95)));
        sig.leverage = Some(50);
        let decision = engine.evaluate(&sig, &settings(), &snapshot());
        assert!(!decision.pass);
        assert_eq!(decision.reasons, vec![REASON_LEVERAGE_EXCEEDED.to_string()]);
    }

    #[test]
    fn test_daily_trade_cap() {
        let engine = RiskEngine::new(false);
        let mut snap = snapshot();
        snap.daily_trade_count = 20;
        let decision =
            engine.evaluate(&entry_signal(dec!(100), Some(dec!(95))), &settings(), &snap);
        assert!(!decision.pass);
        assert_eq!(decision.reasons, vec![REASON_MAX_DAILY_TRADES.to_string()]);
    }

    #[test]
    fn test_daily_loss_limit() {
        let engine = RiskEngine::new(false);
        let mut snap = snapshot();
        // 亏损 2500 / 50000 = 5%，达到上限
        snap.daily_realized_pnl = dec!(-2500);
        let decision =
            engine.evaluate(&entry_signal(dec!(100), Some(dec!(95))), &settings(), &snap);
        assert!(!decision.pass);
        assert_eq!(decision.reasons, vec![REASON_DAILY_LOSS_LIMIT.to_string()]);
    }

    #[test]
    fn test_portfolio_exposure_limit() {
        let engine = RiskEngine::new(false);
        let mut snap = snapshot();
        // 已有敞口 30000，上限 80% * 50000 = 40000，新单 20000 超限
        snap.open_positions
            .push(open_position("ETH-USDT", dec!(3000), dec!(10)));
        let decision =
            engine.evaluate(&entry_signal(dec!(100), Some(dec!(95))), &settings(), &snap);
        assert!(!decision.pass);
        assert_eq!(
            decision.reasons,
            vec![REASON_PORTFOLIO_EXPOSURE.to_string()]
        );
    }

    #[test]
    fn test_exit_passes_open_position_check_when_at_cap() {
        // 已满仓时离场信号仍然放行
        let engine = RiskEngine::new(false);
        let mut snap = snapshot();
        for i in 0..4 {
            snap.open_positions
                .push(open_position(&format!("SYM-{}", i), dec!(10), dec!(1)));
        }
        snap.open_positions
            .push(open_position("BTC-USDT", dec!(100), dec!(2)));

        let mut sig = entry_signal(dec!(110), None);
        sig.direction = SignalDirection::LongExit;
        let decision = engine.evaluate(&sig, &settings(), &snap);
        assert!(decision.pass, "reasons: {:?}", decision.reasons);
        let sizing = decision.sizing.unwrap();
        assert!(sizing.reduce_only);
        assert_eq!(sizing.quantity, dec!(2));
    }

    #[test]
    fn test_exit_without_position_rejected() {
        let engine = RiskEngine::new(false);
        let mut sig = entry_signal(dec!(100), None);
        sig.direction = SignalDirection::LongExit;
        let decision = engine.evaluate(&sig, &settings(), &snapshot());
        assert!(!decision.pass);
        assert_eq!(decision.reasons, vec![REASON_NO_OPEN_POSITION.to_string()]);
    }
}
