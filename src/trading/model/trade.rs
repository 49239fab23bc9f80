extern crate rbatis;

use rbatis::{crud, impl_select};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 订单买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// 订单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

/// 订单状态
///
/// 不变式：filled_quantity <= quantity；filled 当且仅当 filled_quantity == quantity。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Canceled,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::PartiallyFilled => "partially_filled",
            TradeStatus::Filled => "filled",
            TradeStatus::Canceled => "canceled",
            TradeStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Filled | TradeStatus::Canceled | TradeStatus::Failed
        )
    }
}

/// 订单表：每次向交易所提交的委托
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEntity {
    pub id: String,
    pub user_id: String,
    pub position_id: Option<String>,
    pub exchange: String,
    pub symbol: String,
    pub side: TradeSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub status: TradeStatus,
    pub exchange_order_id: Option<String>,
    pub signal_id: String,
    pub realized_pnl: Option<Decimal>,
    pub created_at: i64,
    pub updated_at: i64,
}

crud!(TradeEntity {}, "trades");
impl_select!(TradeEntity{select_by_signal(signal_id:&str) =>
    "`where signal_id = #{signal_id}`"},"trades");
impl_select!(TradeEntity{select_daily_by_user(user_id:&str,day_start:i64) =>
    "`where user_id = #{user_id} and created_at >= #{day_start}`"},"trades");
impl_select!(TradeEntity{select_by_position(position_id:&str) =>
    "`where position_id = #{position_id}`"},"trades");

impl TradeEntity {
    /// 记录一次成交回报，维护 filled_quantity/avg_fill_price/status 不变式
    pub fn record_fill(
        &mut self,
        fill_quantity: Decimal,
        fill_price: Decimal,
        fee: Option<Decimal>,
        now_ms: i64,
    ) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::BizError(format!(
                "订单已终态，无法再记录成交: trade_id={}, status={}",
                self.id,
                self.status.as_str()
            )));
        }
        if fill_quantity <= Decimal::ZERO {
            return Err(AppError::BizError("成交数量必须为正".to_string()));
        }
        let new_filled = self.filled_quantity + fill_quantity;
        if new_filled > self.quantity {
            return Err(AppError::BizError(format!(
                "成交数量超出委托数量: trade_id={}, filled={}, quantity={}",
                self.id, new_filled, self.quantity
            )));
        }

        // 加权平均成交价
        let prev_value = self.avg_fill_price.unwrap_or(Decimal::ZERO) * self.filled_quantity;
        self.avg_fill_price = Some((prev_value + fill_price * fill_quantity) / new_filled);
        self.filled_quantity = new_filled;
        if let Some(f) = fee {
            self.fee = Some(self.fee.unwrap_or(Decimal::ZERO) + f);
        }
        self.status = if self.filled_quantity == self.quantity {
            TradeStatus::Filled
        } else {
            TradeStatus::PartiallyFilled
        };
        self.updated_at = now_ms;
        Ok(())
    }

    pub fn mark_failed(&mut self, now_ms: i64) {
        self.status = TradeStatus::Failed;
        self.updated_at = now_ms;
    }

    pub fn mark_canceled(&mut self, now_ms: i64) {
        self.status = TradeStatus::Canceled;
        self.updated_at = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_trade(qty: Decimal) -> TradeEntity {
        TradeEntity {
            id: "t1".to_string(),
            user_id: "u1".to_string(),
            position_id: None,
            exchange: "okx".to_string(),
            symbol: "BTC-USDT".to_string(),
            side: TradeSide::Buy,
            order_type: OrderType::Market,
            quantity: qty,
            price: None,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            fee: None,
            status: TradeStatus::Pending,
            exchange_order_id: None,
            signal_id: "sig-1".to_string(),
            realized_pnl: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_partial_then_full_fill() {
        let mut trade = make_trade(dec!(200));
        trade.record_fill(dec!(50), dec!(100), None, 1).unwrap();
        assert_eq!(trade.status, TradeStatus::PartiallyFilled);
        assert_eq!(trade.filled_quantity, dec!(50));

        trade.record_fill(dec!(150), dec!(104), None, 2).unwrap();
        assert_eq!(trade.status, TradeStatus::Filled);
        assert_eq!(trade.filled_quantity, dec!(200));
        // 加权平均: (50*100 + 150*104) / 200 = 103
        assert_eq!(trade.avg_fill_price, Some(dec!(103)));
    }

    #[test]
    fn test_overfill_rejected() {
        let mut trade = make_trade(dec!(10));
        assert!(trade.record_fill(dec!(11), dec!(100), None, 1).is_err());
        trade.record_fill(dec!(10), dec!(100), None, 1).unwrap();
        // filled 终态后不再接受成交
        assert!(trade.record_fill(dec!(1), dec!(100), None, 2).is_err());
    }

    #[test]
    fn test_fee_accumulates() {
        let mut trade = make_trade(dec!(2));
        trade
            .record_fill(dec!(1), dec!(100), Some(dec!(0.1)), 1)
            .unwrap();
        trade
            .record_fill(dec!(1), dec!(100), Some(dec!(0.2)), 2)
            .unwrap();
        assert_eq!(trade.fee, Some(dec!(0.3)));
    }
}
