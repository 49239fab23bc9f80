extern crate rbatis;

use rbatis::{crud, impl_select};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::trading::model::trade::TradeSide;

/// 持仓方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }

    /// 加仓方向的买卖边
    pub fn entry_trade_side(&self) -> TradeSide {
        match self {
            PositionSide::Long => TradeSide::Buy,
            PositionSide::Short => TradeSide::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
        }
    }
}

/// 持仓表
///
/// 不变式：quantity 始终 >= 0；realized_pnl 只在 closed 时落定；
/// 同 (user, exchange, symbol, strategy) 下最多一个 open 持仓（除非显式开启对冲）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEntity {
    pub id: String,
    pub user_id: String,
    pub exchange: String,
    pub symbol: String,
    pub side: PositionSide,
    pub status: PositionStatus,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub leverage: i32,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Option<Decimal>,
    pub margin: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
    pub strategy_id: Option<String>,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
}

crud!(PositionEntity {}, "positions");
impl_select!(PositionEntity{select_open_by_user(user_id:&str) =>
    "`where user_id = #{user_id} and status = 'open'`"},"positions");
impl_select!(PositionEntity{select_open_by_key(user_id:&str,exchange:&str,symbol:&str) =>
    "`where user_id = #{user_id} and exchange = #{exchange} and symbol = #{symbol} and status = 'open'`"},"positions");

impl PositionEntity {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// 以入场价计的名义价值
    pub fn notional_usd(&self) -> Decimal {
        self.entry_price * self.quantity
    }

    /// 按标记价重算未实现盈亏
    pub fn refresh_unrealized_pnl(&mut self, mark_price: Decimal) {
        if !self.is_open() || self.quantity.is_zero() {
            self.unrealized_pnl = Decimal::ZERO;
            return;
        }
        self.unrealized_pnl = match self.side {
            PositionSide::Long => (mark_price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - mark_price) * self.quantity,
        };
    }

    /// 将一笔成交作用到持仓上，返回本次实现的盈亏
    ///
    /// 同向成交：加权平均入场价并增加数量；
    /// 反向成交：按比例实现盈亏并减少数量，数量归零时平仓。
    /// 反向数量超出持仓的部分按全平处理（离场信号按持仓数量下单，正常不会触发）。
    ///
    /// realized_pnl 只在平仓时落定：部分减仓的盈亏记在对应订单上，
    /// prior_realized 传入此前减仓已实现的累计值，平仓时一并固定。
    pub fn apply_fill(
        &mut self,
        fill_side: TradeSide,
        fill_quantity: Decimal,
        fill_price: Decimal,
        prior_realized: Decimal,
        now_ms: i64,
    ) -> Result<Decimal, AppError> {
        if !self.is_open() {
            return Err(AppError::BizError(format!(
                "持仓已平，无法再应用成交: position_id={}",
                self.id
            )));
        }
        if fill_quantity <= Decimal::ZERO {
            return Err(AppError::BizError("成交数量必须为正".to_string()));
        }

        let is_add = fill_side == self.side.entry_trade_side();
        if is_add {
            // 加仓：加权平均入场价
            let total = self.quantity + fill_quantity;
            self.entry_price =
                (self.entry_price * self.quantity + fill_price * fill_quantity) / total;
            self.quantity = total;
            return Ok(Decimal::ZERO);
        }

        // 减仓/平仓
        let closed = fill_quantity.min(self.quantity);
        let realized = match self.side {
            PositionSide::Long => (fill_price - self.entry_price) * closed,
            PositionSide::Short => (self.entry_price - fill_price) * closed,
        };
        self.quantity -= closed;

        if self.quantity.is_zero() {
            self.status = PositionStatus::Closed;
            self.realized_pnl = Some(prior_realized + realized);
            self.unrealized_pnl = Decimal::ZERO;
            self.closed_at = Some(now_ms);
        }
        Ok(realized)
    }
}
