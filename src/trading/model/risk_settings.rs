extern crate rbatis;

use rbatis::{crud, impl_select};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 用户风控配置，账户管理侧维护，引擎只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettingsEntity {
    pub user_id: String,
    pub max_position_size_usd: Decimal,
    pub max_leverage: i32,
    pub max_open_positions: i32,
    pub max_daily_trades: i32,
    pub max_daily_loss_percent: Decimal,
    pub max_portfolio_exposure_percent: Decimal,
    pub default_risk_per_trade_percent: Decimal,
    pub require_stop_loss: bool,
    pub updated_at: i64,
}

crud!(RiskSettingsEntity {}, "risk_settings");
impl_select!(RiskSettingsEntity{select_by_user(user_id:&str) =>
    "`where user_id = #{user_id} limit 1`"},"risk_settings");
