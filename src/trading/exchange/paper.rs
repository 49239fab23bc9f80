//! 纸面交易所：dry-run 模式与测试用的模拟适配器
//!
//! 按请求价（无价时按配置的标记价）立即成交，支持注入瞬时/致命故障与
//! 部分成交比例。同一 client_order_id 的重复提交返回原回执（幂等）。

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::trading::exchange::{
    ExchangeAdapter, ExchangeCredentials, ExchangeError, ExchangePositionSnapshot, MarketDataSource,
    OrderAck, OrderRequest,
};
use crate::trading::model::trade::TradeStatus;

pub struct PaperExchange {
    mark_prices: DashMap<String, Decimal>,
    /// 剩余的瞬时故障次数，下单时先消耗
    transient_failures: AtomicU32,
    /// 置为 Some 后所有下单返回致命错误
    fatal_error: Mutex<Option<String>>,
    /// 首次成交比例（0~1]，用于模拟部分成交，默认全部成交
    fill_ratio: Mutex<Decimal>,
    /// 按幂等键记住的回执
    placed: DashMap<String, OrderAck>,
    /// 下单调用次数（含失败），测试断言重试次数用
    place_order_calls: AtomicU32,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self {
            mark_prices: DashMap::new(),
            transient_failures: AtomicU32::new(0),
            fatal_error: Mutex::new(None),
            fill_ratio: Mutex::new(Decimal::ONE),
            placed: DashMap::new(),
            place_order_calls: AtomicU32::new(0),
        }
    }

    pub fn set_mark_price(&self, symbol: &str, price: Decimal) {
        self.mark_prices.insert(symbol.to_string(), price);
    }

    /// 注入 n 次瞬时故障，之后恢复正常
    pub fn inject_transient_failures(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// 注入致命故障
    pub async fn inject_fatal_error(&self, message: &str) {
        *self.fatal_error.lock().await = Some(message.to_string());
    }

    /// 设置首次成交比例，模拟部分成交
    pub async fn set_fill_ratio(&self, ratio: Decimal) {
        *self.fill_ratio.lock().await = ratio;
    }

    pub fn place_order_call_count(&self) -> u32 {
        self.place_order_calls.load(Ordering::SeqCst)
    }
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn place_order(
        &self,
        _credentials: &ExchangeCredentials,
        request: &OrderRequest,
    ) -> Result<OrderAck, ExchangeError> {
        self.place_order_calls.fetch_add(1, Ordering::SeqCst);

        // 幂等：同键重复提交直接返回原回执
        if let Some(ack) = self.placed.get(&request.client_order_id) {
            info!(
                "paper exchange: duplicate client_order_id {}, return original ack",
                request.client_order_id
            );
            return Ok(ack.clone());
        }

        if let Some(message) = self.fatal_error.lock().await.clone() {
            return Err(ExchangeError::Fatal(message));
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ExchangeError::Transient("request timed out".to_string()));
        }

        let fill_price = match request.price {
            Some(p) => p,
            None => self
                .mark_prices
                .get(&request.symbol)
                .map(|p| *p)
                .ok_or_else(|| {
                    ExchangeError::Fatal(format!("unknown symbol: {}", request.symbol))
                })?,
        };
        let ratio = *self.fill_ratio.lock().await;
        let filled = (request.quantity * ratio).normalize();
        let status = if filled == request.quantity {
            TradeStatus::Filled
        } else {
            TradeStatus::PartiallyFilled
        };

        let ack = OrderAck {
            exchange_order_id: Uuid::new_v4().to_string(),
            status,
            filled_quantity: filled,
            avg_fill_price: Some(fill_price),
            fee: Some(Decimal::ZERO),
        };
        self.placed
            .insert(request.client_order_id.clone(), ack.clone());
        Ok(ack)
    }

    async fn cancel_order(
        &self,
        _credentials: &ExchangeCredentials,
        exchange_order_id: &str,
    ) -> Result<(), ExchangeError> {
        info!("paper exchange: cancel order {}", exchange_order_id);
        Ok(())
    }

    async fn get_position(
        &self,
        _credentials: &ExchangeCredentials,
        symbol: &str,
    ) -> Result<Option<ExchangePositionSnapshot>, ExchangeError> {
        // 纸面交易所不维护交易所侧持仓
        let _ = symbol;
        Ok(None)
    }
}

/// 纸面行情：标记价直接取纸面交易所里配置的价格
#[async_trait]
impl MarketDataSource for PaperExchange {
    async fn get_mark_price(&self, symbol: &str, _exchange: &str) -> anyhow::Result<Decimal> {
        self.mark_prices
            .get(symbol)
            .map(|p| *p)
            .ok_or_else(|| anyhow::anyhow!("未配置标记价: {}", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::model::trade::{OrderType, TradeSide};
    use rust_decimal_macros::dec;

    fn creds() -> ExchangeCredentials {
        ExchangeCredentials {
            api_key: String::new(),
            api_secret: String::new(),
            passphrase: None,
        }
    }

    fn request(client_order_id: &str) -> OrderRequest {
        OrderRequest {
            user_id: "u1".to_string(),
            exchange: "paper".to_string(),
            symbol: "BTC-USDT".to_string(),
            side: TradeSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(1),
            price: Some(dec!(100)),
            client_order_id: client_order_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fills_at_request_price() {
        let ex = PaperExchange::new();
        let ack = ex.place_order(&creds(), &request("c1")).await.unwrap();
        assert_eq!(ack.status, TradeStatus::Filled);
        assert_eq!(ack.filled_quantity, dec!(1));
        assert_eq!(ack.avg_fill_price, Some(dec!(100)));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let ex = PaperExchange::new();
        ex.inject_transient_failures(2);

        assert!(ex.place_order(&creds(), &request("c1")).await.is_err());
        assert!(ex.place_order(&creds(), &request("c1")).await.is_err());
        let ack = ex.place_order(&creds(), &request("c1")).await.unwrap();
        assert_eq!(ack.status, TradeStatus::Filled);
        assert_eq!(ex.place_order_call_count(), 3);
    }

    #[tokio::test]
    async fn test_idempotent_resubmit() {
        let ex = PaperExchange::new();
        let first = ex.place_order(&creds(), &request("c1")).await.unwrap();
        let second = ex.place_order(&creds(), &request("c1")).await.unwrap();
        assert_eq!(first.exchange_order_id, second.exchange_order_id);
    }
}
