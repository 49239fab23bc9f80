//! 分区键串行与跨键并行测试

mod common;

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use bot_engine::trading::exchange::{
    ExchangeAdapter, ExchangeCredentials, ExchangeError, ExchangePositionSnapshot, OrderAck,
    OrderRequest, PaperExchange,
};
use bot_engine::trading::model::risk_settings::RiskSettingsEntity;
use bot_engine::trading::model::signal::SignalStatus;

use common::*;

/// 包装纸面交易所：记录下单并发度与到达顺序，并人为放慢成交
struct GateAdapter {
    inner: Arc<PaperExchange>,
    delay: Duration,
    concurrent: AtomicI32,
    max_concurrent: AtomicI32,
    seen_order: Mutex<Vec<String>>,
}

impl GateAdapter {
    fn new(inner: Arc<PaperExchange>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            concurrent: AtomicI32::new(0),
            max_concurrent: AtomicI32::new(0),
            seen_order: Mutex::new(Vec::new()),
        }
    }

    fn max_seen(&self) -> i32 {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    fn seen(&self) -> Vec<String> {
        self.seen_order.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeAdapter for GateAdapter {
    fn name(&self) -> &'static str {
        "gate"
    }

    async fn place_order(
        &self,
        credentials: &ExchangeCredentials,
        request: &OrderRequest,
    ) -> Result<OrderAck, ExchangeError> {
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.seen_order
            .lock()
            .unwrap()
            .push(request.client_order_id.clone());

        tokio::time::sleep(self.delay).await;
        let result = self.inner.place_order(credentials, request).await;
        self.concurrent.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn cancel_order(
        &self,
        credentials: &ExchangeCredentials,
        exchange_order_id: &str,
    ) -> Result<(), ExchangeError> {
        self.inner.cancel_order(credentials, exchange_order_id).await
    }

    async fn get_position(
        &self,
        credentials: &ExchangeCredentials,
        symbol: &str,
    ) -> Result<Option<ExchangePositionSnapshot>, ExchangeError> {
        self.inner.get_position(credentials, symbol).await
    }
}

/// 宽松风控：并发测试里不希望规则先拦下信号
fn loose_settings(user_id: &str) -> RiskSettingsEntity {
    RiskSettingsEntity {
        max_position_size_usd: dec!(100000000),
        max_portfolio_exposure_percent: dec!(100000),
        max_open_positions: 100,
        max_daily_trades: 1000,
        default_risk_per_trade_percent: dec!(0.1),
        ..default_settings(user_id)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_signals_run_strictly_serial() {
    let paper = Arc::new(PaperExchange::new());
    let gate = Arc::new(GateAdapter::new(paper.clone(), Duration::from_millis(50)));
    let harness = build_harness_with_adapter(
        gate.clone(),
        paper.clone(),
        paper,
        fast_retry_policy(),
    );
    harness.repository.set_risk_settings(loose_settings("u1"));
    harness.repository.set_account_equity("u1", dec!(50000));

    // 同键三条信号：source 不同避开指纹去重
    let mut ids = Vec::new();
    for source in ["s1", "s2", "s3"] {
        let ack = harness
            .engine
            .submit(entry_request("u1", "BTC-USDT", source))
            .await
            .unwrap();
        assert_eq!(ack.status, SignalStatus::Queued);
        ids.push(ack.signal_id);
    }
    for id in &ids {
        let signal = wait_terminal(&harness, id).await;
        assert_eq!(signal.status, SignalStatus::Executed);
    }

    // 同一分区键上任何时刻只有一次在途下单
    assert_eq!(gate.max_seen(), 1);
    // 且按到达顺序提交
    assert_eq!(gate.seen(), ids);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_execute_in_parallel() {
    let paper = Arc::new(PaperExchange::new());
    let gate = Arc::new(GateAdapter::new(paper.clone(), Duration::from_millis(100)));
    let harness = build_harness_with_adapter(
        gate.clone(),
        paper.clone(),
        paper,
        fast_retry_policy(),
    );
    harness.repository.set_risk_settings(loose_settings("u1"));
    harness.repository.set_account_equity("u1", dec!(50000));

    let mut ids = Vec::new();
    for symbol in ["BTC-USDT", "ETH-USDT", "SOL-USDT", "BNB-USDT"] {
        let ack = harness
            .engine
            .submit(entry_request("u1", symbol, "webhook"))
            .await
            .unwrap();
        ids.push(ack.signal_id);
    }
    for id in &ids {
        let signal = wait_terminal(&harness, id).await;
        assert_eq!(signal.status, SignalStatus::Executed);
    }

    // 不同键之间允许并行（100ms 的人为延迟足够让 worker 重叠）
    assert!(
        gate.max_seen() >= 2,
        "跨键执行应当并行，观察到的最大并发为 {}",
        gate.max_seen()
    );
}
