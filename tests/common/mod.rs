//! 集成测试公共设施：内存仓储 + 纸面交易所拼出完整流水线
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use bot_engine::trading::cache::DedupCache;
use bot_engine::trading::exchange::{
    ExchangeAdapter, ExchangeCredentials, MarketDataSource, PaperExchange,
    StaticCredentialProvider,
};
use bot_engine::trading::model::position::{PositionEntity, PositionSide, PositionStatus};
use bot_engine::trading::model::repository::MemEngineRepository;
// 仓储 trait 随 glob 一起带给各测试文件
pub use bot_engine::trading::model::repository::EngineRepository;
use bot_engine::trading::model::risk_settings::RiskSettingsEntity;
use bot_engine::trading::model::signal::SignalEntity;
use bot_engine::trading::services::event_service::TracingEventSink;
use bot_engine::trading::services::execution_service::{ExecutionCoordinator, RetryPolicy};
use bot_engine::trading::services::signal_service::{IngestRequest, SignalService};
use bot_engine::trading::task::{SignalEngine, SignalRunner};

pub struct Harness {
    pub repository: Arc<MemEngineRepository>,
    pub paper: Arc<PaperExchange>,
    pub coordinator: Arc<ExecutionCoordinator>,
    pub runner: Arc<SignalRunner>,
    pub engine: SignalEngine,
}

/// 测试用快速重试策略：退避接近零，免得测试等待
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        attempt_timeout: Duration::from_secs(2),
        backoff_base_ms: 1,
        max_backoff: Duration::from_millis(10),
    }
}

pub fn build_harness() -> Harness {
    let paper = Arc::new(PaperExchange::new());
    build_harness_with_adapter(paper.clone(), paper.clone(), paper, fast_retry_policy())
}

pub fn build_harness_with_adapter(
    exchange: Arc<dyn ExchangeAdapter>,
    market_data: Arc<dyn MarketDataSource>,
    paper: Arc<PaperExchange>,
    retry_policy: RetryPolicy,
) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let repository = Arc::new(MemEngineRepository::new());
    let repo_dyn: Arc<dyn EngineRepository> = repository.clone();

    let coordinator = Arc::new(ExecutionCoordinator::new(
        repo_dyn.clone(),
        exchange,
        market_data,
        Arc::new(StaticCredentialProvider::new(empty_credentials())),
        Arc::new(TracingEventSink),
        retry_policy,
        false,
    ));
    let runner = Arc::new(SignalRunner::new(
        coordinator.clone(),
        repo_dyn.clone(),
        8,
    ));
    let dedup = Arc::new(DedupCache::new(60, false));
    let engine = SignalEngine::new(
        SignalService::new(repo_dyn.clone(), dedup),
        runner.clone(),
        repo_dyn,
    );

    Harness {
        repository,
        paper,
        coordinator,
        runner,
        engine,
    }
}

pub fn empty_credentials() -> ExchangeCredentials {
    ExchangeCredentials {
        api_key: String::new(),
        api_secret: String::new(),
        passphrase: None,
    }
}

/// 默认风控：5 万美元账户，单笔风险 2%
pub fn seed_user(harness: &Harness, user_id: &str) {
    harness.repository.set_risk_settings(default_settings(user_id));
    harness
        .repository
        .set_account_equity(user_id, dec!(50000));
}

pub fn default_settings(user_id: &str) -> RiskSettingsEntity {
    RiskSettingsEntity {
        user_id: user_id.to_string(),
        max_position_size_usd: dec!(50000),
        max_leverage: 10,
        max_open_positions: 5,
        max_daily_trades: 20,
        max_daily_loss_percent: dec!(5),
        max_portfolio_exposure_percent: dec!(100),
        default_risk_per_trade_percent: dec!(2),
        require_stop_loss: true,
        updated_at: 0,
    }
}

/// 标准入场请求：entry=100 stop=95 => 风险预算 1000 / 距离 5 = 200 手
pub fn entry_request(user_id: &str, symbol: &str, source: &str) -> IngestRequest {
    IngestRequest {
        user_id: user_id.to_string(),
        strategy_id: Some("s1".to_string()),
        exchange: "paper".to_string(),
        symbol: symbol.to_string(),
        signal_type: "long_entry".to_string(),
        suggested_entry: Some(dec!(100)),
        suggested_stop_loss: Some(dec!(95)),
        suggested_take_profit: Some(dec!(120)),
        leverage: Some(3),
        source: source.to_string(),
        raw_payload: serde_json::json!({}),
    }
}

pub fn exit_request(user_id: &str, symbol: &str, price: Decimal) -> IngestRequest {
    IngestRequest {
        user_id: user_id.to_string(),
        strategy_id: Some("s1".to_string()),
        exchange: "paper".to_string(),
        symbol: symbol.to_string(),
        signal_type: "long_exit".to_string(),
        suggested_entry: Some(price),
        suggested_stop_loss: None,
        suggested_take_profit: None,
        leverage: None,
        source: "webhook".to_string(),
        raw_payload: serde_json::json!({}),
    }
}

pub fn open_position(user_id: &str, symbol: &str, entry: Decimal, qty: Decimal) -> PositionEntity {
    PositionEntity {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        exchange: "paper".to_string(),
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

/// 轮询等待信号进入终态
pub async fn wait_terminal(harness: &Harness, signal_id: &str) -> SignalEntity {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(signal) = harness.repository.get_signal(signal_id).await.unwrap() {
            if signal.status.is_terminal() {
                return signal;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("信号未在时限内进入终态: {}", signal_id);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
