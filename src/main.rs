use std::env;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use dotenv::dotenv;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use bot_engine::app_config::env::{env_is_true, env_or_default, env_parse_or};
use bot_engine::app_config::log::setup_logging;
use bot_engine::app_config::redis::signal_dedup_ttl_secs;
use bot_engine::job::stale_signal_job::StaleSignalJob;
use bot_engine::job::task_scheduler::TaskScheduler;
use bot_engine::trading::cache::DedupCache;
use bot_engine::trading::exchange::{
    ExchangeAdapter, MarketDataSource, PaperExchange, StaticCredentialProvider,
};
use bot_engine::trading::model::repository::{
    EngineRepository, MemEngineRepository, MysqlEngineRepository,
};
use bot_engine::trading::model::risk_settings::RiskSettingsEntity;
use bot_engine::trading::services::event_service::TracingEventSink;
use bot_engine::trading::services::execution_service::{ExecutionCoordinator, RetryPolicy};
use bot_engine::trading::services::signal_service::{IngestRequest, SignalService};
use bot_engine::trading::task::{SignalEngine, SignalRunner};

#[derive(Parser, Debug)]
#[command(name = "bot-engine", about = "信号执行引擎")]
struct Args {
    /// 干跑模式：内存仓储 + 纸面交易所，不连 MySQL
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// 全局并发执行上限
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 设置日志
    setup_logging().await?;

    let args = Args::parse();
    let dry_run = args.dry_run || env_is_true("IS_DRY_RUN", false);
    if dry_run {
        env::set_var("IS_DRY_RUN", "true");
    }
    bot_engine::app_init().await?;

    // ---- 仓储 ----
    let mem_repository = Arc::new(MemEngineRepository::new());
    let repository: Arc<dyn EngineRepository> = if dry_run {
        mem_repository.clone()
    } else {
        Arc::new(MysqlEngineRepository::new())
    };

    // ---- 交易所适配器 / 行情 ----
    let paper = Arc::new(PaperExchange::new());
    let adapter_name = env_or_default("EXCHANGE_ADAPTER", "paper");
    let exchange: Arc<dyn ExchangeAdapter> = match adapter_name.as_str() {
        "paper" => paper.clone(),
        other => return Err(anyhow!("未注册的交易所适配器: {}", other)),
    };
    if !dry_run {
        warn!("生产模式使用纸面交易所适配器，仅供联调");
    }
    let market_data: Arc<dyn MarketDataSource> = paper.clone();

    // ---- 执行流水线 ----
    let allow_hedging = env_is_true("RISK_ALLOW_HEDGING", false);
    let coordinator = Arc::new(ExecutionCoordinator::new(
        repository.clone(),
        exchange,
        market_data,
        Arc::new(StaticCredentialProvider::from_env()),
        Arc::new(TracingEventSink),
        RetryPolicy::from_env(),
        allow_hedging,
    ));
    let max_workers = args
        .workers
        .unwrap_or_else(|| env_parse_or("ENGINE_MAX_WORKERS", 8usize));
    let runner = Arc::new(SignalRunner::new(
        coordinator.clone(),
        repository.clone(),
        max_workers,
    ));
    let dedup = Arc::new(DedupCache::from_env(signal_dedup_ttl_secs()));
    let engine = SignalEngine::new(
        SignalService::new(repository.clone(), dedup.clone()),
        runner.clone(),
        repository.clone(),
    );
    info!(
        "✓ 信号执行引擎启动: dry_run={}, workers={}, hedging={}",
        dry_run, max_workers, allow_hedging
    );

    // ---- 周期任务 ----
    let mut scheduler = TaskScheduler::new();
    {
        let stale_job = Arc::new(StaleSignalJob::new(
            repository.clone(),
            Arc::new(TracingEventSink),
            env_parse_or("STALE_SIGNAL_MAX_AGE_MS", 300_000i64),
        ));
        scheduler.add_periodic_task(
            "stale_signal_reaper".to_string(),
            env_parse_or("STALE_SIGNAL_SWEEP_MS", 60_000u64),
            move || {
                let job = stale_job.clone();
                async move {
                    if let Err(e) = job.run().await {
                        error!("滞留信号回收失败: {}", e);
                    }
                }
            },
        );
    }
    {
        let dedup = dedup.clone();
        scheduler.add_periodic_task(
            "dedup_cache_sweeper".to_string(),
            signal_dedup_ttl_secs() * 1000,
            move || {
                let dedup = dedup.clone();
                async move {
                    dedup.sweep_expired();
                }
            },
        );
    }

    // 干跑冒烟：喂两条演示信号跑通整条流水线
    if dry_run && env_is_true("IS_RUN_DEMO_SIGNALS", false) {
        run_demo_signals(&engine, &mem_repository, &paper).await?;
    }

    // 捕捉Ctrl+C信号以平滑关闭
    tokio::signal::ctrl_c().await?;
    scheduler.shutdown().await;
    runner.shutdown().await;

    Ok(())
}

async fn run_demo_signals(
    engine: &SignalEngine,
    repository: &Arc<MemEngineRepository>,
    paper: &Arc<PaperExchange>,
) -> anyhow::Result<()> {
    let user_id = "demo-user";
    repository.set_risk_settings(RiskSettingsEntity {
        user_id: user_id.to_string(),
        max_position_size_usd: Decimal::from(50_000),
        max_leverage: 10,
        max_open_positions: 5,
        max_daily_trades: 20,
        max_daily_loss_percent: Decimal::from(5),
        max_portfolio_exposure_percent: Decimal::from(80),
        default_risk_per_trade_percent: Decimal::from(2),
        require_stop_loss: true,
        updated_at: 0,
    });
    repository.set_account_equity(user_id, Decimal::from(50_000));
    paper.set_mark_price("BTC-USDT", Decimal::from(60_000));

    let ack = engine
        .submit(IngestRequest {
            user_id: user_id.to_string(),
            strategy_id: Some("demo-strategy".to_string()),
            exchange: "paper".to_string(),
            symbol: "BTC-USDT".to_string(),
            signal_type: "long_entry".to_string(),
            suggested_entry: Some(Decimal::from(60_000)),
            suggested_stop_loss: Some(Decimal::from(58_000)),
            suggested_take_profit: Some(Decimal::from(65_000)),
            leverage: Some(3),
            source: "demo".to_string(),
            raw_payload: serde_json::json!({ "demo": true }),
        })
        .await?;
    info!("演示信号已入队: {:?}", ack);

    // 同指纹的重复提交应当被去重跳过
    let dup = engine
        .submit(IngestRequest {
            user_id: user_id.to_string(),
            strategy_id: Some("demo-strategy".to_string()),
            exchange: "paper".to_string(),
            symbol: "BTC-USDT".to_string(),
            signal_type: "long_entry".to_string(),
            suggested_entry: Some(Decimal::from(60_000)),
            suggested_stop_loss: Some(Decimal::from(58_000)),
            suggested_take_profit: Some(Decimal::from(65_000)),
            leverage: Some(3),
            source: "demo".to_string(),
            raw_payload: serde_json::json!({ "demo": true }),
        })
        .await?;
    info!("重复演示信号回执: {:?}", dup);
    Ok(())
}
