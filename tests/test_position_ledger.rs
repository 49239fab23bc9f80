//! 持仓台账与成交落账测试

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use bot_engine::trading::model::repository::EngineRepository;
use bot_engine::trading::model::signal::{SignalDirection, SignalEntity, SignalStatus};
use bot_engine::trading::model::trade::{OrderType, TradeEntity, TradeSide, TradeStatus};
use bot_engine::trading::services::position_service::PositionService;
use bot_engine::time_util::day_start_mills;
use bot_engine::time_util::now_timestamp_mills;

use common::*;

fn entry_signal(user_id: &str, symbol: &str) -> SignalEntity {
    SignalEntity {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        strategy_id: Some("s1".to_string()),
        exchange: "paper".to_string(),
        symbol: symbol.to_string(),
        direction: SignalDirection::LongEntry,
        suggested_entry: Some(dec!(100)),
        suggested_stop_loss: Some(dec!(95)),
        suggested_take_profit: None,
        leverage: Some(1),
        source: "webhook".to_string(),
        raw_payload: "{}".to_string(),
        fingerprint: "fp".to_string(),
        status: SignalStatus::Queued,
        status_reason: None,
        created_at: now_timestamp_mills(),
        updated_at: now_timestamp_mills(),
    }
}

fn pending_trade(signal: &SignalEntity, qty: Decimal) -> TradeEntity {
    TradeEntity {
        id: Uuid::new_v4().to_string(),
        user_id: signal.user_id.clone(),
        position_id: None,
        exchange: signal.exchange.clone(),
        symbol: signal.symbol.clone(),
        side: TradeSide::Buy,
        order_type: OrderType::Market,
        quantity: qty,
        price: None,
        filled_quantity: Decimal::ZERO,
        avg_fill_price: None,
        fee: None,
        status: TradeStatus::Pending,
        exchange_order_id: None,
        signal_id: signal.id.clone(),
        realized_pnl: None,
        created_at: now_timestamp_mills(),
        updated_at: now_timestamp_mills(),
    }
}

/// 部分成交 50 + 150：持仓到 200，订单 filled，成交均价按量加权
#[tokio::test]
async fn test_partial_fills_accumulate_into_position() {
    let harness = build_harness();
    let repo: Arc<dyn EngineRepository> = harness.repository.clone();
    let ledger = PositionService::new(repo.clone(), false);

    let signal = entry_signal("u1", "BTC-USDT");
    let mut trade = pending_trade(&signal, dec!(200));
    repo.insert_trade(&trade).await.unwrap();

    // 第一笔 50
    trade
        .record_fill(dec!(50), dec!(100), None, now_timestamp_mills())
        .unwrap();
    assert_eq!(trade.status, TradeStatus::PartiallyFilled);
    let fill = ledger
        .apply_fill(&signal, &trade, dec!(50), dec!(100), dec!(100))
        .await
        .unwrap();
    assert!(fill.opened);
    assert_eq!(fill.position.quantity, dec!(50));

    // 第二笔 150
    trade
        .record_fill(dec!(150), dec!(104), None, now_timestamp_mills())
        .unwrap();
    assert_eq!(trade.status, TradeStatus::Filled);
    assert_eq!(trade.filled_quantity, dec!(200));
    assert_eq!(trade.avg_fill_price, Some(dec!(103)));

    let fill = ledger
        .apply_fill(&signal, &trade, dec!(150), dec!(104), dec!(104))
        .await
        .unwrap();
    assert!(!fill.opened);
    assert_eq!(fill.position.quantity, dec!(200));
    // 持仓入场价同样按量加权
    assert_eq!(fill.position.entry_price, dec!(103));
}

/// 协调器路径的部分成交：订单停在 partially_filled，持仓记部分数量
#[tokio::test]
async fn test_partial_fill_through_coordinator() {
    let harness = build_harness();
    seed_user(&harness, "u1");
    harness.paper.set_fill_ratio(dec!(0.25)).await;

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Executed);

    let trades = harness.repository.trade_snapshot();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].status, TradeStatus::PartiallyFilled);
    assert_eq!(trades[0].filled_quantity, dec!(50));

    let positions = harness.repository.position_snapshot();
    assert_eq!(positions[0].quantity, dec!(50));
}

/// 入场后离场：持仓平掉，订单上带实现盈亏，日内盈亏可查
#[tokio::test]
async fn test_exit_signal_closes_position_and_realizes_pnl() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let entry = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(entry.status, SignalStatus::Executed);

    // 110 离场：实现盈亏 (110-100)*200 = 2000
    let ack = harness
        .engine
        .submit(exit_request("u1", "BTC-USDT", dec!(110)))
        .await
        .unwrap();
    let exit = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(exit.status, SignalStatus::Executed);

    let positions = harness.repository.position_snapshot();
    assert_eq!(positions.len(), 1);
    assert!(!positions[0].is_open());
    assert_eq!(positions[0].quantity, Decimal::ZERO);
    assert_eq!(positions[0].realized_pnl, Some(dec!(2000)));
    assert!(positions[0].closed_at.is_some());

    let trades = harness.repository.trade_snapshot();
    let exit_trade = trades.iter().find(|t| t.signal_id == exit.id).unwrap();
    assert_eq!(exit_trade.side, TradeSide::Sell);
    assert_eq!(exit_trade.realized_pnl, Some(dec!(2000)));

    let day_start = day_start_mills(now_timestamp_mills());
    let daily = harness
        .repository
        .daily_realized_pnl("u1", day_start)
        .await
        .unwrap();
    assert_eq!(daily, dec!(2000));
}

/// 没有持仓时的离场信号被风控拒绝
#[tokio::test]
async fn test_exit_without_position_skipped() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    let ack = harness
        .engine
        .submit(exit_request("u1", "BTC-USDT", dec!(110)))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Skipped);
    assert_eq!(signal.status_reason.as_deref(), Some("no_open_position"));
}
