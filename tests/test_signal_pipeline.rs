//! 信号执行流水线集成测试：内存仓储 + 纸面交易所

mod common;

use rust_decimal_macros::dec;

use bot_engine::trading::model::execution_log::ExecutionStatus;
use bot_engine::trading::model::signal::SignalStatus;
use bot_engine::trading::model::trade::TradeStatus;
use bot_engine::trading::services::execution_service::ExecutionOutcome;

use common::*;

#[tokio::test]
async fn test_entry_signal_executes_end_to_end() {
    let harness = build_harness();
    seed_user(&harness, "u1");
    harness.paper.set_mark_price("BTC-USDT", dec!(100));

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    assert_eq!(ack.status, SignalStatus::Queued);

    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Executed);

    // 风险预算 1000 / 止损距离 5 = 200 手
    let trades = harness.repository.trade_snapshot();
    assert_eq!(trades.len(), 1);
    let trade = &trades[0];
    assert_eq!(trade.status, TradeStatus::Filled);
    assert_eq!(trade.quantity, dec!(200));
    assert_eq!(trade.filled_quantity, dec!(200));
    assert_eq!(trade.signal_id, signal.id);

    let positions = harness.repository.position_snapshot();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(200));
    assert_eq!(positions[0].entry_price, dec!(100));
    assert!(positions[0].is_open());

    let log = harness
        .repository
        .find_execution_log_by_signal(&signal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, ExecutionStatus::Completed);
    assert!(log.risk_check_passed);
    assert!(log.trade_executed);
    assert_eq!(log.retry_count, 0);
    assert_eq!(log.trade_id.as_deref(), Some(trade.id.as_str()));
}

#[tokio::test]
async fn test_duplicate_signal_skipped_by_fingerprint() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    let first = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    assert_eq!(first.status, SignalStatus::Queued);

    // webhook 重发：同指纹落在同一窗口，应跳过而不是报错
    let second = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    assert_eq!(second.status, SignalStatus::Skipped);
    assert_eq!(second.reason.as_deref(), Some("duplicate_signal"));

    wait_terminal(&harness, &first.signal_id).await;
    let trades = harness.repository.trade_snapshot();
    assert_eq!(trades.len(), 1);
}

#[tokio::test]
async fn test_same_signal_id_never_executes_twice() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Executed);

    // 直接重放同一条信号：协调器必须幂等拒绝
    let outcome = harness.coordinator.execute(&signal).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Duplicate));

    let trades = harness.repository.trade_snapshot();
    assert_eq!(trades.len(), 1, "重放不得产生第二笔订单");
    let positions = harness.repository.position_snapshot();
    assert_eq!(positions[0].quantity, dec!(200), "持仓数量不得重复累计");
}

#[tokio::test]
async fn test_missing_stop_loss_rejected_as_skipped() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    let mut request = entry_request("u1", "BTC-USDT", "webhook");
    request.suggested_stop_loss = None;
    let ack = harness.engine.submit(request).await.unwrap();

    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Skipped);
    assert_eq!(signal.status_reason.as_deref(), Some("missing_stop_loss"));

    // 风控拒绝不产生订单，链路按完成记录
    assert!(harness.repository.trade_snapshot().is_empty());
    let log = harness
        .repository
        .find_execution_log_by_signal(&signal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, ExecutionStatus::Completed);
    assert!(!log.risk_check_passed);
    assert!(!log.trade_executed);
}

#[tokio::test]
async fn test_max_open_positions_rejected() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    // 用户已持满 5 个仓位
    for i in 0..5 {
        harness
            .repository
            .insert_position(&open_position("u1", &format!("SYM-{}", i), dec!(10), dec!(1)))
            .await
            .unwrap();
    }

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Skipped);
    assert_eq!(
        signal.status_reason.as_deref(),
        Some("max_open_positions_exceeded")
    );
    assert!(harness.repository.trade_snapshot().is_empty());
}

#[tokio::test]
async fn test_transient_failures_retried_then_succeed() {
    let harness = build_harness();
    seed_user(&harness, "u1");
    // 两次超时后第三次成功
    harness.paper.inject_transient_failures(2);

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Executed);

    let log = harness
        .repository
        .find_execution_log_by_signal(&signal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, ExecutionStatus::Completed);
    assert_eq!(log.retry_count, 2);
    assert_eq!(harness.paper.place_order_call_count(), 3);
    assert_eq!(harness.repository.trade_snapshot().len(), 1);
}

#[tokio::test]
async fn test_retry_exhaustion_fails_signal() {
    let harness = build_harness();
    seed_user(&harness, "u1");
    harness.paper.inject_transient_failures(10);

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Failed);

    let log = harness
        .repository
        .find_execution_log_by_signal(&signal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, ExecutionStatus::Failed);
    assert_eq!(log.error_type.as_deref(), Some("transient_exhausted"));
    // 重试上限 3 次尝试 => retry_count 不超过 2
    assert_eq!(log.retry_count, 2);
    assert_eq!(harness.paper.place_order_call_count(), 3);

    let trades = harness.repository.trade_snapshot();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].status, TradeStatus::Failed);
}

#[tokio::test]
async fn test_fatal_error_fails_without_retry() {
    let harness = build_harness();
    seed_user(&harness, "u1");
    harness.paper.inject_fatal_error("insufficient balance").await;

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    let signal = wait_terminal(&harness, &ack.signal_id).await;
    assert_eq!(signal.status, SignalStatus::Failed);

    let log = harness
        .repository
        .find_execution_log_by_signal(&signal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.error_type.as_deref(), Some("fatal"));
    assert_eq!(log.retry_count, 0);
    // 致命错误不重试
    assert_eq!(harness.paper.place_order_call_count(), 1);
}

#[tokio::test]
async fn test_malformed_signal_persisted_as_failed() {
    let harness = build_harness();
    seed_user(&harness, "u1");

    let mut request = entry_request("u1", "BTC-USDT", "webhook");
    request.signal_type = "hold".to_string();
    let ack = harness.engine.submit(request).await.unwrap();
    assert_eq!(ack.status, SignalStatus::Failed);
    assert_eq!(ack.reason.as_deref(), Some("invalid_signal_type"));

    // 摄入失败也要留痕
    let signal = harness
        .repository
        .get_signal(&ack.signal_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(signal.status, SignalStatus::Failed);

    // 校验失败不进入执行，不产生执行日志
    assert!(harness
        .repository
        .find_execution_log_by_signal(&ack.signal_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_every_execution_attempt_audited() {
    let harness = build_harness();
    seed_user(&harness, "u1");
    harness.paper.inject_transient_failures(2);

    let ack = harness
        .engine
        .submit(entry_request("u1", "BTC-USDT", "webhook"))
        .await
        .unwrap();
    wait_terminal(&harness, &ack.signal_id).await;

    let audits = harness.repository.audit_snapshot();
    let failed_attempts = audits
        .iter()
        .filter(|a| a.action == "order_attempt_failed")
        .count();
    let succeeded_attempts = audits
        .iter()
        .filter(|a| a.action == "order_attempt_succeeded")
        .count();
    assert_eq!(failed_attempts, 2);
    assert_eq!(succeeded_attempts, 1);
    // 信号校验与终态迁移也都有审计
    assert!(audits.iter().any(|a| a.action == "signal_validated"));
    assert!(audits.iter().any(|a| a.action == "signal_executed"));
}
