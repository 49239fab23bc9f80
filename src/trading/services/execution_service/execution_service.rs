//! 执行协调器
//!
//! 同一 (user, exchange, symbol) 键上的信号严格串行：取风控快照、评估、
//! 下单、落账都在同一把键级互斥锁内完成，快照在决策与提交之间不会过期。
//! 幂等以信号 id 为准：已存在非 failed 执行日志的信号拒绝重放，信号 id
//! 同时作为 client_order_id 传给交易所适配器。

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::time_util::{day_start_mills, now_timestamp_mills};
use crate::trading::exchange::{
    CredentialProvider, ExchangeAdapter, ExchangeError, MarketDataSource, OrderAck, OrderRequest,
};
use crate::trading::model::execution_log::{ExecutionLogEntity, ExecutionStatus};
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::signal::{SignalEntity, SignalStatus};
use crate::trading::model::trade::{OrderType, TradeEntity, TradeStatus};
use crate::trading::services::audit_service::AuditRecorder;
use crate::trading::services::event_service::{EngineEvent, EventSink};
use crate::trading::services::execution_service::retry_policy::{
    RetryDecision, RetryPolicy, RetrySchedule,
};
use crate::trading::services::position_service::PositionService;
use crate::trading::services::risk_service::{AccountSnapshot, RiskDecision, RiskEngine};

/// 一次执行的最终结果
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// 下单成功，订单可能已全部或部分成交
    Executed(TradeEntity),
    /// 风控拒绝（预期结果），信号转 skipped
    RiskRejected(Vec<String>),
    /// 幂等拒绝：该信号已有执行链路
    Duplicate,
    /// 执行失败（致命错误或重试耗尽），信号转 failed
    Failed {
        error_type: String,
        message: String,
    },
}

pub struct ExecutionCoordinator {
    repository: Arc<dyn EngineRepository>,
    exchange: Arc<dyn ExchangeAdapter>,
    market_data: Arc<dyn MarketDataSource>,
    credentials: Arc<dyn CredentialProvider>,
    events: Arc<dyn EventSink>,
    positions: PositionService,
    audit: AuditRecorder,
    risk_engine: RiskEngine,
    retry_policy: RetryPolicy,
    /// 每键互斥，防止同键重入
    key_mutex: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ExecutionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn EngineRepository>,
        exchange: Arc<dyn ExchangeAdapter>,
        market_data: Arc<dyn MarketDataSource>,
        credentials: Arc<dyn CredentialProvider>,
        events: Arc<dyn EventSink>,
        retry_policy: RetryPolicy,
        allow_hedging: bool,
    ) -> Self {
        Self {
            positions: PositionService::new(repository.clone(), allow_hedging),
            audit: AuditRecorder::new(repository.clone()),
            risk_engine: RiskEngine::new(allow_hedging),
            repository,
            exchange,
            market_data,
            credentials,
            events,
            retry_policy,
            key_mutex: Arc::new(DashMap::new()),
        }
    }

    /// 获取键级互斥锁（台账写入复用同一临界区）
    pub fn acquire_key_mutex(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(mutex) = self.key_mutex.get(key) {
            return mutex.clone();
        }
        self.key_mutex
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 执行一条已入队的信号
    pub async fn execute(&self, signal: &SignalEntity) -> Result<ExecutionOutcome, AppError> {
        let key = signal.execution_key();
        let key_mutex = self.acquire_key_mutex(&key);
        let _guard = key_mutex.lock().await;

        // 键内重新读取信号，所有决策依据都取最新落库状态
        let mut signal = self
            .repository
            .get_signal(&signal.id)
            .await?
            .unwrap_or_else(|| signal.clone());

        // 幂等：已有非 failed 执行链路的信号拒绝重放
        if let Some(existing) = self
            .repository
            .find_execution_log_by_signal(&signal.id)
            .await?
        {
            if existing.status != ExecutionStatus::Failed {
                warn!(
                    "信号重复执行被拒绝: signal_id={}, 已有执行状态={}",
                    signal.id,
                    existing.status.as_str()
                );
                self.audit
                    .record::<(), _>(
                        Some(&signal.user_id),
                        "execution_duplicate_refused",
                        "signal",
                        &signal.id,
                        None,
                        Some(&existing),
                        false,
                        Some("duplicate execution refused"),
                    )
                    .await;
                return Ok(ExecutionOutcome::Duplicate);
            }
            // 已失败的链路同样不在协调器内自动重放，避免重复经济效果
            warn!("信号执行链路已失败，不再重放: signal_id={}", signal.id);
            return Ok(ExecutionOutcome::Duplicate);
        }

        let now = now_timestamp_mills();
        let mut exec_log =
            ExecutionLogEntity::new_queued(Uuid::new_v4().to_string(), signal.id.clone(), now);
        self.repository.insert_execution_log(&exec_log).await?;
        exec_log.mark_running();
        self.repository.update_execution_log(&exec_log).await?;

        // ---- 风控快照（与下单同一临界区）----
        let settings = match self.repository.get_risk_settings(&signal.user_id).await? {
            Some(s) => s,
            None => {
                return self
                    .finish_risk_rejected(
                        &mut signal,
                        &mut exec_log,
                        vec!["risk_settings_missing".to_string()],
                        None,
                    )
                    .await;
            }
        };
        let snapshot = self.load_snapshot(&signal).await?;

        let decision = self.risk_engine.evaluate(&signal, &settings, &snapshot);
        if !decision.pass {
            return self
                .finish_risk_rejected(
                    &mut signal,
                    &mut exec_log,
                    decision.reasons.clone(),
                    Some(&decision),
                )
                .await;
        }
        let sizing = match decision.sizing.clone() {
            Some(s) => s,
            None => {
                // pass 恒伴随 sizing，这里兜底按风控拒绝处理
                return self
                    .finish_risk_rejected(
                        &mut signal,
                        &mut exec_log,
                        vec!["sizing_unavailable".to_string()],
                        Some(&decision),
                    )
                    .await;
            }
        };
        exec_log.risk_check_passed = true;
        exec_log.risk_check_details = serde_json::to_string(&decision).ok();
        self.repository.update_execution_log(&exec_log).await?;

        // ---- 构造订单 ----
        let now = now_timestamp_mills();
        let mut trade = TradeEntity {
            id: Uuid::new_v4().to_string(),
            user_id: signal.user_id.clone(),
            position_id: None,
            exchange: signal.exchange.clone(),
            symbol: signal.symbol.clone(),
            side: signal.direction.trade_side(),
            order_type: OrderType::Market,
            quantity: sizing.quantity,
            price: None,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            fee: None,
            status: TradeStatus::Pending,
            exchange_order_id: None,
            signal_id: signal.id.clone(),
            realized_pnl: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_trade(&trade).await?;
        exec_log.trade_id = Some(trade.id.clone());
        self.repository.update_execution_log(&exec_log).await?;
        self.audit
            .record::<(), _>(
                Some(&signal.user_id),
                "trade_created",
                "trade",
                &trade.id,
                None,
                Some(&trade),
                true,
                None,
            )
            .await;

        let request = OrderRequest {
            user_id: signal.user_id.clone(),
            exchange: signal.exchange.clone(),
            symbol: signal.symbol.clone(),
            side: trade.side,
            order_type: trade.order_type,
            quantity: trade.quantity,
            price: Some(sizing.entry_price),
            // 信号 id 即幂等键
            client_order_id: signal.id.clone(),
        };

        let credentials = match self
            .credentials
            .decrypt_credentials(&signal.user_id, &signal.exchange)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                return self
                    .finish_failed(
                        &mut signal,
                        &mut exec_log,
                        &mut trade,
                        "credential_error",
                        &format!("凭证获取失败: {}", e),
                    )
                    .await;
            }
        };

        // ---- 有界重试提交 ----
        match self.submit_with_retry(&request, &credentials, &mut exec_log, &signal).await {
            Ok(ack) => {
                self.finish_executed(&mut signal, &mut exec_log, &mut trade, &sizing.entry_price, ack)
                    .await
            }
            Err((err, error_type)) => {
                self.finish_failed(
                    &mut signal,
                    &mut exec_log,
                    &mut trade,
                    error_type,
                    &err.to_string(),
                )
                .await
            }
        }
    }

    async fn load_snapshot(&self, signal: &SignalEntity) -> Result<AccountSnapshot, AppError> {
        let day_start = day_start_mills(now_timestamp_mills());
        let open_positions = self.repository.open_positions(&signal.user_id).await?;
        let daily_trade_count = self
            .repository
            .daily_trade_count(&signal.user_id, day_start)
            .await?;
        let daily_realized_pnl = self
            .repository
            .daily_realized_pnl(&signal.user_id, day_start)
            .await?;
        let portfolio_value_usd = self
            .repository
            .account_equity(&signal.user_id)
            .await?
            .unwrap_or(Decimal::ZERO);
        Ok(AccountSnapshot {
            open_positions,
            daily_trade_count,
            daily_realized_pnl,
            portfolio_value_usd,
        })
    }

    /// 带超时与退避的下单。每次尝试（成功或失败）各写一条审计。
    async fn submit_with_retry(
        &self,
        request: &OrderRequest,
        credentials: &crate::trading::exchange::ExchangeCredentials,
        exec_log: &mut ExecutionLogEntity,
        signal: &SignalEntity,
    ) -> Result<OrderAck, (ExchangeError, &'static str)> {
        let mut schedule: RetrySchedule = self.retry_policy.schedule();
        loop {
            let attempt = schedule.attempt();
            let result = timeout(
                self.retry_policy.attempt_timeout,
                self.exchange.place_order(credentials, request),
            )
            .await;

            let err = match result {
                Ok(Ok(ack)) => {
                    self.audit
                        .record::<(), _>(
                            Some(&signal.user_id),
                            "order_attempt_succeeded",
                            "trade",
                            &request.client_order_id,
                            None,
                            Some(&serde_json::json!({
                                "attempt": attempt,
                                "exchange_order_id": ack.exchange_order_id,
                            })),
                            true,
                            None,
                        )
                        .await;
                    return Ok(ack);
                }
                Ok(Err(e)) => e,
                // 超时按瞬时错误处理，进入重试
                Err(_) => ExchangeError::Transient(format!(
                    "下单超时（{}ms）",
                    self.retry_policy.attempt_timeout.as_millis()
                )),
            };

            self.audit
                .record::<(), _>(
                    Some(&signal.user_id),
                    "order_attempt_failed",
                    "trade",
                    &request.client_order_id,
                    None,
                    Some(&serde_json::json!({
                        "attempt": attempt,
                        "error_type": err.error_type(),
                    })),
                    false,
                    Some(&err.to_string()),
                )
                .await;

            match schedule.on_error(&err) {
                RetryDecision::Retry {
                    next_attempt,
                    delay,
                } => {
                    exec_log.retry_count = schedule.retry_count() as i32;
                    if let Err(e) = self.repository.update_execution_log(exec_log).await {
                        error!("更新执行日志失败: {}", e);
                    }
                    warn!(
                        "下单瞬时失败，{}ms 后第 {} 次尝试: signal_id={}, err={}",
                        delay.as_millis(),
                        next_attempt,
                        signal.id,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUpFatal => return Err((err, "fatal")),
                RetryDecision::GiveUpExhausted => return Err((err, "transient_exhausted")),
            }
        }
    }

    async fn finish_executed(
        &self,
        signal: &mut SignalEntity,
        exec_log: &mut ExecutionLogEntity,
        trade: &mut TradeEntity,
        entry_price: &Decimal,
        ack: OrderAck,
    ) -> Result<ExecutionOutcome, AppError> {
        let now = now_timestamp_mills();
        trade.exchange_order_id = Some(ack.exchange_order_id.clone());

        if ack.filled_quantity > Decimal::ZERO {
            let fill_price = ack.avg_fill_price.unwrap_or(*entry_price);
            trade.record_fill(ack.filled_quantity, fill_price, ack.fee, now)?;

            // 行情不可用时退化为成交价刷新未实现盈亏
            let mark_price = self
                .market_data
                .get_mark_price(&signal.symbol, &signal.exchange)
                .await
                .unwrap_or(fill_price);
            let fill = self
                .positions
                .apply_fill(signal, trade, ack.filled_quantity, fill_price, mark_price)
                .await?;
            trade.position_id = Some(fill.position.id.clone());
            if !fill.realized_pnl.is_zero() {
                trade.realized_pnl = Some(fill.realized_pnl);
            }

            self.audit
                .record::<(), _>(
                    Some(&signal.user_id),
                    if fill.opened {
                        "position_opened"
                    } else {
                        "position_updated"
                    },
                    "position",
                    &fill.position.id,
                    None,
                    Some(&fill.position),
                    true,
                    None,
                )
                .await;
            if !fill.position.is_open() {
                self.events
                    .emit(EngineEvent::new(
                        "position_closed",
                        &signal.user_id,
                        "position",
                        &fill.position.id,
                        &fill.position,
                    ))
                    .await;
            }
        } else if ack.status == TradeStatus::Canceled {
            trade.mark_canceled(now);
        }
        self.repository.update_trade(trade).await?;

        exec_log.trade_executed = true;
        exec_log.finish(ExecutionStatus::Completed, now);
        self.repository.update_execution_log(exec_log).await?;

        let old_status = signal.status.as_str();
        signal.transition_to(SignalStatus::Executed, None, now)?;
        self.repository.update_signal(signal).await?;
        self.audit
            .record_transition(
                &signal.user_id,
                "signal_executed",
                "signal",
                &signal.id,
                old_status,
                &*signal,
            )
            .await;

        self.events
            .emit(EngineEvent::new(
                "signal_executed",
                &signal.user_id,
                "signal",
                &signal.id,
                signal,
            ))
            .await;
        if trade.status.is_terminal() {
            let event_type = format!("trade_{}", trade.status.as_str());
            self.events
                .emit(EngineEvent::new(
                    &event_type,
                    &signal.user_id,
                    "trade",
                    &trade.id,
                    trade,
                ))
                .await;
        }

        info!(
            "信号执行完成: signal_id={}, trade_id={}, filled={}, retry_count={}",
            signal.id, trade.id, trade.filled_quantity, exec_log.retry_count
        );
        Ok(ExecutionOutcome::Executed(trade.clone()))
    }

    async fn finish_risk_rejected(
        &self,
        signal: &mut SignalEntity,
        exec_log: &mut ExecutionLogEntity,
        reasons: Vec<String>,
        decision: Option<&RiskDecision>,
    ) -> Result<ExecutionOutcome, AppError> {
        let now = now_timestamp_mills();
        let reason_text = reasons.join(",");

        exec_log.risk_check_passed = false;
        exec_log.risk_check_details = match decision {
            Some(d) => serde_json::to_string(d).ok(),
            None => Some(reason_text.clone()),
        };
        // 风控拒绝是预期结果，链路按完成记录，不算执行失败
        exec_log.finish(ExecutionStatus::Completed, now);
        self.repository.update_execution_log(exec_log).await?;

        let old_status = signal.status.as_str();
        signal.transition_to(SignalStatus::Skipped, Some(reason_text.clone()), now)?;
        self.repository.update_signal(signal).await?;
        self.audit
            .record_transition(
                &signal.user_id,
                "signal_risk_rejected",
                "signal",
                &signal.id,
                old_status,
                &*signal,
            )
            .await;
        self.events
            .emit(EngineEvent::new(
                "signal_skipped",
                &signal.user_id,
                "signal",
                &signal.id,
                signal,
            ))
            .await;

        info!(
            "风控拒绝: signal_id={}, reasons={}",
            signal.id, reason_text
        );
        Ok(ExecutionOutcome::RiskRejected(reasons))
    }

    async fn finish_failed(
        &self,
        signal: &mut SignalEntity,
        exec_log: &mut ExecutionLogEntity,
        trade: &mut TradeEntity,
        error_type: &str,
        message: &str,
    ) -> Result<ExecutionOutcome, AppError> {
        let now = now_timestamp_mills();

        if trade.status == TradeStatus::Pending {
            trade.mark_failed(now);
            self.repository.update_trade(trade).await?;
        }

        exec_log.error_type = Some(error_type.to_string());
        exec_log.error_message = Some(message.to_string());
        exec_log.finish(ExecutionStatus::Failed, now);
        self.repository.update_execution_log(exec_log).await?;

        let old_status = signal.status.as_str();
        signal.transition_to(SignalStatus::Failed, Some(message.to_string()), now)?;
        self.repository.update_signal(signal).await?;
        self.audit
            .record(
                Some(&signal.user_id),
                "signal_execution_failed",
                "signal",
                &signal.id,
                Some(&serde_json::json!({ "status": old_status })),
                Some(&*signal),
                false,
                Some(message),
            )
            .await;
        self.events
            .emit(EngineEvent::new(
                "signal_failed",
                &signal.user_id,
                "signal",
                &signal.id,
                signal,
            ))
            .await;
        self.events
            .emit(EngineEvent::new(
                "trade_failed",
                &signal.user_id,
                "trade",
                &trade.id,
                trade,
            ))
            .await;

        error!(
            "信号执行失败: signal_id={}, error_type={}, message={}",
            signal.id, error_type, message
        );
        Ok(ExecutionOutcome::Failed {
            error_type: error_type.to_string(),
            message: message.to_string(),
        })
    }
}
