use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::trading::model::audit::AuditEntity;
use crate::trading::model::execution_log::ExecutionLogEntity;
use crate::trading::model::position::PositionEntity;
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::risk_settings::RiskSettingsEntity;
use crate::trading::model::signal::SignalEntity;
use crate::trading::model::trade::TradeEntity;

/// 内存仓储：dry-run 模式与集成测试使用，行为与 MySQL 实现一致
#[derive(Default)]
pub struct MemEngineRepository {
    signals: DashMap<String, SignalEntity>,
    positions: DashMap<String, PositionEntity>,
    trades: DashMap<String, TradeEntity>,
    execution_logs: DashMap<String, ExecutionLogEntity>,
    risk_settings: DashMap<String, RiskSettingsEntity>,
    equity: DashMap<String, Decimal>,
    audits: RwLock<Vec<AuditEntity>>,
}

impl MemEngineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_risk_settings(&self, settings: RiskSettingsEntity) {
        self.risk_settings.insert(settings.user_id.clone(), settings);
    }

    pub fn set_account_equity(&self, user_id: &str, equity: Decimal) {
        self.equity.insert(user_id.to_string(), equity);
    }

    /// 测试辅助：审计流水快照
    pub fn audit_snapshot(&self) -> Vec<AuditEntity> {
        self.audits.read().expect("audit lock poisoned").clone()
    }

    /// 测试辅助：全部订单快照
    pub fn trade_snapshot(&self) -> Vec<TradeEntity> {
        self.trades.iter().map(|t| t.clone()).collect()
    }

    /// 测试辅助：全部持仓快照
    pub fn position_snapshot(&self) -> Vec<PositionEntity> {
        self.positions.iter().map(|p| p.clone()).collect()
    }
}

#[async_trait]
impl EngineRepository for MemEngineRepository {
    async fn insert_signal(&self, signal: &SignalEntity) -> Result<(), AppError> {
        self.signals.insert(signal.id.clone(), signal.clone());
        Ok(())
    }

    async fn update_signal(&self, signal: &SignalEntity) -> Result<(), AppError> {
        self.signals.insert(signal.id.clone(), signal.clone());
        Ok(())
    }

    async fn get_signal(&self, id: &str) -> Result<Option<SignalEntity>, AppError> {
        Ok(self.signals.get(id).map(|s| s.clone()))
    }

    async fn stale_pending_signals(&self, cutoff_ms: i64) -> Result<Vec<SignalEntity>, AppError> {
        Ok(self
            .signals
            .iter()
            .filter(|s| !s.status.is_terminal() && s.created_at < cutoff_ms)
            .map(|s| s.clone())
            .collect())
    }

    async fn get_risk_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<RiskSettingsEntity>, AppError> {
        Ok(self.risk_settings.get(user_id).map(|s| s.clone()))
    }

    async fn account_equity(&self, user_id: &str) -> Result<Option<Decimal>, AppError> {
        Ok(self.equity.get(user_id).map(|e| *e))
    }

    async fn open_positions(&self, user_id: &str) -> Result<Vec<PositionEntity>, AppError> {
        Ok(self
            .positions
            .iter()
            .filter(|p| p.user_id == user_id && p.is_open())
            .map(|p| p.clone())
            .collect())
    }

    async fn find_open_position(
        &self,
        user_id: &str,
        exchange: &str,
        symbol: &str,
        strategy_id: Option<&str>,
    ) -> Result<Option<PositionEntity>, AppError> {
        Ok(self
            .positions
            .iter()
            .find(|p| {
                p.is_open()
                    && p.user_id == user_id
                    && p.exchange == exchange
                    && p.symbol == symbol
                    && match strategy_id {
                        Some(sid) => p.strategy_id.as_deref() == Some(sid),
                        None => true,
                    }
            })
            .map(|p| p.clone()))
    }

    async fn insert_position(&self, position: &PositionEntity) -> Result<(), AppError> {
        self.positions.insert(position.id.clone(), position.clone());
        Ok(())
    }

    async fn update_position(&self, position: &PositionEntity) -> Result<(), AppError> {
        self.positions.insert(position.id.clone(), position.clone());
        Ok(())
    }

    async fn insert_trade(&self, trade: &TradeEntity) -> Result<(), AppError> {
        self.trades.insert(trade.id.clone(), trade.clone());
        Ok(())
    }

    async fn update_trade(&self, trade: &TradeEntity) -> Result<(), AppError> {
        self.trades.insert(trade.id.clone(), trade.clone());
        Ok(())
    }

    async fn trades_by_position(&self, position_id: &str) -> Result<Vec<TradeEntity>, AppError> {
        Ok(self
            .trades
            .iter()
            .filter(|t| t.position_id.as_deref() == Some(position_id))
            .map(|t| t.clone())
            .collect())
    }

    async fn daily_trade_count(&self, user_id: &str, day_start_ms: i64) -> Result<i64, AppError> {
        Ok(self
            .trades
            .iter()
            .filter(|t| t.user_id == user_id && t.created_at >= day_start_ms)
            .count() as i64)
    }

    async fn daily_realized_pnl(
        &self,
        user_id: &str,
        day_start_ms: i64,
    ) -> Result<Decimal, AppError> {
        Ok(self
            .trades
            .iter()
            .filter(|t| t.user_id == user_id && t.created_at >= day_start_ms)
            .filter_map(|t| t.realized_pnl)
            .sum())
    }

    async fn insert_execution_log(&self, entry: &ExecutionLogEntity) -> Result<(), AppError> {
        self.execution_logs
            .insert(entry.signal_id.clone(), entry.clone());
        Ok(())
    }

    async fn update_execution_log(&self, entry: &ExecutionLogEntity) -> Result<(), AppError> {
        self.execution_logs
            .insert(entry.signal_id.clone(), entry.clone());
        Ok(())
    }

    async fn find_execution_log_by_signal(
        &self,
        signal_id: &str,
    ) -> Result<Option<ExecutionLogEntity>, AppError> {
        Ok(self.execution_logs.get(signal_id).map(|e| e.clone()))
    }

    async fn insert_audit(&self, entry: &AuditEntity) -> Result<(), AppError> {
        self.audits
            .write()
            .expect("audit lock poisoned")
            .push(entry.clone());
        Ok(())
    }
}
