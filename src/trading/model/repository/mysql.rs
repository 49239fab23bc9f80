use async_trait::async_trait;
use rbatis::RBatis;
use rbs::to_value;
use rust_decimal::Decimal;

use crate::app_config::db;
use crate::error::AppError;
use crate::trading::model::audit::AuditEntity;
use crate::trading::model::execution_log::ExecutionLogEntity;
use crate::trading::model::position::PositionEntity;
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::risk_settings::RiskSettingsEntity;
use crate::trading::model::signal::SignalEntity;
use crate::trading::model::trade::TradeEntity;

/// MySQL 仓储实现，复用全局 rbatis 连接池
pub struct MysqlEngineRepository {
    db: &'static RBatis,
}

impl MysqlEngineRepository {
    pub fn new() -> Self {
        Self {
            db: db::get_db_client(),
        }
    }
}

impl Default for MysqlEngineRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineRepository for MysqlEngineRepository {
    async fn insert_signal(&self, signal: &SignalEntity) -> Result<(), AppError> {
        SignalEntity::insert(self.db, signal).await?;
        Ok(())
    }

    async fn update_signal(&self, signal: &SignalEntity) -> Result<(), AppError> {
        SignalEntity::update_by_column(self.db, signal, "id").await?;
        Ok(())
    }

    async fn get_signal(&self, id: &str) -> Result<Option<SignalEntity>, AppError> {
        let rows = SignalEntity::select_by_id(self.db, id).await?;
        Ok(rows.into_iter().next())
    }

    async fn stale_pending_signals(&self, cutoff_ms: i64) -> Result<Vec<SignalEntity>, AppError> {
        let rows = SignalEntity::select_stale_pending(self.db, cutoff_ms).await?;
        Ok(rows)
    }

    async fn get_risk_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<RiskSettingsEntity>, AppError> {
        let rows = RiskSettingsEntity::select_by_user(self.db, user_id).await?;
        Ok(rows.into_iter().next())
    }

    async fn account_equity(&self, user_id: &str) -> Result<Option<Decimal>, AppError> {
        let equity: Option<Decimal> = self
            .db
            .query_decode(
                "select equity_usd from account_equity where user_id = ? limit 1",
                vec![to_value!(user_id)],
            )
            .await?;
        Ok(equity)
    }

    async fn open_positions(&self, user_id: &str) -> Result<Vec<PositionEntity>, AppError> {
        let rows = PositionEntity::select_open_by_user(self.db, user_id).await?;
        Ok(rows)
    }

    async fn find_open_position(
        &self,
        user_id: &str,
        exchange: &str,
        symbol: &str,
        strategy_id: Option<&str>,
    ) -> Result<Option<PositionEntity>, AppError> {
        let rows = PositionEntity::select_open_by_key(self.db, user_id, exchange, symbol).await?;
        let found = rows.into_iter().find(|p| match strategy_id {
            Some(sid) => p.strategy_id.as_deref() == Some(sid),
            None => true,
        });
        Ok(found)
    }

    async fn insert_position(&self, position: &PositionEntity) -> Result<(), AppError> {
        PositionEntity::insert(self.db, position).await?;
        Ok(())
    }

    async fn update_position(&self, position: &PositionEntity) -> Result<(), AppError> {
        PositionEntity::update_by_column(self.db, position, "id").await?;
        Ok(())
    }

    async fn insert_trade(&self, trade: &TradeEntity) -> Result<(), AppError> {
        TradeEntity::insert(self.db, trade).await?;
        Ok(())
    }

    async fn update_trade(&self, trade: &TradeEntity) -> Result<(), AppError> {
        TradeEntity::update_by_column(self.db, trade, "id").await?;
        Ok(())
    }

    async fn trades_by_position(&self, position_id: &str) -> Result<Vec<TradeEntity>, AppError> {
        let rows = TradeEntity::select_by_position(self.db, position_id).await?;
        Ok(rows)
    }

    async fn daily_trade_count(&self, user_id: &str, day_start_ms: i64) -> Result<i64, AppError> {
        let count: i64 = self
            .db
            .query_decode(
                "select count(*) from trades where user_id = ? and created_at >= ?",
                vec![to_value!(user_id), to_value!(day_start_ms)],
            )
            .await?;
        Ok(count)
    }

    async fn daily_realized_pnl(
        &self,
        user_id: &str,
        day_start_ms: i64,
    ) -> Result<Decimal, AppError> {
        let pnl: Option<Decimal> = self
            .db
            .query_decode(
                "select sum(realized_pnl) from trades \
                 where user_id = ? and created_at >= ? and realized_pnl is not null",
                vec![to_value!(user_id), to_value!(day_start_ms)],
            )
            .await?;
        Ok(pnl.unwrap_or(Decimal::ZERO))
    }

    async fn insert_execution_log(&self, entry: &ExecutionLogEntity) -> Result<(), AppError> {
        ExecutionLogEntity::insert(self.db, entry).await?;
        Ok(())
    }

    async fn update_execution_log(&self, entry: &ExecutionLogEntity) -> Result<(), AppError> {
        ExecutionLogEntity::update_by_column(self.db, entry, "id").await?;
        Ok(())
    }

    async fn find_execution_log_by_signal(
        &self,
        signal_id: &str,
    ) -> Result<Option<ExecutionLogEntity>, AppError> {
        let rows = ExecutionLogEntity::select_by_signal(self.db, signal_id).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_audit(&self, entry: &AuditEntity) -> Result<(), AppError> {
        AuditEntity::insert(self.db, entry).await?;
        Ok(())
    }
}
