// 滞留信号回收任务

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::time_util::now_timestamp_mills;
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::signal::SignalStatus;
use crate::trading::services::audit_service::AuditRecorder;
use crate::trading::services::event_service::{EngineEvent, EventSink};

/// 兜底任务：任何信号都不允许无限期停留在非终态。
/// 超龄的 received/validated/queued 信号统一失败收尾并审计。
pub struct StaleSignalJob {
    repository: Arc<dyn EngineRepository>,
    events: Arc<dyn EventSink>,
    audit: AuditRecorder,
    max_age_ms: i64,
}

impl StaleSignalJob {
    pub fn new(
        repository: Arc<dyn EngineRepository>,
        events: Arc<dyn EventSink>,
        max_age_ms: i64,
    ) -> Self {
        Self {
            audit: AuditRecorder::new(repository.clone()),
            repository,
            events,
            max_age_ms,
        }
    }

    pub async fn run(&self) -> Result<usize> {
        let now = now_timestamp_mills();
        let cutoff = now - self.max_age_ms;
        let stale = self.repository.stale_pending_signals(cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let mut reaped = 0usize;
        for mut signal in stale {
            let old_status = signal.status.as_str();
            if signal
                .transition_to(
                    SignalStatus::Failed,
                    Some("stale_signal".to_string()),
                    now,
                )
                .is_err()
            {
                continue;
            }
            if let Err(e) = self.repository.update_signal(&signal).await {
                warn!("滞留信号标记失败: signal_id={}, err={}", signal.id, e);
                continue;
            }
            self.audit
                .record(
                    Some(&signal.user_id),
                    "signal_reaped",
                    "signal",
                    &signal.id,
                    Some(&serde_json::json!({ "status": old_status })),
                    Some(&signal),
                    false,
                    Some("stale_signal"),
                )
                .await;
            self.events
                .emit(EngineEvent::new(
                    "signal_failed",
                    &signal.user_id,
                    "signal",
                    &signal.id,
                    &signal,
                ))
                .await;
            reaped += 1;
        }
        info!("滞留信号回收完成: {} 条", reaped);
        Ok(reaped)
    }
}
