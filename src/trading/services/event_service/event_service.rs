//! 终态事件下发
//!
//! 信号/订单/持仓进入终态时各发一条事件，发后即忘；
//! 通知投递（邮件/推送）由外部系统订阅完成，引擎不关心结果。

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::time_util::now_timestamp_mills;

#[derive(Debug, Clone, Serialize)]
pub struct EngineEvent {
    pub event_type: String,
    pub user_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub payload: serde_json::Value,
    pub ts: i64,
}

impl EngineEvent {
    pub fn new<P: Serialize>(
        event_type: &str,
        user_id: &str,
        resource_type: &str,
        resource_id: &str,
        payload: &P,
    ) -> Self {
        Self {
            event_type: event_type.to_string(),
            user_id: user_id.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            ts: now_timestamp_mills(),
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// 发出一条事件，实现方不得阻塞流水线
    async fn emit(&self, event: EngineEvent);
}

/// 默认实现：结构化日志当事件总线，外部采集器消费
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: EngineEvent) {
        info!(
            target: "engine_events",
            "event={} user={} resource={}/{} payload={}",
            event.event_type,
            event.user_id,
            event.resource_type,
            event.resource_id,
            event.payload
        );
    }
}
