//! 审计记录器
//!
//! 纯副作用下沉：所有状态变更（无论成败）都落审计行。
//! 记录失败只上报运维日志，绝不让观察者中断被观察的流水线——
//! 已提交的订单不能因为审计写失败而回滚。

use std::sync::Arc;

use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::time_util::now_timestamp_mills;
use crate::trading::model::audit::AuditEntity;
use crate::trading::model::repository::EngineRepository;

pub struct AuditRecorder {
    repository: Arc<dyn EngineRepository>,
}

impl AuditRecorder {
    pub fn new(repository: Arc<dyn EngineRepository>) -> Self {
        Self { repository }
    }

    /// 记录一次资源变更。old/new 序列化失败或落库失败均不向上传播。
    pub async fn record<O: Serialize, N: Serialize>(
        &self,
        user_id: Option<&str>,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        old_value: Option<&O>,
        new_value: Option<&N>,
        success: bool,
        error_message: Option<&str>,
    ) {
        let entry = AuditEntity {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.map(|s| s.to_string()),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            old_value: old_value.and_then(|v| serde_json::to_string(v).ok()),
            new_value: new_value.and_then(|v| serde_json::to_string(v).ok()),
            success,
            error_message: error_message.map(|s| s.to_string()),
            created_at: now_timestamp_mills(),
        };
        if let Err(e) = self.repository.insert_audit(&entry).await {
            // 运维告警通道：审计丢行必须可见，但不中断流水线
            error!(
                "审计写入失败: action={}, resource={}/{}, err={}",
                action, resource_type, resource_id, e
            );
        }
    }

    /// 常用简写：成功的状态迁移
    pub async fn record_transition<N: Serialize>(
        &self,
        user_id: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        old_status: &str,
        new_value: &N,
    ) {
        self.record(
            Some(user_id),
            action,
            resource_type,
            resource_id,
            Some(&serde_json::json!({ "status": old_status })),
            Some(new_value),
            true,
            None,
        )
        .await;
    }
}
