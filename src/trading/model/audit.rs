extern crate rbatis;

use rbatis::{crud, impl_select};
use serde::{Deserialize, Serialize};

/// 审计流水：所有对 Signal/Position/Trade/RiskSettings 的变更都落一行，只追加
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntity {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: i64,
}

crud!(AuditEntity {}, "audit_logs");
impl_select!(AuditEntity{select_by_resource(resource_type:&str,resource_id:&str) =>
    "`where resource_type = #{resource_type} and resource_id = #{resource_id} order by created_at`"},"audit_logs");
