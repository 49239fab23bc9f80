extern crate rbatis;

use rbatis::{crud, impl_select};
use serde::{Deserialize, Serialize};

/// 执行日志状态：queued → running → {completed, failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// 执行日志：一条信号一条执行链路记录
///
/// 重试在同一条记录上累加 retry_count，不新增行；
/// 这是流水线视角的生命周期，与 Signal 状态分开维护。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntity {
    pub id: String,
    pub signal_id: String,
    pub trade_id: Option<String>,
    pub status: ExecutionStatus,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub duration_ms: Option<i64>,
    pub risk_check_passed: bool,
    pub risk_check_details: Option<String>,
    pub trade_executed: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
}

crud!(ExecutionLogEntity {}, "execution_logs");
impl_select!(ExecutionLogEntity{select_by_signal(signal_id:&str) =>
    "`where signal_id = #{signal_id} limit 1`"},"execution_logs");

impl ExecutionLogEntity {
    pub fn new_queued(id: String, signal_id: String, now_ms: i64) -> Self {
        Self {
            id,
            signal_id,
            trade_id: None,
            status: ExecutionStatus::Queued,
            started_at: now_ms,
            completed_at: None,
            duration_ms: None,
            risk_check_passed: false,
            risk_check_details: None,
            trade_executed: false,
            error_type: None,
            error_message: None,
            retry_count: 0,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = ExecutionStatus::Running;
    }

    pub fn finish(&mut self, status: ExecutionStatus, now_ms: i64) {
        self.status = status;
        self.completed_at = Some(now_ms);
        self.duration_ms = Some(now_ms - self.started_at);
    }
}
