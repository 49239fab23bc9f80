pub mod execution_service;
pub mod retry_policy;

pub use execution_service::{ExecutionCoordinator, ExecutionOutcome};
pub use retry_policy::{RetryDecision, RetryPolicy, RetrySchedule};
