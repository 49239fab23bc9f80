pub mod audit_service;

pub use audit_service::AuditRecorder;
