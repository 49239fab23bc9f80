pub mod audit;
pub mod execution_log;
pub mod position;
pub mod repository;
pub mod risk_settings;
pub mod signal;
pub mod trade;
