pub mod risk_service;

pub use risk_service::{AccountSnapshot, OrderSizing, RiskDecision, RiskEngine};
