pub mod signal_service;

pub use signal_service::{IngestAck, IngestRequest, SignalService};
