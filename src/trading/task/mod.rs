pub mod signal_runner;

pub use signal_runner::{SignalEngine, SignalRunner};
