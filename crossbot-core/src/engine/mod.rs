//! Backtesting engine: a single-instrument, long-only bar loop.
//!
//! The engine consumes prepared bars (see [`crate::indicators::prepare`]) and
//! a [`crate::strategy::Strategy`], and produces a [`RunResult`] holding the
//! equity curve, the trade log and the buy/sell events.

pub mod error;
pub mod loop_runner;
pub mod state;

pub use error::EngineError;
pub use loop_runner::BacktestEngine;
pub use state::{EngineConfig, RunResult, SignalCounts};
