//! Crossbot Core: domain types, indicators, strategy and the backtest loop.
//!
//! This crate contains everything needed to replay one price series:
//! - Domain types (bars, account, positions, trades, equity points)
//! - Rolling indicators (SMA, ATR) and the bar preparation step
//! - The `Strategy` trait and the SMA-crossover / ATR-risk strategy
//! - A long-only, single-instrument bar loop with fee accounting
//!
//! Data loading, configuration, reporting and phase orchestration live in
//! `crossbot-runner`.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

pub use domain::{Bar, EnrichedBar};
pub use engine::{BacktestEngine, EngineConfig, EngineError, RunResult};
pub use indicators::{prepare, IndicatorParams, PrepareError};
pub use strategy::{Signal, SignalAction, SmaAtrStrategy, Strategy};
