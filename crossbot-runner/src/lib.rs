//! Crossbot Runner: configuration, data loading, phases, sweeps, metrics.
//!
//! This crate builds on `crossbot-core` to provide:
//! - TOML configuration with validation and fingerprinting
//! - CSV loading and cleaning, train/validation splitting, synthetic bars
//! - Single-run and two-phase (test, bust guard, validation) orchestration
//! - Parallel parameter sweeps
//! - Performance reports and artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod phases;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{generate_synthetic_bars, load_csv, split, LoadError, LoadedData};
pub use metrics::PerformanceReport;
pub use phases::{run_phases, PhaseOutcome};
pub use runner::{run_backtest, run_single_backtest, BacktestResult, RunError};
pub use sweep::{run_sweep, ParamGrid, SweepRow};
