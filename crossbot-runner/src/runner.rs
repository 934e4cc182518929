//! Backtest runner: wires together preparation, engine, and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: one pass over pre-loaded bars. Used by phases and sweeps.
//! - `run_single_backtest()`: loads the CSV named by the caller, then runs the
//!   test/validation phases. Used by the CLI.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crossbot_core::domain::Bar;
use crossbot_core::engine::{BacktestEngine, EngineError, RunResult};
use crossbot_core::indicators::{prepare, PrepareError};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_csv, LoadError};
use crate::metrics::PerformanceReport;
use crate::phases::{run_phases, PhaseOutcome};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("indicator error: {0}")]
    Prepare(#[from] PrepareError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// "test", "validation" or a sweep label.
    pub label: String,
    pub config_fingerprint: String,
    /// Raw bars handed in, before the warmup was dropped.
    pub input_bars: usize,
    pub warmup_bars: usize,
    pub report: PerformanceReport,
    pub run: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn final_cash(&self) -> f64 {
        self.run.final_cash
    }
}

/// Run one backtest with pre-loaded data, no I/O.
///
/// `initial_balance` overrides the configured balance so a later phase can be
/// seeded from an earlier one.
pub fn run_backtest(
    label: &str,
    bars: &[Bar],
    config: &BacktestConfig,
    initial_balance: f64,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let params = config.indicator_params();
    let prepared = prepare(bars, &params)?;
    if prepared.is_empty() {
        tracing::warn!(
            label,
            bars = bars.len(),
            warmup = params.warmup(),
            "not enough bars to cover the indicator warmup"
        );
    }

    let strategy = config.strategy();
    let mut engine = BacktestEngine::new(config.engine_config(initial_balance))?;
    let run = engine.run_with_cancel(&prepared, &strategy, cancel)?;
    let report = PerformanceReport::summarize(&run.equity_curve, &run.trades, initial_balance);

    if run.signals.rejected_entries > 0 {
        tracing::warn!(
            label,
            rejected = run.signals.rejected_entries,
            "entry signals rejected by the engine"
        );
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        label: label.to_string(),
        config_fingerprint: config.fingerprint(),
        input_bars: bars.len(),
        warmup_bars: params.warmup().min(bars.len()),
        report,
        run,
    })
}

/// Load bars from `data_path` and run both phases.
pub fn run_single_backtest(
    config: &BacktestConfig,
    data_path: impl AsRef<Path>,
    cancel: Option<&AtomicBool>,
) -> Result<PhaseOutcome, RunError> {
    let loaded = load_csv(data_path)?;
    run_phases(&loaded.bars, config, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic_bars;
    use chrono::{Duration, TimeZone, Utc};

    fn synthetic(n: usize) -> Vec<Bar> {
        generate_synthetic_bars(
            "runner",
            n,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            Duration::minutes(1),
        )
        .bars
    }

    #[test]
    fn run_backtest_end_to_end() {
        let bars = synthetic(2_000);
        let config = BacktestConfig::default();
        let result = run_backtest("test", &bars, &config, 10_000.0, None).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.input_bars, 2_000);
        assert_eq!(result.warmup_bars, 49);
        assert_eq!(result.run.equity_curve.len(), 2_000 - 49);
        assert_eq!(result.report.trade_count, result.run.trades.len());
        assert_eq!(result.config_fingerprint, config.fingerprint());
    }

    #[test]
    fn run_is_deterministic() {
        let bars = synthetic(1_000);
        let config = BacktestConfig::default();
        let a = run_backtest("a", &bars, &config, 10_000.0, None).unwrap();
        let b = run_backtest("b", &bars, &config, 10_000.0, None).unwrap();
        assert_eq!(a.run.equity_curve, b.run.equity_curve);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn short_series_yields_empty_run() {
        let bars = synthetic(10);
        let result = run_backtest("short", &bars, &BacktestConfig::default(), 500.0, None).unwrap();
        assert!(result.run.equity_curve.is_empty());
        assert_eq!(result.report.final_equity, 500.0);
        assert_eq!(result.warmup_bars, 10);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BacktestConfig {
            fast_period: 60,
            ..BacktestConfig::default()
        };
        let err = run_backtest("bad", &synthetic(100), &config, 1_000.0, None).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn missing_data_file() {
        let err = run_single_backtest(&BacktestConfig::default(), "/nonexistent.csv", None)
            .unwrap_err();
        assert!(matches!(err, RunError::Data(LoadError::Io { .. })));
    }
}
