//! Parameter sweep over SMA windows, ATR window and risk fraction.
//!
//! Every grid point is an independent single-phase run over the same bars,
//! so the grid is evaluated in parallel with rayon.

use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crossbot_core::domain::Bar;

use crate::config::BacktestConfig;
use crate::runner::{run_backtest, RunError};

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
    pub volatility_periods: Vec<usize>,
    pub risk_fractions: Vec<f64>,
}

impl Default for ParamGrid {
    /// Fast 10/20/30 against slow 50/100/200, ATR 14, risk 3%.
    fn default() -> Self {
        Self {
            fast_periods: vec![10, 20, 30],
            slow_periods: vec![50, 100, 200],
            volatility_periods: vec![14],
            risk_fractions: vec![0.03],
        }
    }
}

impl ParamGrid {
    /// Upper bound on the number of configurations (before skipping fast >= slow).
    pub fn size(&self) -> usize {
        self.fast_periods.len()
            * self.slow_periods.len()
            * self.volatility_periods.len()
            * self.risk_fractions.len()
    }

    /// All valid configurations, each derived from `base`.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();

        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                // Skip invalid combinations (fast >= slow)
                if fast >= slow {
                    continue;
                }
                for &volatility in &self.volatility_periods {
                    for &risk in &self.risk_fractions {
                        configs.push(BacktestConfig {
                            fast_period: fast,
                            slow_period: slow,
                            volatility_period: volatility,
                            risk_fraction: risk,
                            ..base.clone()
                        });
                    }
                }
            }
        }

        configs
    }
}

/// Headline numbers for one grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRow {
    pub config: BacktestConfig,
    pub fingerprint: String,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub final_equity: f64,
}

/// Run every configuration in `grid` over `bars`, best total return first.
///
/// Fails on the first configuration that errors; a set cancel flag surfaces
/// as `EngineError::Cancelled`.
pub fn run_sweep(
    bars: &[Bar],
    base: &BacktestConfig,
    grid: &ParamGrid,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<SweepRow>, RunError> {
    let configs = grid.generate_configs(base);
    tracing::info!(configs = configs.len(), bars = bars.len(), "starting sweep");

    let mut rows = configs
        .into_par_iter()
        .map(|config| -> Result<SweepRow, RunError> {
            let label = format!(
                "sma{}_{}_atr{}_r{}",
                config.fast_period,
                config.slow_period,
                config.volatility_period,
                config.risk_fraction
            );
            let result = run_backtest(&label, bars, &config, config.initial_balance, cancel)?;
            Ok(SweepRow {
                fingerprint: result.config_fingerprint,
                total_return_pct: result.report.total_return_pct,
                max_drawdown_pct: result.report.max_drawdown_pct,
                win_rate: result.report.win_rate,
                trade_count: result.report.trade_count,
                final_equity: result.report.final_equity,
                config,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    rows.sort_by(|a, b| b.total_return_pct.total_cmp(&a.total_return_pct));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic_bars;
    use chrono::{Duration, TimeZone, Utc};
    use crossbot_core::engine::EngineError;
    use std::sync::atomic::Ordering;

    fn bars() -> Vec<Bar> {
        generate_synthetic_bars(
            "sweep",
            1_000,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            Duration::minutes(1),
        )
        .bars
    }

    #[test]
    fn grid_skips_invalid_pairs() {
        let grid = ParamGrid {
            fast_periods: vec![10, 50],
            slow_periods: vec![20, 50],
            volatility_periods: vec![14],
            risk_fractions: vec![0.01, 0.03],
        };
        assert_eq!(grid.size(), 8);
        let configs = grid.generate_configs(&BacktestConfig::default());
        // (10,20), (10,50) valid; (50,20), (50,50) skipped
        assert_eq!(configs.len(), 4);
        assert!(configs.iter().all(|c| c.fast_period < c.slow_period));
        assert!(configs.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn sweep_sorted_by_return() {
        let grid = ParamGrid {
            fast_periods: vec![5, 10],
            slow_periods: vec![20, 40],
            volatility_periods: vec![7, 14],
            risk_fractions: vec![0.03],
        };
        let rows = run_sweep(&bars(), &BacktestConfig::default(), &grid, None).unwrap();
        assert_eq!(rows.len(), 8);
        assert!(rows
            .windows(2)
            .all(|w| w[0].total_return_pct >= w[1].total_return_pct));
    }

    #[test]
    fn sweep_matches_sequential_run() {
        let grid = ParamGrid {
            fast_periods: vec![5],
            slow_periods: vec![20],
            volatility_periods: vec![14],
            risk_fractions: vec![0.03],
        };
        let bars = bars();
        let rows = run_sweep(&bars, &BacktestConfig::default(), &grid, None).unwrap();
        let single = run_backtest("x", &bars, &rows[0].config, 10_000.0, None).unwrap();
        assert_eq!(rows[0].final_equity, single.report.final_equity);
        assert_eq!(rows[0].trade_count, single.report.trade_count);
    }

    #[test]
    fn cancelled_sweep_errors() {
        let flag = AtomicBool::new(false);
        flag.store(true, Ordering::Relaxed);
        let err = run_sweep(&bars(), &BacktestConfig::default(), &ParamGrid::default(), Some(&flag))
            .unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::Cancelled { .. })));
    }
}
