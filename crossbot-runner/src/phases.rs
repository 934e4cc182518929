//! Two-phase orchestration: a test pass, a bust guard, then a validation
//! pass funded with whatever cash the test pass ended with.

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use crossbot_core::domain::Bar;

use crate::config::BacktestConfig;
use crate::data_loader::split;
use crate::runner::{run_backtest, BacktestResult, RunError};

pub const TEST_PHASE: &str = "test";
pub const VALIDATION_PHASE: &str = "validation";

/// Results of both phases. `validation` is `None` when the test phase busted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub test: BacktestResult,
    pub validation: Option<BacktestResult>,
    pub busted: bool,
}

impl PhaseOutcome {
    pub fn phases(&self) -> impl Iterator<Item = &BacktestResult> {
        std::iter::once(&self.test).chain(self.validation.as_ref())
    }
}

/// Split `bars` by the configured ratio and run test, then validation.
///
/// Validation is skipped when the test phase leaves cash at or below the
/// bust threshold. A position still open at the end of the test phase is not
/// carried over; enable `liquidate_at_end` to realize it first.
pub fn run_phases(
    bars: &[Bar],
    config: &BacktestConfig,
    cancel: Option<&AtomicBool>,
) -> Result<PhaseOutcome, RunError> {
    config.validate()?;
    let (test_bars, validation_bars) = split(bars, config.split_ratio);
    tracing::info!(
        test_bars = test_bars.len(),
        validation_bars = validation_bars.len(),
        fingerprint = %config.fingerprint(),
        "starting phases"
    );

    let test = run_backtest(TEST_PHASE, test_bars, config, config.initial_balance, cancel)?;
    if let Some(pos) = &test.run.open_position {
        tracing::warn!(
            size = pos.size,
            entry_price = pos.entry_price,
            "test phase ended with an open position; it is not carried into validation"
        );
    }

    if test.run.is_busted(config.bust_threshold) {
        tracing::warn!(
            final_cash = test.final_cash(),
            threshold = config.bust_threshold,
            "account busted in the test phase; skipping validation"
        );
        return Ok(PhaseOutcome {
            test,
            validation: None,
            busted: true,
        });
    }

    let seed = test.final_cash();
    tracing::info!(initial_balance = seed, "seeding validation phase");
    let validation = run_backtest(VALIDATION_PHASE, validation_bars, config, seed, cancel)?;

    Ok(PhaseOutcome {
        test,
        validation: Some(validation),
        busted: false,
    })
}
