//! Engine configuration and run result types.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use crate::domain::{EquityPoint, Position, TradeEvent, TradeRecord};

/// Configuration for a single backtest run. Immutable for the run's duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_balance: f64,
    /// Fee charged on the notional of every buy and sell, as a fraction.
    pub fee_rate: f64,
    /// When set, entry sizes are floored to a multiple of this quantity.
    pub lot_size: Option<f64>,
    /// Close any open position at the last bar's close.
    #[serde(default)]
    pub liquidate_at_end: bool,
}

impl EngineConfig {
    pub fn new(initial_balance: f64, fee_rate: f64) -> Self {
        Self {
            initial_balance,
            fee_rate,
            lot_size: None,
            liquidate_at_end: false,
        }
    }

    pub fn with_lot_size(mut self, lot_size: f64) -> Self {
        self.lot_size = Some(lot_size);
        self
    }

    pub fn with_liquidation_at_end(mut self) -> Self {
        self.liquidate_at_end = true;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "initial_balance must be > 0, got {}",
                self.initial_balance
            )));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fee_rate must be >= 0, got {}",
                self.fee_rate
            )));
        }
        if let Some(lot) = self.lot_size {
            if !(lot.is_finite() && lot > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "lot_size must be > 0, got {lot}"
                )));
            }
        }
        Ok(())
    }

    /// Floor `size` to the configured lot size (identity without one).
    pub fn round_size(&self, size: f64) -> f64 {
        match self.lot_size {
            Some(lot) => (size / lot).floor() * lot,
            None => size,
        }
    }
}

/// Per-run counters of strategy output and engine decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub enter: usize,
    pub exit: usize,
    /// Exits forced by stop-loss or take-profit.
    pub hard_exits: usize,
    /// Enter signals the engine did not execute (unaffordable or below one lot).
    pub rejected_entries: usize,
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// One point per processed bar.
    pub equity_curve: Vec<EquityPoint>,
    /// Completed round-trip trades.
    pub trades: Vec<TradeRecord>,
    /// Every executed buy and sell, in order.
    pub events: Vec<TradeEvent>,
    pub initial_balance: f64,
    pub final_cash: f64,
    /// Equity at the last bar (initial balance for an empty run).
    pub final_equity: f64,
    /// Position still open after the last bar.
    pub open_position: Option<Position>,
    pub bars_processed: usize,
    pub signals: SignalCounts,
}

impl RunResult {
    /// Cash at or below `threshold`: the account is ruined and later phases
    /// should not run.
    pub fn is_busted(&self, threshold: f64) -> bool {
        self.final_cash <= threshold
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}
