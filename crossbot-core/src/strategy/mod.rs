//! Strategies: turn the current/previous bar and account cash into an action.
//!
//! A strategy is a pure function of its inputs: it never sees or mutates the
//! engine's account. The engine decides whether a proposed entry is actually
//! executed (affordability, lot rounding) and always checks stop-loss and
//! take-profit levels before asking the strategy about an exit.

pub mod sizing;
pub mod sma_atr;

pub use sizing::{AtrRiskSizer, RiskSizing};
pub use sma_atr::SmaAtrStrategy;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::domain::EnrichedBar;

/// What the strategy wants to do on this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Enter,
    Exit,
    Hold,
}

/// A strategy decision for one bar. Produced fresh each step; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub action: SignalAction,
    /// Proposed position size in units (entries only).
    pub size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: Cow<'static, str>,
}

impl Signal {
    pub fn hold() -> Self {
        Self {
            action: SignalAction::Hold,
            size: 0.0,
            stop_loss: 0.0,
            take_profit: 0.0,
            reason: Cow::Borrowed(""),
        }
    }

    pub fn exit(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            action: SignalAction::Exit,
            reason: reason.into(),
            ..Self::hold()
        }
    }

    pub fn enter(
        size: f64,
        stop_loss: f64,
        take_profit: f64,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            action: SignalAction::Enter,
            size,
            stop_loss,
            take_profit,
            reason: reason.into(),
        }
    }

    pub fn is_enter(&self) -> bool {
        self.action == SignalAction::Enter
    }

    pub fn is_exit(&self) -> bool {
        self.action == SignalAction::Exit
    }
}

/// Trait for trading strategies.
///
/// Called at most once per bar per engine, only from bar 1 onward (bar 0 has no
/// predecessor). `cash_balance` is the account cash at signal time, before any
/// fee for a new entry.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "sma_atr").
    fn name(&self) -> &str;

    fn signal(
        &self,
        current: &EnrichedBar,
        previous: &EnrichedBar,
        cash_balance: f64,
        fee_rate: f64,
    ) -> Signal;
}

/// Fast average crossed above slow average between `previous` and `current`.
pub fn is_golden_cross(previous: &EnrichedBar, current: &EnrichedBar) -> bool {
    previous.fast_below_slow() && current.fast_above_slow()
}

/// Fast average crossed below slow average between `previous` and `current`.
pub fn is_death_cross(previous: &EnrichedBar, current: &EnrichedBar) -> bool {
    previous.fast_above_slow() && current.fast_below_slow()
}
