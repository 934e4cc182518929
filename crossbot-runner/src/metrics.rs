//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! `PerformanceReport` bundles them for one run and renders the text report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crossbot_core::domain::{EquityPoint, TradeRecord};

/// Summary statistics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub initial_balance: f64,
    pub final_equity: f64,
    /// Percent, e.g. 12.5 for +12.5%.
    pub total_return_pct: f64,
    pub trade_count: usize,
    /// Percent of trades with PnL > 0.
    pub win_rate: f64,
    /// Mean PnL over winning trades.
    pub avg_win: f64,
    /// Mean PnL over trades with PnL <= 0.
    pub avg_loss: f64,
    pub profit_factor: f64,
    /// Deepest peak-to-trough fall of the equity curve, in percent (>= 0).
    pub max_drawdown_pct: f64,
    pub max_consecutive_losses: usize,
    /// First bar at which equity fell to zero or below.
    pub bust_time: Option<DateTime<Utc>>,
    /// Trade count per exit reason ("Stop Loss", "Death Cross", ...).
    pub exit_reasons: BTreeMap<String, usize>,
}

impl PerformanceReport {
    pub fn summarize(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        initial_balance: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let final_equity = equity.last().copied().unwrap_or(initial_balance);

        let mut exit_reasons = BTreeMap::new();
        for trade in trades {
            *exit_reasons
                .entry(trade.exit_reason.to_string())
                .or_insert(0) += 1;
        }

        Self {
            initial_balance,
            final_equity,
            total_return_pct: total_return_pct(final_equity, initial_balance),
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            profit_factor: profit_factor(trades),
            max_drawdown_pct: -max_drawdown(&equity) * 100.0,
            max_consecutive_losses: max_consecutive_losses(trades),
            bust_time: bust_time(equity_curve),
            exit_reasons,
        }
    }

    /// The classic text block printed after each phase.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trade_count == 0 {
            return writeln!(f, "No trades generated.");
        }

        let rule = "=".repeat(30);
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "PERFORMANCE REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Final Equity : ${:.2}", self.final_equity)?;
        writeln!(f, "Total Return : {:.2}%", self.total_return_pct)?;
        writeln!(f, "Total Trades : {}", self.trade_count)?;
        writeln!(f, "Win Rate     : {:.2}%", self.win_rate)?;
        writeln!(f, "Avg Win      : ${:.2}", self.avg_win)?;
        writeln!(f, "Avg Loss     : ${:.2}", self.avg_loss)?;
        writeln!(f, "Max Drawdown : {:.2}%", self.max_drawdown_pct)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        for (reason, count) in &self.exit_reasons {
            writeln!(f, "  {reason:<11}: {count}")?;
        }
        if let Some(ts) = self.bust_time {
            writeln!(f, "Busted at    : {}", ts.format("%Y-%m-%d %H:%M"))?;
        }
        writeln!(f, "{rule}")
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// (final - initial) / initial, in percent.
pub fn total_return_pct(final_equity: f64, initial_balance: f64) -> f64 {
    if initial_balance <= 0.0 {
        return 0.0;
    }
    (final_equity - initial_balance) / initial_balance * 100.0
}

/// Percent of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

pub fn avg_win(trades: &[TradeRecord]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl)
            .collect::<Vec<_>>(),
    )
}

pub fn avg_loss(trades: &[TradeRecord]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl)
            .collect::<Vec<_>>(),
    )
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Longest run of consecutive non-winning trades.
pub fn max_consecutive_losses(trades: &[TradeRecord]) -> usize {
    let mut best = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            best = best.max(current);
        }
    }
    best
}

/// Timestamp of the first equity point at or below zero.
pub fn bust_time(equity_curve: &[EquityPoint]) -> Option<DateTime<Utc>> {
    equity_curve
        .iter()
        .find(|p| p.equity <= 0.0)
        .map(|p| p.timestamp)
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
