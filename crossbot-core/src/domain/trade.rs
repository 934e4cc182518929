//! Trade log types: completed round trips, buy/sell markers, equity points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Exit requested by the strategy, carrying its reason (e.g. "Death Cross").
    Signal(String),
    /// Position closed at the last bar of the run.
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => f.write_str("Stop Loss"),
            ExitReason::TakeProfit => f.write_str("Take Profit"),
            ExitReason::Signal(reason) => f.write_str(reason),
            ExitReason::EndOfData => f.write_str("End Of Data"),
        }
    }
}

/// A completed round-trip trade: entry → exit. Created at exit time only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    /// Realized PnL net of entry and exit fees.
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    /// Return on the trade as a fraction of the entry notional.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.size == 0.0 {
            return 0.0;
        }
        self.pnl / (self.entry_price * self.size)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Side of a trade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("BUY"),
            TradeSide::Sell => f.write_str("SELL"),
        }
    }
}

/// A single executed buy or sell, kept for chart annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub side: TradeSide,
    pub reason: String,
}

/// Account equity at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade(pnl: f64) -> TradeRecord {
        TradeRecord {
            entry_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            exit_time: Utc.timestamp_opt(1_700_000_600, 0).unwrap(),
            entry_price: 100.0,
            exit_price: 110.0,
            size: 2.0,
            pnl,
            exit_reason: ExitReason::TakeProfit,
        }
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::StopLoss.to_string(), "Stop Loss");
        assert_eq!(ExitReason::TakeProfit.to_string(), "Take Profit");
        assert_eq!(
            ExitReason::Signal("Death Cross".into()).to_string(),
            "Death Cross"
        );
    }

    #[test]
    fn trade_return_pct() {
        let trade = sample_trade(20.0);
        assert!((trade.return_pct() - 0.1).abs() < 1e-12);
        assert!(trade.is_winner());
        assert!(!sample_trade(0.0).is_winner());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade(-3.5);
        let json = serde_json::to_string(&trade).unwrap();
        let deser: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
