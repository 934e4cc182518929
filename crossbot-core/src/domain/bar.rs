//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for the traded asset at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// A bar together with its derived indicator fields.
///
/// Produced only by [`crate::indicators::prepare`]; every field of a bar that
/// leaves the preparer is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBar {
    #[serde(flatten)]
    pub bar: Bar,
    /// Fast simple moving average of close.
    pub fast_avg: f64,
    /// Slow simple moving average of close.
    pub slow_avg: f64,
    /// Rolling mean of the true range.
    pub volatility_range: f64,
}

impl EnrichedBar {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.bar.timestamp
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    /// True when the close and every derived field are finite.
    pub fn is_complete(&self) -> bool {
        self.bar.close.is_finite()
            && self.fast_avg.is_finite()
            && self.slow_avg.is_finite()
            && self.volatility_range.is_finite()
    }

    /// Fast average strictly above slow average.
    pub fn fast_above_slow(&self) -> bool {
        self.fast_avg > self.slow_avg
    }

    /// Fast average strictly below slow average.
    pub fn fast_below_slow(&self) -> bool {
        self.fast_avg < self.slow_avg
    }
}
