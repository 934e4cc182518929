//! ATR risk sizing.
//!
//! Position size based on volatility and a fixed fraction of cash at risk,
//! capped by what the cash can pay for including the entry fee.

use serde::{Deserialize, Serialize};

/// Relative shave applied to the affordability cap when floating-point
/// rounding would make `size * price * (1 + fee)` exceed the cash.
const AFFORDABILITY_TRIM: f64 = 1e-12;

/// Breakdown of one sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSizing {
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Size that loses exactly `risk_fraction` of cash at the stop.
    pub theoretical: f64,
    /// Largest size whose cost plus entry fee fits in cash.
    pub affordable: f64,
    /// min(theoretical, affordable).
    pub size: f64,
}

/// ATR-based risk sizer.
///
/// # Formula
/// ```text
/// stop_loss   = close - stop_multiplier * atr
/// take_profit = close + target_multiplier * atr
/// theoretical = cash * risk_fraction / (close - stop_loss)
/// affordable  = cash / (close * (1 + fee_rate))
/// size        = min(theoretical, affordable)
/// ```
///
/// # Example
/// - Cash: $10,000, risk 3% ($300)
/// - ATR: $50, stop at 2x ATR = $100 below close
/// - Theoretical: $300 / $100 = 3 units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrRiskSizer {
    /// Fraction of cash risked per trade (e.g., 0.03 = 3%).
    pub risk_fraction: f64,
    /// ATR multiple below close for the stop-loss.
    pub stop_multiplier: f64,
    /// ATR multiple above close for the take-profit.
    pub target_multiplier: f64,
}

impl AtrRiskSizer {
    pub fn new(risk_fraction: f64, stop_multiplier: f64, target_multiplier: f64) -> Self {
        assert!(
            risk_fraction > 0.0 && risk_fraction <= 1.0,
            "risk_fraction must be in (0, 1]"
        );
        assert!(stop_multiplier >= 0.0, "stop_multiplier must be >= 0");
        assert!(target_multiplier >= 0.0, "target_multiplier must be >= 0");
        Self {
            risk_fraction,
            stop_multiplier,
            target_multiplier,
        }
    }

    pub fn size(&self, cash: f64, close: f64, atr: f64, fee_rate: f64) -> RiskSizing {
        let stop_loss = close - self.stop_multiplier * atr;
        let take_profit = close + self.target_multiplier * atr;

        if cash <= 0.0 || close <= 0.0 {
            return RiskSizing {
                stop_loss,
                take_profit,
                theoretical: 0.0,
                affordable: 0.0,
                size: 0.0,
            };
        }

        let risk_amount = cash * self.risk_fraction;
        let stop_distance = close - stop_loss;
        let theoretical = if stop_distance > 0.0 {
            risk_amount / stop_distance
        } else {
            0.0
        };

        let mut affordable = cash / (close * (1.0 + fee_rate));
        if entry_outlay(affordable, close, fee_rate) > cash {
            affordable *= 1.0 - AFFORDABILITY_TRIM;
        }

        RiskSizing {
            stop_loss,
            take_profit,
            theoretical,
            affordable,
            size: theoretical.min(affordable),
        }
    }
}

/// Cost plus entry fee for buying `size` units at `price`, computed the way the
/// engine debits it.
pub fn entry_outlay(size: f64, price: f64, fee_rate: f64) -> f64 {
    let cost = size * price;
    cost + cost * fee_rate
}
