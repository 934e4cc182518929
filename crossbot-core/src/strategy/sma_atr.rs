//! SMA crossover with ATR risk sizing.
//!
//! Enters long on a golden cross (fast SMA crosses above slow SMA) with a stop
//! two ATRs below and a target three ATRs above the close. Exits on a death
//! cross (fast crosses below slow).

use super::sizing::AtrRiskSizer;
use super::{is_death_cross, is_golden_cross, Signal, Strategy};
use crate::domain::EnrichedBar;

pub const GOLDEN_CROSS: &str = "Golden Cross";
pub const DEATH_CROSS: &str = "Death Cross";

/// Moving-average crossover strategy with volatility-scaled risk levels.
///
/// # Indicator dependencies
/// Reads `fast_avg`, `slow_avg` and `volatility_range` from the enriched bars;
/// window lengths are chosen at preparation time.
#[derive(Debug, Clone)]
pub struct SmaAtrStrategy {
    sizer: AtrRiskSizer,
}

impl SmaAtrStrategy {
    /// Standard levels: stop at 2 ATR, target at 3 ATR.
    pub fn new(risk_fraction: f64) -> Self {
        Self::with_multipliers(risk_fraction, 2.0, 3.0)
    }

    pub fn with_multipliers(risk_fraction: f64, stop_multiplier: f64, target_multiplier: f64) -> Self {
        Self {
            sizer: AtrRiskSizer::new(risk_fraction, stop_multiplier, target_multiplier),
        }
    }

    pub fn sizer(&self) -> &AtrRiskSizer {
        &self.sizer
    }
}

impl Strategy for SmaAtrStrategy {
    fn name(&self) -> &str {
        "sma_atr"
    }

    fn signal(
        &self,
        current: &EnrichedBar,
        previous: &EnrichedBar,
        cash_balance: f64,
        fee_rate: f64,
    ) -> Signal {
        if is_golden_cross(previous, current) {
            let sizing = self.sizer.size(
                cash_balance,
                current.close(),
                current.volatility_range,
                fee_rate,
            );
            if sizing.size > 0.0 {
                return Signal::enter(
                    sizing.size,
                    sizing.stop_loss,
                    sizing.take_profit,
                    GOLDEN_CROSS,
                );
            }
            return Signal::hold();
        }

        if is_death_cross(previous, current) {
            return Signal::exit(DEATH_CROSS);
        }

        Signal::hold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::strategy::SignalAction;
    use chrono::{Duration, TimeZone, Utc};

    fn enriched(minute: i64, close: f64, fast: f64, slow: f64, vol: f64) -> EnrichedBar {
        let ts = Utc.timestamp_opt(1_600_000_000, 0).unwrap() + Duration::minutes(minute);
        EnrichedBar {
            bar: Bar::new(ts, close, close + 1.0, close - 1.0, close, 1.0),
            fast_avg: fast,
            slow_avg: slow,
            volatility_range: vol,
        }
    }

    #[test]
    fn golden_cross_enters_with_risk_levels() {
        let strategy = SmaAtrStrategy::new(0.03);
        let prev = enriched(0, 100.0, 99.0, 100.0, 5.0);
        let cur = enriched(1, 100.0, 101.0, 100.0, 5.0);

        let signal = strategy.signal(&cur, &prev, 10_000.0, 0.001);
        assert_eq!(signal.action, SignalAction::Enter);
        assert_eq!(signal.stop_loss, 90.0);
        assert_eq!(signal.take_profit, 115.0);
        // risk $300 over a $10 stop distance
        assert!((signal.size - 30.0).abs() < 1e-9);
        assert_eq!(signal.reason, GOLDEN_CROSS);
    }

    #[test]
    fn golden_cross_caps_size_at_affordable() {
        let strategy = SmaAtrStrategy::new(0.03);
        let prev = enriched(0, 100.0, 99.0, 100.0, 0.01);
        let cur = enriched(1, 100.0, 101.0, 100.0, 0.01);

        let signal = strategy.signal(&cur, &prev, 1_000.0, 0.001);
        assert!(signal.is_enter());
        assert!(signal.size < 1_000.0 / 100.0);
        assert!(signal.size > 9.9);
    }

    #[test]
    fn zero_volatility_golden_cross_holds() {
        let strategy = SmaAtrStrategy::new(0.03);
        let prev = enriched(0, 100.0, 99.0, 100.0, 0.0);
        let cur = enriched(1, 100.0, 101.0, 100.0, 0.0);
        assert_eq!(strategy.signal(&cur, &prev, 10_000.0, 0.001), Signal::hold());
    }

    #[test]
    fn death_cross_exits() {
        let strategy = SmaAtrStrategy::new(0.03);
        let prev = enriched(0, 100.0, 101.0, 100.0, 5.0);
        let cur = enriched(1, 100.0, 99.0, 100.0, 5.0);

        let signal = strategy.signal(&cur, &prev, 10_000.0, 0.001);
        assert_eq!(signal.action, SignalAction::Exit);
        assert_eq!(signal.reason, DEATH_CROSS);
    }

    #[test]
    fn touching_averages_do_not_cross() {
        let strategy = SmaAtrStrategy::new(0.03);
        // previous fast == slow: neither strictly below nor above
        let prev = enriched(0, 100.0, 100.0, 100.0, 5.0);
        let up = enriched(1, 100.0, 101.0, 100.0, 5.0);
        let down = enriched(1, 100.0, 99.0, 100.0, 5.0);
        assert_eq!(strategy.signal(&up, &prev, 10_000.0, 0.001).action, SignalAction::Hold);
        assert_eq!(strategy.signal(&down, &prev, 10_000.0, 0.001).action, SignalAction::Hold);
    }

    #[test]
    fn no_cross_holds() {
        let strategy = SmaAtrStrategy::new(0.03);
        let prev = enriched(0, 100.0, 101.0, 100.0, 5.0);
        let cur = enriched(1, 100.0, 102.0, 100.0, 5.0);
        assert_eq!(strategy.signal(&cur, &prev, 10_000.0, 0.001).action, SignalAction::Hold);
    }
}
