//! Bar enrichment: raw bars in, enriched bars with a full indicator history out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Atr, Indicator, Sma};
use crate::domain::{Bar, EnrichedBar};

/// Errors from indicator preparation.
#[derive(Debug, Error, PartialEq)]
pub enum PrepareError {
    #[error("indicator windows must be >= 1 (fast={fast}, slow={slow}, volatility={volatility})")]
    ZeroWindow {
        fast: usize,
        slow: usize,
        volatility: usize,
    },
    #[error("fast period {fast} must be smaller than slow period {slow}")]
    FastNotBelowSlow { fast: usize, slow: usize },
    #[error("bar {index} has a non-finite OHLC value")]
    VoidBar { index: usize },
    #[error("bar {index} timestamp {timestamp} does not follow the previous bar")]
    NonMonotonic { index: usize, timestamp: String },
}

/// Window lengths for the derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub volatility_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
            volatility_period: 14,
        }
    }
}

impl IndicatorParams {
    pub fn new(fast_period: usize, slow_period: usize, volatility_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            volatility_period,
        }
    }

    pub fn validate(&self) -> Result<(), PrepareError> {
        if self.fast_period == 0 || self.slow_period == 0 || self.volatility_period == 0 {
            return Err(PrepareError::ZeroWindow {
                fast: self.fast_period,
                slow: self.slow_period,
                volatility: self.volatility_period,
            });
        }
        if self.fast_period >= self.slow_period {
            return Err(PrepareError::FastNotBelowSlow {
                fast: self.fast_period,
                slow: self.slow_period,
            });
        }
        Ok(())
    }

    /// Number of leading bars dropped by `prepare`.
    pub fn warmup(&self) -> usize {
        self.fast_period
            .max(self.slow_period)
            .max(self.volatility_period)
            .saturating_sub(1)
    }
}

/// Enrich `bars` with fast/slow moving averages and the volatility range.
///
/// Bars without a full window for every field are dropped, so the output starts
/// at input index `params.warmup()` and is contiguous from there. Input must
/// have finite OHLC values and strictly increasing timestamps.
pub fn prepare(bars: &[Bar], params: &IndicatorParams) -> Result<Vec<EnrichedBar>, PrepareError> {
    params.validate()?;
    validate_bars(bars)?;

    let fast = Sma::new(params.fast_period);
    let slow = Sma::new(params.slow_period);
    let volatility = Atr::new(params.volatility_period);

    let fast_series = fast.compute(bars);
    let slow_series = slow.compute(bars);
    let volatility_series = volatility.compute(bars);

    let warmup = [fast.lookback(), slow.lookback(), volatility.lookback()]
        .into_iter()
        .max()
        .unwrap_or(0);
    debug_assert_eq!(warmup, params.warmup());

    let enriched: Vec<EnrichedBar> = bars
        .iter()
        .enumerate()
        .skip(warmup)
        .map(|(i, bar)| EnrichedBar {
            bar: bar.clone(),
            fast_avg: fast_series[i],
            slow_avg: slow_series[i],
            volatility_range: volatility_series[i],
        })
        .collect();

    debug_assert!(enriched.iter().all(EnrichedBar::is_complete));
    tracing::debug!(
        input = bars.len(),
        output = enriched.len(),
        warmup,
        "prepared indicator fields"
    );

    Ok(enriched)
}

fn validate_bars(bars: &[Bar]) -> Result<(), PrepareError> {
    for (index, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(PrepareError::VoidBar { index });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(PrepareError::NonMonotonic {
                index,
                timestamp: bar.timestamp.to_rfc3339(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn small_params() -> IndicatorParams {
        IndicatorParams {
            fast_period: 2,
            slow_period: 4,
            volatility_period: 3,
        }
    }

    #[test]
    fn drops_warmup_prefix() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let enriched = prepare(&bars, &small_params()).unwrap();

        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].timestamp(), bars[3].timestamp);
        // fast = mean(12, 13), slow = mean(10..=13)
        assert_approx(enriched[0].fast_avg, 12.5, DEFAULT_EPSILON);
        assert_approx(enriched[0].slow_avg, 11.5, DEFAULT_EPSILON);
        // make_bars with +1 steps: high - low = 3.0 dominates every TR after the first
        assert_approx(enriched[0].volatility_range, 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn volatility_window_can_dominate_warmup() {
        let params = IndicatorParams {
            fast_period: 2,
            slow_period: 3,
            volatility_period: 5,
        };
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let enriched = prepare(&bars, &params).unwrap();
        assert_eq!(params.warmup(), 4);
        assert_eq!(enriched.len(), 2);
        assert!(enriched.iter().all(EnrichedBar::is_complete));
    }

    #[test]
    fn too_few_bars_yields_empty() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        assert!(prepare(&bars, &small_params()).unwrap().is_empty());
        assert!(prepare(&[], &small_params()).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_windows() {
        let bars = make_bars(&[10.0, 11.0]);
        let zero = IndicatorParams {
            fast_period: 0,
            ..small_params()
        };
        assert!(matches!(
            prepare(&bars, &zero),
            Err(PrepareError::ZeroWindow { .. })
        ));

        let inverted = IndicatorParams {
            fast_period: 4,
            slow_period: 4,
            volatility_period: 3,
        };
        assert_eq!(
            prepare(&bars, &inverted),
            Err(PrepareError::FastNotBelowSlow { fast: 4, slow: 4 })
        );
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].timestamp = bars[1].timestamp;
        assert!(matches!(
            prepare(&bars, &small_params()),
            Err(PrepareError::NonMonotonic { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_nan_bars() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[1].close = f64::NAN;
        assert_eq!(
            prepare(&bars, &small_params()),
            Err(PrepareError::VoidBar { index: 1 })
        );
    }

    #[test]
    fn prepare_is_idempotent() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0, 18.0]);
        let first = prepare(&bars, &small_params()).unwrap();
        let second = prepare(&bars, &small_params()).unwrap();
        assert_eq!(first, second);
    }
}
