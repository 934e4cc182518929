//! Serializable backtest configuration.
//!
//! Loaded from TOML, validated once, then handed by reference to every run.
//! Missing keys fall back to the defaults of the classic setup (SMA 20/50,
//! ATR 14, 3% risk, 0.1% fee, 80/20 split).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crossbot_core::engine::EngineConfig;
use crossbot_core::indicators::IndicatorParams;
use crossbot_core::strategy::SmaAtrStrategy;

/// Unique identifier for a configuration (content-addressable hash).
pub type ConfigId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Every parameter needed to reproduce a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub fee_rate: f64,
    pub fast_period: usize,
    pub slow_period: usize,
    pub volatility_period: usize,
    /// Fraction of cash risked per trade.
    pub risk_fraction: f64,
    /// ATR multiple below the entry close for the stop-loss.
    pub stop_multiplier: f64,
    /// ATR multiple above the entry close for the take-profit.
    pub target_multiplier: f64,
    /// Cash at or below this after the test phase skips validation.
    pub bust_threshold: f64,
    /// Fraction of bars assigned to the test phase.
    pub split_ratio: f64,
    /// Smallest tradable quantity; entries are floored to a multiple.
    pub lot_size: Option<f64>,
    /// Close any open position at the last bar of each run.
    pub liquidate_at_end: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            fee_rate: 0.001,
            fast_period: 20,
            slow_period: 50,
            volatility_period: 14,
            risk_fraction: 0.03,
            stop_multiplier: 2.0,
            target_multiplier: 3.0,
            bust_threshold: 100.0,
            split_ratio: 0.8,
            lot_size: None,
            liquidate_at_end: false,
        }
    }
}

impl BacktestConfig {
    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(invalid("initial_balance", "must be > 0"));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return Err(invalid("fee_rate", "must be >= 0"));
        }
        if self.fast_period == 0 || self.slow_period == 0 || self.volatility_period == 0 {
            return Err(invalid("periods", "must all be positive"));
        }
        if self.fast_period >= self.slow_period {
            return Err(invalid(
                "fast_period",
                format!(
                    "must be below slow_period ({} >= {})",
                    self.fast_period, self.slow_period
                ),
            ));
        }
        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(invalid("risk_fraction", "must be in (0, 1]"));
        }
        if !(self.stop_multiplier.is_finite() && self.stop_multiplier >= 0.0) {
            return Err(invalid("stop_multiplier", "must be >= 0"));
        }
        if !(self.target_multiplier.is_finite() && self.target_multiplier >= 0.0) {
            return Err(invalid("target_multiplier", "must be >= 0"));
        }
        if !(self.bust_threshold.is_finite() && self.bust_threshold >= 0.0) {
            return Err(invalid("bust_threshold", "must be >= 0"));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(invalid("split_ratio", "must be in (0, 1)"));
        }
        if let Some(lot) = self.lot_size {
            if !(lot.is_finite() && lot > 0.0) {
                return Err(invalid("lot_size", "must be > 0"));
            }
        }
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share a fingerprint, so artifacts from
    /// different invocations can be matched up.
    pub fn fingerprint(&self) -> ConfigId {
        // Plain struct of numbers and options: serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams::new(self.fast_period, self.slow_period, self.volatility_period)
    }

    /// Engine settings for a run starting at `initial_balance`.
    pub fn engine_config(&self, initial_balance: f64) -> EngineConfig {
        EngineConfig {
            initial_balance,
            fee_rate: self.fee_rate,
            lot_size: self.lot_size,
            liquidate_at_end: self.liquidate_at_end,
        }
    }

    /// Build the strategy. Call only on a validated config.
    pub fn strategy(&self) -> SmaAtrStrategy {
        SmaAtrStrategy::with_multipliers(
            self.risk_fraction,
            self.stop_multiplier,
            self.target_multiplier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = BacktestConfig::from_toml("").unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = BacktestConfig::from_toml(
            r#"
            initial_balance = 5000.0
            fast_period = 5
            slow_period = 30
            lot_size = 0.001
            "#,
        )
        .unwrap();
        assert_eq!(config.initial_balance, 5_000.0);
        assert_eq!(config.fast_period, 5);
        assert_eq!(config.slow_period, 30);
        assert_eq!(config.lot_size, Some(0.001));
        assert_eq!(config.volatility_period, 14);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = BacktestConfig::from_toml("fast_perod = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validation_catches_bad_values() {
        let cases: &[(&str, &str)] = &[
            ("initial_balance = 0.0", "initial_balance"),
            ("fee_rate = -0.01", "fee_rate"),
            ("fast_period = 50\nslow_period = 20", "fast_period"),
            ("volatility_period = 0", "periods"),
            ("risk_fraction = 0.0", "risk_fraction"),
            ("risk_fraction = 1.5", "risk_fraction"),
            ("split_ratio = 1.0", "split_ratio"),
            ("bust_threshold = -1.0", "bust_threshold"),
            ("lot_size = -1.0", "lot_size"),
        ];
        for (toml, field) in cases {
            match BacktestConfig::from_toml(toml) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, *field, "{toml}"),
                other => panic!("expected invalid {field} for {toml:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = BacktestConfig::default();
        let b = BacktestConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c = BacktestConfig {
            fee_rate: 0.002,
            ..BacktestConfig::default()
        };
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn toml_roundtrip() {
        let config = BacktestConfig {
            lot_size: Some(0.01),
            ..BacktestConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(BacktestConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::from_file("/nonexistent/crossbot.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
