//! Artifact export: JSON manifest plus CSV tapes for external plotting.
//!
//! Each phase directory contains:
//! - `manifest.json`: the full `BacktestResult`, schema-versioned
//! - `trades.csv`: completed round trips
//! - `equity.csv`: bar-by-bar equity curve
//! - `events.csv`: every BUY/SELL marker with its reason
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crossbot_core::domain::{EquityPoint, TradeEvent, TradeRecord};

use crate::phases::PhaseOutcome;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: entry_time, exit_time, entry_price, exit_price, size, pnl, exit_reason
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_time",
        "exit_time",
        "entry_price",
        "exit_price",
        "size",
        "pnl",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_time.to_rfc3339(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.exit_price),
            &format!("{:.8}", t.size),
            &format!("{:.2}", t.pnl),
            &t.exit_reason.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "equity"])?;
    for point in equity_curve {
        wtr.write_record([&point.timestamp.to_rfc3339(), &format!("{:.2}", point.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_events_csv(events: &[TradeEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "price", "type", "reason"])?;
    for e in events {
        wtr.write_record([
            &e.timestamp.to_rfc3339(),
            &format!("{:.6}", e.price),
            &e.side.to_string(),
            &e.reason,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write one phase's artifacts into `dir`, creating it if needed.
pub fn save_artifacts(result: &BacktestResult, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    };

    write("manifest.json", export_json(result)?)?;
    write("trades.csv", export_trades_csv(&result.run.trades)?)?;
    write("equity.csv", export_equity_csv(&result.run.equity_curve)?)?;
    write("events.csv", export_events_csv(&result.run.events)?)?;
    Ok(())
}

/// Save every phase under `{output_dir}/{fingerprint}_{timestamp}/{phase}/`.
///
/// Returns the path to the created run directory.
pub fn save_outcome(outcome: &PhaseOutcome, output_dir: &Path) -> Result<PathBuf> {
    let fingerprint = &outcome.test.config_fingerprint;
    let dirname = format!(
        "{}_{}",
        &fingerprint[..fingerprint.len().min(12)],
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);

    for phase in outcome.phases() {
        save_artifacts(phase, &run_dir.join(&phase.label))?;
    }
    tracing::info!(dir = %run_dir.display(), "artifacts written");

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::data_loader::generate_synthetic_bars;
    use crate::runner::run_backtest;
    use chrono::{Duration, TimeZone, Utc};
    use crossbot_core::domain::{ExitReason, TradeSide};

    fn sample_result() -> BacktestResult {
        let bars = generate_synthetic_bars(
            "export",
            1_500,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            Duration::minutes(1),
        )
        .bars;
        run_backtest("test", &bars, &BacktestConfig::default(), 10_000.0, None).unwrap()
    }

    #[test]
    fn trades_csv_layout() {
        let ts = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let trades = vec![TradeRecord {
            entry_time: ts,
            exit_time: ts + Duration::minutes(3),
            entry_price: 100.0,
            exit_price: 90.0,
            size: 2.5,
            pnl: -25.45,
            exit_reason: ExitReason::StopLoss,
        }];
        let csv = export_trades_csv(&trades).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("entry_time,exit_time,entry_price,exit_price,size,pnl,exit_reason")
        );
        let row = lines.next().unwrap();
        assert!(row.ends_with(",-25.45,Stop Loss"));
        assert!(row.starts_with("2020-09-13T12:26:40+00:00"));
    }

    #[test]
    fn events_csv_uses_side_labels() {
        let ts = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let events = vec![
            TradeEvent {
                timestamp: ts,
                price: 10.0,
                side: TradeSide::Buy,
                reason: "Golden Cross".into(),
            },
            TradeEvent {
                timestamp: ts + Duration::minutes(1),
                price: 11.0,
                side: TradeSide::Sell,
                reason: "Take Profit".into(),
            },
        ];
        let csv = export_events_csv(&events).unwrap();
        assert!(csv.contains(",BUY,Golden Cross"));
        assert!(csv.contains(",SELL,Take Profit"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn json_roundtrip_and_version_check() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.label, result.label);
        assert_eq!(back.report.trade_count, result.report.trade_count);
        assert_eq!(back.run.equity_curve.len(), result.run.equity_curve.len());

        let future = json.replacen(
            &format!("\"schema_version\": {SCHEMA_VERSION}"),
            "\"schema_version\": 999",
            1,
        );
        assert!(import_json(&future).is_err());
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let phase_dir = dir.path().join("test");
        save_artifacts(&result, &phase_dir).unwrap();

        for name in ["manifest.json", "trades.csv", "equity.csv", "events.csv"] {
            assert!(phase_dir.join(name).exists(), "{name} missing");
        }
        let equity = std::fs::read_to_string(phase_dir.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), result.run.equity_curve.len() + 1);

        let loaded = load_artifacts(&phase_dir).unwrap();
        assert_eq!(loaded.label, "test");
        assert_eq!(loaded.run.trades.len(), result.run.trades.len());
        assert_eq!(loaded.config_fingerprint, result.config_fingerprint);
    }

    #[test]
    fn save_outcome_writes_each_phase() {
        let result = sample_result();
        let outcome = PhaseOutcome {
            validation: Some(BacktestResult {
                label: "validation".into(),
                ..result.clone()
            }),
            test: result,
            busted: false,
        };
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_outcome(&outcome, dir.path()).unwrap();
        assert!(run_dir.join("test").join("manifest.json").exists());
        assert!(run_dir.join("validation").join("events.csv").exists());
    }
}
