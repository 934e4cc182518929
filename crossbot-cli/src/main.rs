//! Crossbot CLI: SMA crossover backtests from the command line.
//!
//! Commands:
//! - `run`: test phase, bust guard, validation phase over a CSV (or synthetic bars)
//! - `sweep`: grid search over SMA windows, ATR window and risk fraction
//! - `synth`: write a deterministic synthetic CSV for experiments

mod obs;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::{Parser, Subcommand};

use crossbot_runner::data_loader::write_csv;
use crossbot_runner::export::save_outcome;
use crossbot_runner::{
    generate_synthetic_bars, load_csv, run_phases, run_sweep, split, BacktestConfig, BacktestResult,
    LoadedData, ParamGrid, PhaseOutcome,
};

#[derive(Parser)]
#[command(
    name = "crossbot",
    about = "Crossbot CLI: SMA crossover backtester with ATR risk sizing"
)]
struct Cli {
    /// Log level filter (overridden by CROSSBOT_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the test and validation phases and save artifacts.
    Run {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV with Timestamp, Open, High, Low, Close columns.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Run on this many synthetic bars instead of a CSV.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print reports only, write nothing.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Run a parameter grid over the test split and rank by return.
    Sweep {
        /// Path to a TOML config file for the fixed parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        data: Option<PathBuf>,

        #[arg(long)]
        synthetic: Option<usize>,

        /// Fast SMA windows (comma separated).
        #[arg(long, value_delimiter = ',', default_values_t = [10, 20, 30])]
        fast: Vec<usize>,

        /// Slow SMA windows (comma separated).
        #[arg(long, value_delimiter = ',', default_values_t = [50, 100, 200])]
        slow: Vec<usize>,

        /// ATR windows (comma separated).
        #[arg(long, value_delimiter = ',', default_values_t = [14])]
        vol: Vec<usize>,

        /// Risk fractions (comma separated).
        #[arg(long, value_delimiter = ',', default_values_t = [0.03])]
        risk: Vec<f64>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Print the full result set as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write synthetic bars as CSV.
    Synth {
        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = 5_000)]
        bars: usize,

        /// Seed label; the same label always yields the same bars.
        #[arg(long, default_value = "synthetic")]
        label: String,

        /// Minutes between bars.
        #[arg(long, default_value_t = 60)]
        interval_minutes: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            data,
            synthetic,
            output_dir,
            no_save,
        } => run_backtest_cmd(config, data, synthetic, output_dir, no_save),
        Commands::Sweep {
            config,
            data,
            synthetic,
            fast,
            slow,
            vol,
            risk,
            top,
            json,
        } => {
            let grid = ParamGrid {
                fast_periods: fast,
                slow_periods: slow,
                volatility_periods: vol,
                risk_fractions: risk,
            };
            run_sweep_cmd(config, data, synthetic, grid, top, json)
        }
        Commands::Synth {
            output,
            bars,
            label,
            interval_minutes,
        } => run_synth_cmd(&output, bars, &label, interval_minutes),
    }
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    Ok(match path {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    })
}

fn load_bars(data: Option<PathBuf>, synthetic: Option<usize>) -> Result<LoadedData> {
    match (data, synthetic) {
        (Some(_), Some(_)) => bail!("--data and --synthetic are mutually exclusive"),
        (None, None) => bail!("one of --data or --synthetic is required"),
        (Some(path), None) => {
            println!("Loading data from {}...", path.display());
            let loaded = load_csv(&path)?;
            println!(
                "Data loaded: {} rows ({} incomplete, {} duplicate dropped).",
                loaded.bars.len(),
                loaded.dropped_incomplete,
                loaded.dropped_duplicates
            );
            Ok(loaded)
        }
        (None, Some(count)) => Ok(generate_synthetic_bars(
            "synthetic",
            count,
            synthetic_start(),
            Duration::hours(1),
        )),
    }
}

fn synthetic_start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    data: Option<PathBuf>,
    synthetic: Option<usize>,
    output_dir: PathBuf,
    no_save: bool,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let loaded = load_bars(data, synthetic)?;

    tracing::info!(
        bars = loaded.bars.len(),
        dataset = %loaded.dataset_hash,
        synthetic = loaded.synthetic,
        fingerprint = %config.fingerprint(),
        "run command"
    );
    let outcome = run_phases(&loaded.bars, &config, None)?;
    print_outcome(&outcome);

    if no_save {
        tracing::info!("artifact saving disabled");
    } else {
        let run_dir = save_outcome(&outcome, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_outcome(outcome: &PhaseOutcome) {
    println!();
    println!(">>> TEST PHASE <<<");
    print_phase(&outcome.test);

    match &outcome.validation {
        None if outcome.busted => {
            println!();
            println!("Account busted in test phase. Skipping validation phase.");
        }
        None => {}
        Some(validation) => {
            println!("Test phase ending cash: ${:.2}", outcome.test.final_cash());
            println!();
            println!(">>> VALIDATION PHASE <<<");
            print_phase(validation);
        }
    }
}

fn print_phase(result: &BacktestResult) {
    println!(
        "Bars: {} ({} warmup) | Initial balance: ${:.2}",
        result.input_bars, result.warmup_bars, result.report.initial_balance
    );
    print!("{}", result.report);
    if let Some(pos) = &result.run.open_position {
        println!(
            "Open position at end: {:.6} @ {:.2} (stop {:.2}, target {:.2})",
            pos.size, pos.entry_price, pos.stop_loss, pos.take_profit
        );
    }
}

fn run_sweep_cmd(
    config_path: Option<PathBuf>,
    data: Option<PathBuf>,
    synthetic: Option<usize>,
    grid: ParamGrid,
    top: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let loaded = load_bars(data, synthetic)?;
    let (test_bars, _) = split(&loaded.bars, config.split_ratio);

    tracing::info!(
        grid = grid.size(),
        bars = test_bars.len(),
        "sweep command"
    );
    let rows = run_sweep(test_bars, &config, &grid, None)?;
    if let Some(best) = rows.first() {
        tracing::info!(
            fast = best.config.fast_period,
            slow = best.config.slow_period,
            total_return_pct = best.total_return_pct,
            "best configuration"
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:>5} {:>5} {:>4} {:>6} {:>10} {:>9} {:>8} {:>7}",
        "Fast", "Slow", "ATR", "Risk", "Return %", "MaxDD %", "Win %", "Trades"
    );
    for row in rows.iter().take(top) {
        println!(
            "{:>5} {:>5} {:>4} {:>6.3} {:>10.2} {:>9.2} {:>8.2} {:>7}",
            row.config.fast_period,
            row.config.slow_period,
            row.config.volatility_period,
            row.config.risk_fraction,
            row.total_return_pct,
            row.max_drawdown_pct,
            row.win_rate,
            row.trade_count
        );
    }
    println!("{} of {} configurations shown", rows.len().min(top), rows.len());
    Ok(())
}

fn run_synth_cmd(output: &Path, bars: usize, label: &str, interval_minutes: i64) -> Result<()> {
    if interval_minutes <= 0 {
        bail!("--interval-minutes must be positive");
    }
    let data = generate_synthetic_bars(
        label,
        bars,
        synthetic_start(),
        Duration::minutes(interval_minutes),
    );
    write_csv(&data.bars, output)?;
    tracing::debug!(label, bars = data.bars.len(), path = %output.display(), "synthetic csv written");
    println!(
        "Wrote {} bars to {} (hash {})",
        data.bars.len(),
        output.display(),
        &data.dataset_hash[..12]
    );
    Ok(())
}
