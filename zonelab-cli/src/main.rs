//! ZoneLab CLI: run backtests, inspect zones and time-window statistics.
//!
//! Commands:
//! - `run`: simulate a run file (or CLI overrides) and save artifacts
//! - `run --matrix`: every filter variant × period, in parallel
//! - `zones`: detect zones and print counts and the strongest zones
//! - `windows`: periodic window statistics and zone concentration

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zonelab_core::domain::{Bar, Zone, ZoneKind};
use zonelab_core::time_filter::{PeriodicClassifier, WindowStatistics, ZoneWindowProfile};
use zonelab_core::zones::{strongest, ZoneDetector, ZoneSummary};
use zonelab_runner::export::export_matrix_csv;
use zonelab_runner::{
    load_data, run_file, run_matrix, save_artifacts, LoadedData, RunFile, RunOutput,
};

#[derive(Parser)]
#[command(
    name = "zonelab",
    about = "ZoneLab CLI: supply/demand zone detection and backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where bars and parameters come from. CLI values override the run file.
#[derive(Args)]
struct DataArgs {
    /// CSV bar file (timestamp, open, high, low, close[, volume]).
    #[arg(long)]
    data: Option<PathBuf>,

    /// TOML run file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Instrument label. Defaults to the data file's stem.
    #[arg(long)]
    instrument: Option<String>,

    /// Higher-timeframe bucket width in minutes.
    #[arg(long)]
    htf_minutes: Option<u32>,

    /// Start date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    end: Option<String>,

    /// Use generated bars instead of a data file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation and save report.json, trades.csv, equity.csv, zones.csv.
    Run {
        #[command(flatten)]
        input: DataArgs,

        /// Run every variant × period cell of the validation matrix.
        #[arg(long, default_value_t = false)]
        matrix: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Detect zones and print a summary.
    Zones {
        #[command(flatten)]
        input: DataArgs,

        /// Number of strongest zones to list.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Periodic window statistics and zone concentration.
    Windows {
        #[command(flatten)]
        input: DataArgs,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            matrix,
            output_dir,
        } => run_cmd(&input, matrix, &output_dir),
        Commands::Zones { input, top } => zones_cmd(&input, top),
        Commands::Windows { input } => windows_cmd(&input),
    }
}

// ─── Input resolution ───────────────────────────────────────────────

fn parse_date(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("--{flag}: expected YYYY-MM-DD, got '{raw}'"))
}

/// Build the run file from `--config` plus CLI overrides, then load bars.
fn resolve_input(input: &DataArgs) -> Result<(RunFile, LoadedData)> {
    let mut file = match &input.config {
        Some(path) => RunFile::from_file(path)
            .with_context(|| format!("failed to load run file {}", path.display()))?,
        None => RunFile::default(),
    };

    if let Some(data) = &input.data {
        file.run.data = Some(data.clone());
        if input.instrument.is_none() && input.config.is_none() {
            if let Some(stem) = data.file_stem() {
                file.run.instrument = stem.to_string_lossy().into_owned();
            }
        }
    }
    if let Some(instrument) = &input.instrument {
        file.run.instrument = instrument.clone();
    }
    if let Some(minutes) = input.htf_minutes {
        file.run.htf_minutes = minutes;
    }
    if let Some(start) = &input.start {
        file.run.start = Some(parse_date(start, "start")?);
    }
    if let Some(end) = &input.end {
        file.run.end = Some(parse_date(end, "end")?);
    }
    file.validate().context("invalid run configuration")?;

    if !input.synthetic && file.run.data.is_none() {
        bail!("one of --data, a run file with [run] data, or --synthetic is required");
    }

    let data = load_data(&file, input.synthetic)?;
    Ok((file, data))
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_cmd(input: &DataArgs, matrix: bool, output_dir: &Path) -> Result<()> {
    let (file, data) = resolve_input(input)?;

    if matrix {
        let outputs = run_matrix(&file, &data)?;
        print_matrix(&outputs);
        for output in &outputs {
            save_artifacts(output, output_dir)?;
        }
        let summary_path = output_dir.join(format!("{}_matrix.csv", file.run.instrument));
        std::fs::write(&summary_path, export_matrix_csv(&outputs)?)
            .with_context(|| format!("failed to write {}", summary_path.display()))?;
        println!("Matrix summary saved to: {}", summary_path.display());
        return Ok(());
    }

    let output = run_file(&file, &data)?;
    print_summary(&output);
    let run_dir = save_artifacts(&output, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn detect(file: &RunFile, bars: &[Bar]) -> Result<Vec<Zone>> {
    let strategy = &file.strategy;
    let detector = ZoneDetector::new(strategy.zone_shape(), strategy.detector)?;
    Ok(detector.detect(bars))
}

fn zones_cmd(input: &DataArgs, top: usize) -> Result<()> {
    let (file, data) = resolve_input(input)?;
    let zones = detect(&file, &data.bars)?;
    let summary = ZoneSummary::from_zones(&zones);

    println!();
    println!("=== Zones: {} ===", file.run.instrument);
    println!("Bars:           {}", data.bars.len());
    println!(
        "Zones:          {} ({} supply, {} demand)",
        summary.total, summary.supply, summary.demand
    );
    println!(
        "Freshness:      {} fresh, {} tested, {} broken",
        summary.fresh, summary.tested, summary.broken
    );
    if zones.is_empty() {
        println!();
        return Ok(());
    }

    println!();
    println!(
        "{:<6} {:<7} {:<20} {:>12} {:>12} {:>9} {:>8} {:>8}",
        "Id", "Kind", "Created", "Bottom", "Top", "Strength", "Touches", "State"
    );
    println!("{}", "-".repeat(89));
    for z in strongest(&zones, top) {
        let kind = match z.kind {
            ZoneKind::Supply => "supply",
            ZoneKind::Demand => "demand",
        };
        println!(
            "{:<6} {:<7} {:<20} {:>12.5} {:>12.5} {:>9.3} {:>8} {:>8}",
            z.id.to_string(),
            kind,
            z.created_at.format("%Y-%m-%d %H:%M").to_string(),
            z.bottom,
            z.top,
            z.strength,
            z.touches,
            format!("{:?}", z.freshness)
        );
    }
    warn_synthetic(data.has_synthetic);
    println!();
    Ok(())
}

fn windows_cmd(input: &DataArgs) -> Result<()> {
    let (file, data) = resolve_input(input)?;
    let classifier = PeriodicClassifier::new(file.strategy.time_windows)?;
    let stats = WindowStatistics::from_bars(&classifier, &data.bars);
    let zones = detect(&file, &data.bars)?;
    let profile = ZoneWindowProfile::compute(&classifier, &zones, &data.bars);

    println!();
    println!("=== Time Windows: {} ===", file.run.instrument);
    println!("Bars:           {}", stats.total_bars);
    println!(
        "Hourly turn:    {} ({:.1}%)",
        stats.hourly_turn_bars, stats.hourly_turn_pct
    );
    println!(
        "Half hour:      {} ({:.1}%)",
        stats.half_hour_bars, stats.half_hour_pct
    );
    println!(
        "Any window:     {} ({:.1}%)",
        stats.window_bars, stats.window_pct
    );
    println!("Other:          {} ({:.1}%)", stats.other_bars, stats.other_pct);
    println!();
    println!("--- Zones ---");
    println!("Total:          {}", profile.zones_total);
    println!(
        "In window:      {} ({:.1}%)",
        profile.zones_in_window, profile.zones_in_window_pct
    );
    println!("Concentration:  {:.2}x", profile.concentration_factor);
    println!("Avg strength:   {:.3}", profile.avg_strength);
    println!("  in window:    {:.3}", profile.window_strength);
    println!("  other:        {:.3}", profile.other_strength);
    warn_synthetic(data.has_synthetic);
    println!();
    Ok(())
}

// ─── Output ─────────────────────────────────────────────────────────

fn warn_synthetic(has_synthetic: bool) {
    if has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_summary(output: &RunOutput) {
    let r = &output.report;
    println!();
    println!("=== Backtest Result ===");
    println!("Instrument:     {}", r.instrument);
    println!("Period:         {}", r.period);
    println!(
        "Bars:           {} ({} simulated)",
        r.bars, output.bars_processed
    );
    println!(
        "Zones:          {} ({} eligible)",
        output.zones.len(),
        output.eligible_zones
    );
    println!(
        "Trades:         {} ({:.1}/month)",
        r.total_trades, r.trades_per_month
    );
    println!();
    println!("--- Performance ---");
    println!("Win Rate:       {:.1}%", r.win_rate);
    println!("Total R:        {:.2}", r.total_pnl_r);
    println!("Avg Win:        {:.2}R", r.avg_win_r);
    println!("Avg Loss:       {:.2}R", r.avg_loss_r);
    println!("Profit Factor:  {:.2}", r.profit_factor);
    println!("Expectancy:     {:.3}R", r.expectancy_r);
    println!("Sharpe (trade): {:.3}", r.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", r.max_drawdown_pct);
    println!(
        "Capital:        {:.2} -> {:.2} ({:+.2}%)",
        r.initial_capital, r.final_capital, r.total_return_pct
    );
    println!("Max Consec Win: {}", r.max_consecutive_wins);
    println!("Max Consec Loss:{}", r.max_consecutive_losses);
    println!(
        "Window Trades:  {} ({:.1}%, {:.1}% win)",
        r.window_trades, r.window_trades_pct, r.window_win_rate
    );
    println!("Run Id:         {}", output.fingerprint.short_id());
    warn_synthetic(output.fingerprint.has_synthetic);
    println!();
}

fn print_matrix(outputs: &[RunOutput]) {
    println!();
    println!("=== Validation Matrix ===");
    println!(
        "{:<16} {:<12} {:>7} {:>8} {:>9} {:>8} {:>8} {:>8}",
        "Variant", "Period", "Trades", "Win %", "Total R", "PF", "Exp R", "DD %"
    );
    println!("{}", "-".repeat(83));
    for o in outputs {
        let r = &o.report;
        println!(
            "{:<16} {:<12} {:>7} {:>8.1} {:>9.2} {:>8.2} {:>8.3} {:>8.2}",
            o.variant,
            o.period,
            r.total_trades,
            r.win_rate,
            r.total_pnl_r,
            r.profit_factor,
            r.expectancy_r,
            r.max_drawdown_pct
        );
    }
    if outputs.iter().any(|o| o.fingerprint.has_synthetic) {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
