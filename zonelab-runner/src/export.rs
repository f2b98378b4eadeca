//! Artifact export: JSON report plus CSV tapes.
//!
//! A run directory holds:
//! - `report.json`: the full `RunOutput` (schema versioned)
//! - `trades.csv`: one row per closed trade
//! - `equity.csv`: one row per simulated bar
//! - `zones.csv`: one row per detected zone
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use zonelab_core::domain::{Direction, EquityPoint, Freshness, Trade, Zone, ZoneKind};

use crate::runner::{RunOutput, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(output: &RunOutput) -> Result<String> {
    serde_json::to_string_pretty(output).context("failed to serialize run report to JSON")
}

/// Deserialize a run report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunOutput> {
    let output: RunOutput =
        serde_json::from_str(json).context("failed to deserialize run report from JSON")?;
    if output.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            output.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(output)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn direction_label(d: Direction) -> &'static str {
    match d {
        Direction::Long => "long",
        Direction::Short => "short",
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Trade tape.
///
/// Columns: id, zone, direction, entry_time, entry_index, entry_price,
/// stop_loss, initial_stop, tp1, tp2, status, close_reason, tp1_hit_at,
/// exit_time, exit_index, exit_price, pnl_r, partial_pnl_r, position_size,
/// mae, mfe, formed_in_window, htf_direction, htf_regime
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "id",
        "zone",
        "direction",
        "entry_time",
        "entry_index",
        "entry_price",
        "stop_loss",
        "initial_stop",
        "tp1",
        "tp2",
        "status",
        "close_reason",
        "tp1_hit_at",
        "exit_time",
        "exit_index",
        "exit_price",
        "pnl_r",
        "partial_pnl_r",
        "position_size",
        "mae",
        "mfe",
        "formed_in_window",
        "htf_direction",
        "htf_regime",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.id.0.to_string(),
            &t.zone.to_string(),
            direction_label(t.direction),
            &t.entry_time.to_string(),
            &t.entry_index.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.stop_loss),
            &format!("{:.6}", t.initial_stop),
            &format!("{:.6}", t.tp1),
            &format!("{:.6}", t.tp2),
            &format!("{:?}", t.status),
            t.status.close_reason().unwrap_or(""),
            &opt(t.tp1_hit_at),
            &opt(t.exit_time),
            &opt(t.exit_index),
            &opt(t.exit_price.map(|p| format!("{p:.6}"))),
            &format!("{:.4}", t.pnl_r),
            &format!("{:.4}", t.partial_pnl_r),
            &format!("{:.6}", t.position_size),
            &format!("{:.6}", t.mae),
            &format!("{:.6}", t.mfe),
            &t.formed_in_window.to_string(),
            &opt(t.htf_trend.map(|s| format!("{:?}", s.direction))),
            &opt(t.htf_trend.map(|s| format!("{:?}", s.regime))),
        ])?;
    }
    finish(wtr)
}

/// Equity curve, one row per simulated bar.
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "equity",
        "drawdown_pct",
        "open_trades",
        "closed_trades",
    ])?;
    for p in curve {
        wtr.write_record([
            &p.timestamp.to_string(),
            &format!("{:.2}", p.equity),
            &format!("{:.4}", p.drawdown_pct),
            &p.open_trades.to_string(),
            &p.closed_trades.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Detected zones with their final freshness.
pub fn export_zones_csv(zones: &[Zone]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "id",
        "kind",
        "top",
        "bottom",
        "created_at",
        "creation_index",
        "available_from",
        "strength",
        "velocity",
        "volume",
        "time_in_zone",
        "touches",
        "freshness",
        "broken_at",
    ])?;
    for z in zones {
        let kind = match z.kind {
            ZoneKind::Supply => "supply",
            ZoneKind::Demand => "demand",
        };
        let freshness = match z.freshness {
            Freshness::Fresh => "fresh",
            Freshness::Tested => "tested",
            Freshness::Broken => "broken",
        };
        wtr.write_record([
            &z.id.to_string(),
            kind,
            &format!("{:.6}", z.top),
            &format!("{:.6}", z.bottom),
            &z.created_at.to_string(),
            &z.creation_index.to_string(),
            &z.available_from.to_string(),
            &format!("{:.4}", z.strength),
            &format!("{:.4}", z.velocity),
            &format!("{:.2}", z.volume),
            &z.time_in_zone.to_string(),
            &z.touches.to_string(),
            freshness,
            &opt(z.broken_at),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name of a run: `{instrument}_{variant}_{period}_{short id}`.
pub fn run_dir_name(output: &RunOutput) -> String {
    format!(
        "{}_{}_{}_{}",
        output.report.instrument,
        output.variant,
        output.period,
        output.fingerprint.short_id()
    )
}

/// Write the artifact set under `output_dir` and return the run directory.
///
/// The directory name is derived from the fingerprint, so re-running the
/// same configuration on the same data overwrites the same directory.
pub fn save_artifacts(output: &RunOutput, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(run_dir_name(output));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("report.json", export_json(output)?),
        ("trades.csv", export_trades_csv(&output.report.trades)?),
        ("equity.csv", export_equity_csv(&output.report.equity_curve)?),
        ("zones.csv", export_zones_csv(&output.zones)?),
    ];
    for (name, content) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a run report from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<RunOutput> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Write a matrix summary: one row per cell.
pub fn export_matrix_csv(outputs: &[RunOutput]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "variant",
        "period",
        "bars",
        "zones",
        "total_trades",
        "win_rate",
        "total_pnl_r",
        "profit_factor",
        "expectancy_r",
        "max_drawdown_pct",
        "total_return_pct",
        "run_id",
    ])?;
    for o in outputs {
        let r = &o.report;
        wtr.write_record([
            &o.variant,
            &o.period,
            &r.bars.to_string(),
            &o.zones.len().to_string(),
            &r.total_trades.to_string(),
            &format!("{:.2}", r.win_rate),
            &format!("{:.3}", r.total_pnl_r),
            &format!("{:.3}", r.profit_factor),
            &format!("{:.3}", r.expectancy_r),
            &format!("{:.2}", r.max_drawdown_pct),
            &format!("{:.2}", r.total_return_pct),
            &o.fingerprint.run_id,
        ])?;
    }
    finish(wtr)
}
