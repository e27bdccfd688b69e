//! Result export: JSON and CSV artifacts.
//!
//! - **JSON**: the full `BacktestResult` with schema versioning
//! - **CSV**: trade ledger and equity curve for external analysis tools
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use regimelab_core::domain::{EquityPoint, MarketState, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
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

/// Export the trade ledger as CSV, one row per (partial) exit.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "quantity",
        "fees",
        "pnl",
        "pnl_pct",
        "exit_reason",
        "entry_regime",
        "exit_regime",
        "strategy",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_index.to_string(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.8}", t.quantity),
            &format!("{:.4}", t.fees),
            &format!("{:.4}", t.pnl),
            &format!("{:.6}", t.pnl_pct),
            t.exit_reason.as_str(),
            t.entry_regime.as_str(),
            t.exit_regime.as_str(),
            t.strategy.as_str(),
            &t.bars_held().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve as CSV, with the regime of each candle when known.
pub fn export_equity_csv(equity_curve: &[EquityPoint], regimes: &[MarketState]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "cash", "position_value", "total", "regime"])?;
    for (i, p) in equity_curve.iter().enumerate() {
        wtr.write_record([
            p.timestamp.to_string().as_str(),
            &format!("{:.4}", p.cash),
            &format!("{:.4}", p.position_value),
            &format!("{:.4}", p.total),
            regimes.get(i).map_or("", |r| r.as_str()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run into `output_dir`:
/// - `result.json`: the full `BacktestResult`
/// - `trades.csv`: the trade ledger
/// - `equity.csv`: per-candle equity curve
///
/// Returns the directory path.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    };
    write("result.json", export_json(result)?)?;
    write("trades.csv", export_trades_csv(&result.run.trades)?)?;
    write(
        "equity.csv",
        export_equity_csv(&result.run.equity_curve, &result.run.regimes)?,
    )?;

    Ok(output_dir.to_path_buf())
}

/// Load `result.json` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
