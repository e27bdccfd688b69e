//! RegimeLab CLI: run, walk-forward and sweep commands.
//!
//! Commands:
//! - `run`: one backtest; prints a summary and writes result.json, trades.csv, equity.csv
//! - `walk-forward`: rolling IS/OOS validation with per-fold overfitting verdicts
//! - `sweep`: Kelly damping × regime-switch policy grid, ranked by a metric
//!
//! Logging goes through `tracing`; set `RUST_LOG` to change the level (default `info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use regimelab_runner::export::save_artifacts;
use regimelab_runner::{
    load, run_loaded, run_sweep, run_walk_forward, BacktestConfig, BacktestResult, LoadedData,
    Metric, SweepGrid, SweepResults, SyntheticConfig, WalkForwardConfig, WalkForwardResult,
};

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab CLI: regime-switching strategy backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the configuration and candles come from.
#[derive(Args)]
struct Source {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV candle file; overrides `[data]` from the config.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate this many synthetic candles; overrides `[data]`.
    #[arg(long)]
    synthetic: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest and save its artifacts.
    Run {
        #[command(flatten)]
        source: Source,

        /// Directory for result.json, trades.csv and equity.csv.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Walk-forward validation with an overfitting verdict per fold.
    WalkForward {
        #[command(flatten)]
        source: Source,

        /// Number of folds; overrides `[walk_forward]`.
        #[arg(long)]
        folds: Option<usize>,

        /// Minimum OOS/IS return ratio; overrides `[walk_forward]`.
        #[arg(long)]
        threshold: Option<f64>,

        /// Write the full result as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Sweep Kelly damping × regime-switch policy and rank the variants.
    Sweep {
        #[command(flatten)]
        source: Source,

        /// Ranking metric: sharpe, sortino, calmar, total_return, profit_factor,
        /// win_rate or drawdown.
        #[arg(long, default_value = "sharpe")]
        metric: Metric,

        /// Write the ranking as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { source, output_dir } => run_cmd(source, output_dir),
        Commands::WalkForward {
            source,
            folds,
            threshold,
            output,
        } => walk_forward_cmd(source, folds, threshold, output),
        Commands::Sweep {
            source,
            metric,
            output,
        } => sweep_cmd(source, metric, output),
    }
}

fn resolve(source: Source) -> Result<(BacktestConfig, LoadedData)> {
    let mut config = match &source.config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };
    if let Some(path) = source.data {
        config = config.with_csv(path);
    } else if let Some(bars) = source.synthetic {
        config = config.with_synthetic(bars);
    } else if config.data.path.is_none() && config.data.synthetic.is_none() {
        info!("no data source configured, using synthetic candles");
        config.data.synthetic = Some(SyntheticConfig::default());
    }
    config.validate()?;

    let loaded = load(
        &config.data,
        config.strategy.timeframe,
        &config.strategy.indicators,
    )?;
    Ok((config, loaded))
}

fn run_cmd(source: Source, output_dir: PathBuf) -> Result<()> {
    let (config, loaded) = resolve(source)?;
    let result = run_loaded(&config.strategy, &loaded)?;

    print_summary(&result);

    let dir = save_artifacts(&result, &output_dir)?;
    info!(dir = %dir.display(), "artifacts saved");
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn walk_forward_cmd(
    source: Source,
    folds: Option<usize>,
    threshold: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let (config, loaded) = resolve(source)?;
    let mut wf = config.walk_forward.clone().unwrap_or_default();
    if let Some(n) = folds {
        wf.n_folds = n;
    }
    if let Some(t) = threshold {
        wf.overfit_threshold = t;
    }

    let result = run_walk_forward(&config.strategy, &loaded.candles, &wf)?;
    print_walk_forward(&result, &wf);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)
            .context("failed to serialize walk-forward result")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

fn sweep_cmd(source: Source, metric: Metric, output: Option<PathBuf>) -> Result<()> {
    let (config, loaded) = resolve(source)?;
    let results = run_sweep(
        &config.strategy,
        &SweepGrid::damping_by_policy(),
        &loaded.candles,
        metric,
    );
    print_sweep(&results);

    if let Some(path) = output {
        let json =
            serde_json::to_string_pretty(&results).context("failed to serialize sweep results")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Ranking saved to: {}", path.display());
    }
    Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────

fn fmt_time<T: std::fmt::Display>(t: Option<T>) -> String {
    t.map_or_else(|| "-".to_string(), |t| t.to_string())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {} ({})", result.strategy_name, result.timeframe);
    println!(
        "Period:         {} to {}",
        fmt_time(result.start_time),
        fmt_time(result.end_time)
    );
    println!("Candles:        {}", result.candle_count);
    println!("Run ID:         {}", &result.run_id[..16.min(result.run_id.len())]);
    println!(
        "Trades:         {} ({} entries, {} skipped)",
        m.trade_count, m.entries, m.skipped_entries
    );
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Avg Win / Loss: {:.2}% / {:.2}%", m.avg_win * 100.0, m.avg_loss * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Kelly (full):   {:.3}", m.empirical_kelly);
    println!("Fees:           {:.2}", m.total_fees);
    if !m.exit_reasons.is_empty() {
        println!();
        println!("--- Exits ---");
        for (reason, n) in &m.exit_reasons {
            println!("{reason:<16}{n}");
        }
    }
    if !m.regime_counts.is_empty() {
        println!();
        println!("--- Regimes ---");
        for (regime, n) in &m.regime_counts {
            println!("{regime:<16}{n}");
        }
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for warn in &result.data_quality_warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

fn print_walk_forward(result: &WalkForwardResult, config: &WalkForwardConfig) {
    println!();
    println!("=== Walk-Forward ({} folds) ===", result.folds.len());
    println!(
        "{:>4}  {:>13}  {:>13}  {:>9}  {:>9}  {:>7}  verdict",
        "fold", "IS", "OOS", "IS ret", "OOS ret", "ratio"
    );
    for f in &result.folds {
        let s = &f.spec;
        println!(
            "{:>4}  {:>6}-{:<6}  {:>6}-{:<6}  {:>8.2}%  {:>8.2}%  {:>7}  {}",
            s.fold_index,
            s.is_start,
            s.is_end,
            s.oos_start,
            s.oos_end,
            f.verdict.in_sample_return * 100.0,
            f.verdict.out_of_sample_return * 100.0,
            f.verdict.ratio.map_or("-".to_string(), |r| format!("{r:.2}")),
            if f.verdict.overfit { "OVERFIT" } else { "ok" },
        );
    }
    println!();
    println!(
        "Mean return:    IS {:.2}%  OOS {:.2}%",
        result.mean_is_return * 100.0,
        result.mean_oos_return * 100.0
    );
    println!(
        "Mean Sharpe:    IS {:.3}  OOS {:.3}  ({:?})",
        result.mean_is_sharpe, result.mean_oos_sharpe, result.degradation_flag
    );
    println!(
        "Overfit folds:  {} of {}",
        result.overfit_folds,
        result.folds.len()
    );
    println!(
        "Verdict:        {} (threshold {:.2})",
        if result.verdict.overfit {
            "OVERFIT"
        } else {
            "robust"
        },
        config.overfit_threshold
    );
    println!();
}

fn print_sweep(results: &SweepResults) {
    println!();
    println!("=== Sweep (by {}) ===", results.metric);
    for e in &results.entries {
        match (&e.metrics, &e.error) {
            (Some(m), _) => println!(
                "{:>2}. {:>9.3}  ret {:>7.2}%  dd {:>6.2}%  trades {:>4}  {}",
                e.rank,
                e.score,
                m.total_return * 100.0,
                m.max_drawdown * 100.0,
                m.trade_count,
                e.label
            ),
            (None, err) => println!(
                "{:>2}. failed: {}  {}",
                e.rank,
                err.as_deref().unwrap_or("unknown error"),
                e.label
            ),
        }
    }
    println!();
}
