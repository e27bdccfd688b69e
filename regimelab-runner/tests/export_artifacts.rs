//! Artifact export: result.json / trades.csv / equity.csv written to disk and
//! read back.

use regimelab_core::StrategyConfig;
use regimelab_runner::config::{BacktestConfig, SyntheticConfig};
use regimelab_runner::export::{
    export_equity_csv, export_json, export_trades_csv, import_json, load_artifacts,
    save_artifacts,
};
use regimelab_runner::runner::{run_backtest, BacktestResult, SCHEMA_VERSION};

fn synthetic_result(bars: usize) -> BacktestResult {
    let mut config = BacktestConfig::default().with_synthetic(bars);
    if let Some(s) = config.data.synthetic.as_mut() {
        s.seed = "export-test".into();
    }
    run_backtest(&config).unwrap()
}

#[test]
fn save_artifacts_writes_all_files() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = synthetic_result(800);

    let dir = save_artifacts(&result, &temp_dir.path().join("run")).unwrap();

    assert!(dir.join("result.json").exists());
    assert!(dir.join("trades.csv").exists());
    assert!(dir.join("equity.csv").exists());

    let loaded = load_artifacts(&dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.run.trades.len(), result.run.trades.len());
    assert_eq!(loaded.metrics.trade_count, result.metrics.trade_count);
    assert!(loaded.synthetic);
}

#[test]
fn equity_csv_has_one_row_per_candle() {
    let result = synthetic_result(400);
    let csv = export_equity_csv(&result.run.equity_curve, &result.run.regimes).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "timestamp,cash,position_value,total,regime");
    assert_eq!(lines.len(), 401);
    assert!(lines[1].ends_with(result.run.regimes[0].as_str()));
}

#[test]
fn trades_csv_has_one_row_per_trade() {
    let result = synthetic_result(1_500);
    let csv = export_trades_csv(&result.run.trades).unwrap();
    assert!(csv.starts_with("entry_index,entry_time,entry_price"));
    assert_eq!(csv.lines().count(), result.run.trades.len() + 1);
}

#[test]
fn json_round_trip_keeps_config() {
    let result = synthetic_result(300);
    let json = export_json(&result).unwrap();
    let back = import_json(&json).unwrap();
    assert_eq!(back.schema_version, SCHEMA_VERSION);
    assert_eq!(back.config, result.config);
    assert_eq!(back.config_fingerprint, StrategyConfig::default().fingerprint());
}

#[test]
fn newer_schema_version_is_rejected() {
    let result = synthetic_result(300);
    let mut value: serde_json::Value =
        serde_json::from_str(&export_json(&result).unwrap()).unwrap();
    value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
    let err = import_json(&value.to_string()).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}

#[test]
fn missing_artifact_dir_is_an_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    assert!(load_artifacts(&temp_dir.path().join("nope")).is_err());
}

#[test]
fn csv_source_round_trips_through_loader() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("candles.csv");

    // Write synthetic candles as plain OHLCV, then run from the file.
    let candles = regimelab_runner::data_loader::generate_synthetic(
        &SyntheticConfig {
            bars: 500,
            ..SyntheticConfig::default()
        },
        regimelab_core::domain::Timeframe::H1,
    );
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])
        .unwrap();
    for c in &candles {
        wtr.write_record([
            c.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            c.open.to_string(),
            c.high.to_string(),
            c.low.to_string(),
            c.close.to_string(),
            c.volume.to_string(),
        ])
        .unwrap();
    }
    wtr.flush().unwrap();

    let from_csv = run_backtest(&BacktestConfig::default().with_csv(path)).unwrap();
    let from_synthetic = run_backtest(&BacktestConfig::default().with_synthetic(500)).unwrap();

    assert!(!from_csv.synthetic);
    assert_eq!(from_csv.dataset_hash, from_synthetic.dataset_hash);
    assert_eq!(from_csv.run.final_equity, from_synthetic.run.final_equity);
}
