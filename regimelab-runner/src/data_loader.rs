//! Candle loading for the runner.
//!
//! Two sources:
//! 1. A CSV file with `timestamp,open,high,low,close,volume` and any of the
//!    indicator columns (`rsi`, `macd`, `macd_signal`, ...)
//! 2. Deterministic synthetic candles (seeded random walk with regime drifts)
//!
//! Either way the candles are validated, then [`enrich`] fills every missing
//! indicator column from OHLCV.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use regimelab_core::domain::{Candle, Timeframe};
use regimelab_core::indicators::{count_missing, enrich, IndicatorParams};

use crate::config::{DataConfig, SyntheticConfig};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognized timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },
    #[error("row {row}: timestamp {timestamp} is not after the previous candle")]
    NotAscending { row: usize, timestamp: NaiveDateTime },
    #[error("row {row}: OHLC values fail sanity checks")]
    InsaneCandle { row: usize },
    #[error("no candles loaded")]
    Empty,
    #[error("no data source configured (set data.path or data.synthetic)")]
    NoSource,
}

/// Candles ready for simulation, plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub candles: Vec<Candle>,
    /// BLAKE3 over timestamps and OHLCV.
    pub dataset_hash: String,
    pub synthetic: bool,
    /// Candles still missing at least one indicator after enrichment.
    pub missing_indicators: usize,
    pub data_quality_warnings: Vec<String>,
}

/// Load candles from the configured source, validate and enrich them.
pub fn load(
    data: &DataConfig,
    timeframe: Timeframe,
    params: &IndicatorParams,
) -> Result<LoadedData, LoadError> {
    let (candles, synthetic) = match (&data.path, &data.synthetic) {
        (Some(path), _) => (load_csv(path)?, false),
        (None, Some(s)) => (generate_synthetic(s, timeframe), true),
        (None, None) => return Err(LoadError::NoSource),
    };
    Ok(prepare(candles, params, synthetic))
}

/// Enrich validated candles and collect data-quality warnings.
pub fn prepare(mut candles: Vec<Candle>, params: &IndicatorParams, synthetic: bool) -> LoadedData {
    let dataset_hash = compute_dataset_hash(&candles);
    enrich(&mut candles, params);

    let missing = count_missing(&candles);
    let mut data_quality_warnings = Vec::new();
    // Warm-up candles are expected to lack some indicators.
    let expected = params.max_lookback().min(candles.len());
    if missing > expected {
        let msg = format!(
            "{missing} of {} candles are missing indicators \
             (expected at most {expected} from warm-up)",
            candles.len()
        );
        warn!("{msg}");
        data_quality_warnings.push(msg);
    }
    if synthetic {
        data_quality_warnings.push("synthetic data".to_string());
    }
    info!(
        candles = candles.len(),
        missing_indicators = missing,
        synthetic,
        "candles loaded"
    );

    LoadedData {
        candles,
        dataset_hash,
        synthetic,
        missing_indicators: missing,
        data_quality_warnings,
    }
}

// ─── CSV ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    rsi: Option<f64>,
    #[serde(default)]
    macd: Option<f64>,
    #[serde(default)]
    macd_signal: Option<f64>,
    #[serde(default)]
    adx: Option<f64>,
    #[serde(default)]
    atr: Option<f64>,
    #[serde(default)]
    mfi: Option<f64>,
    #[serde(default)]
    bb_upper: Option<f64>,
    #[serde(default)]
    bb_middle: Option<f64>,
    #[serde(default)]
    bb_lower: Option<f64>,
    #[serde(default)]
    stoch_k: Option<f64>,
    #[serde(default)]
    stoch_d: Option<f64>,
    #[serde(default)]
    ema_fast: Option<f64>,
    #[serde(default)]
    ema_slow: Option<f64>,
}

impl CsvRow {
    fn into_candle(self, timestamp: NaiveDateTime) -> Candle {
        let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);
        Candle {
            rsi: nan(self.rsi),
            macd: nan(self.macd),
            macd_signal: nan(self.macd_signal),
            adx: nan(self.adx),
            atr: nan(self.atr),
            mfi: nan(self.mfi),
            bb_upper: nan(self.bb_upper),
            bb_middle: nan(self.bb_middle),
            bb_lower: nan(self.bb_lower),
            stoch_k: nan(self.stoch_k),
            stoch_d: nan(self.stoch_d),
            ema_fast: nan(self.ema_fast),
            ema_slow: nan(self.ema_slow),
            ..Candle::new(
                timestamp,
                self.open,
                self.high,
                self.low,
                self.close,
                self.volume,
            )
        }
    }
}

/// Read and validate candles from a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file)
}

/// Read and validate candles from any CSV reader.
pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        // 1-based, counting the header line.
        let line = i + 2;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::BadTimestamp {
            row: line,
            value: row.timestamp.clone(),
        })?;
        candles.push(row.into_candle(timestamp));
    }
    validate(&candles)?;
    Ok(candles)
}

/// Parse `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD`, or a
/// Unix timestamp in seconds or milliseconds.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let s = s.trim();
    if let Some(ts) = FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(ts);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    let n: i64 = s.parse().ok()?;
    let dt = if n.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    };
    dt.map(|d| d.naive_utc())
}

/// Strictly ascending timestamps and sane OHLC on every candle.
pub fn validate(candles: &[Candle]) -> Result<(), LoadError> {
    if candles.is_empty() {
        return Err(LoadError::Empty);
    }
    for (i, c) in candles.iter().enumerate() {
        let row = i + 2;
        if !c.is_sane() {
            return Err(LoadError::InsaneCandle { row });
        }
        if i > 0 && c.timestamp <= candles[i - 1].timestamp {
            return Err(LoadError::NotAscending {
                row,
                timestamp: c.timestamp,
            });
        }
    }
    Ok(())
}

/// Deterministic BLAKE3 hash over timestamps and OHLCV.
pub fn compute_dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.timestamp.and_utc().timestamp().to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        hasher.update(&c.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Drift and volatility per step for each synthetic market phase.
const PHASES: [(f64, f64); 5] = [
    (0.0020, 0.006),
    (0.0007, 0.008),
    (0.0000, 0.005),
    (-0.0007, 0.009),
    (-0.0020, 0.012),
];

/// Seeded random walk that alternates between trending and ranging phases.
///
/// The same `seed` text always produces the same candles.
pub fn generate_synthetic(config: &SyntheticConfig, timeframe: Timeframe) -> Vec<Candle> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(config.seed.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = timeframe.duration();
    let mut candles = Vec::with_capacity(config.bars);
    let mut price = 100.0_f64;
    let mut phase = PHASES[2];
    let mut phase_left = 0usize;

    for i in 0..config.bars {
        if phase_left == 0 {
            phase = PHASES[rng.gen_range(0..PHASES.len())];
            phase_left = rng.gen_range(60..300);
        }
        phase_left -= 1;

        let (drift, vol) = phase;
        // Uniform noise scaled to unit variance.
        let shock: f64 = rng.gen_range(-1.0..1.0) * 3.0_f64.sqrt();
        let open = price;
        let close = (price * (1.0 + drift + vol * shock)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol));
        let volume = rng.gen_range(500.0..5_000.0) * (1.0 + (close / open - 1.0).abs() * 50.0);

        candles.push(Candle::new(
            config.start + step * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    candles
}
