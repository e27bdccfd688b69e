//! Runner configuration: where candles come from, the strategy, and an
//! optional walk-forward section.
//!
//! ```toml
//! [data]
//! path = "candles.csv"
//!
//! [strategy]
//! timeframe = "1h"
//! [strategy.kelly]
//! damping = "quarter"
//!
//! [walk_forward]
//! n_folds = 4
//! ```
//!
//! Instead of `path`, a `[data.synthetic]` table generates a deterministic
//! random walk (`bars`, `seed`, `start`).

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::StrategyConfig;

use crate::walk_forward::WalkForwardConfig;

/// Errors from loading or validating a [`BacktestConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid [strategy] section: {0}")]
    Strategy(#[from] regimelab_core::ConfigError),
    #[error("invalid [data] section: {0}")]
    Data(String),
    #[error("invalid [walk_forward] section: {0}")]
    WalkForward(String),
}

/// Complete configuration for one backtest invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    pub walk_forward: Option<WalkForwardConfig>,
}

/// Candle source: a CSV file or generated synthetic candles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub synthetic: Option<SyntheticConfig>,
}

/// Deterministic synthetic candle generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bars: usize,
    /// Seed text; hashed to seed the generator.
    pub seed: String,
    /// First candle timestamp, e.g. `"2024-01-01T00:00:00"`.
    pub start: NaiveDateTime,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 2_000,
            seed: "regimelab".into(),
            start: default_start(),
        }
    }
}

fn default_start() -> NaiveDateTime {
    // 2024-01-01T00:00:00
    chrono::DateTime::from_timestamp(1_704_067_200, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Override the candle source with a CSV path.
    pub fn with_csv(mut self, path: PathBuf) -> Self {
        self.data = DataConfig {
            path: Some(path),
            synthetic: None,
        };
        self
    }

    /// Override the candle source with `bars` synthetic candles.
    pub fn with_synthetic(mut self, bars: usize) -> Self {
        let synthetic = SyntheticConfig {
            bars,
            ..self.data.synthetic.take().unwrap_or_default()
        };
        self.data = DataConfig {
            path: None,
            synthetic: Some(synthetic),
        };
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        match (&self.data.path, &self.data.synthetic) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Data(
                    "set either `path` or `synthetic`, not both".into(),
                ))
            }
            (None, Some(s)) if s.bars < 2 => {
                return Err(ConfigError::Data(format!(
                    "synthetic.bars must be at least 2, got {}",
                    s.bars
                )))
            }
            _ => {}
        }
        if let Some(wf) = &self.walk_forward {
            wf.validate().map_err(ConfigError::WalkForward)?;
        }
        Ok(())
    }

    /// Deterministic hash of the whole configuration.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimelab_core::domain::Timeframe;
    use regimelab_core::sizing::KellyDamping;

    #[test]
    fn empty_document_gives_defaults() {
        let config = BacktestConfig::from_toml_str("").unwrap();
        assert_eq!(config.data, DataConfig::default());
        assert!(config.walk_forward.is_none());
        assert_eq!(config.strategy.timeframe, Timeframe::H1);
    }

    #[test]
    fn parses_all_sections() {
        let toml = r#"
            [data.synthetic]
            bars = 500
            seed = "eth"
            start = "2023-06-01T00:00:00"

            [strategy]
            timeframe = "4h"
            [strategy.kelly]
            damping = "quarter"

            [walk_forward]
            n_folds = 3
        "#;
        let config = BacktestConfig::from_toml_str(toml).unwrap();
        let synthetic = config.data.synthetic.unwrap();
        assert_eq!(synthetic.bars, 500);
        assert_eq!(synthetic.seed, "eth");
        assert_eq!(config.strategy.timeframe, Timeframe::H4);
        assert_eq!(config.strategy.kelly.damping, KellyDamping::Quarter);
        assert_eq!(config.walk_forward.unwrap().n_folds, 3);
    }

    #[test]
    fn path_and_synthetic_are_exclusive() {
        let toml = r#"
            [data]
            path = "x.csv"
            [data.synthetic]
            bars = 100
        "#;
        assert!(matches!(
            BacktestConfig::from_toml_str(toml),
            Err(ConfigError::Data(_))
        ));
    }

    #[test]
    fn invalid_strategy_is_rejected() {
        let toml = r#"
            [strategy.kelly]
            kelly_min = 0.9
            kelly_max = 0.2
        "#;
        assert!(matches!(
            BacktestConfig::from_toml_str(toml),
            Err(ConfigError::Strategy(_))
        ));
    }

    #[test]
    fn overrides_replace_data_source() {
        let config = BacktestConfig::default().with_csv("a.csv".into());
        assert_eq!(config.data.path.as_deref(), Some(Path::new("a.csv")));
        let config = config.with_synthetic(300);
        assert!(config.data.path.is_none());
        assert_eq!(config.data.synthetic.unwrap().bars, 300);
    }

    #[test]
    fn run_id_is_deterministic_and_sensitive() {
        let a = BacktestConfig::default();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        b.strategy.warmup += 1;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
