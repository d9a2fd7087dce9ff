use crate::traits::ConfigError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for a single pipeline run.
///
/// Every field has a default, so an empty TOML file (or no file at all)
/// yields the stock AAPL / 10-day / 365-day run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub ticker: String,
    pub sma_window: usize,
    pub lookback_days: u32,
    pub csv_path: PathBuf,
    /// Defaults to `{ticker lowercase}_chart.png` when unset.
    pub chart_path: Option<PathBuf>,
    pub save_chart: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            sma_window: 10,
            lookback_days: 365,
            csv_path: PathBuf::from("apple_stock_data.csv"),
            chart_path: None,
            save_chart: true,
        }
    }
}

impl RunConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker.trim().is_empty() {
            return Err(ConfigError::EmptyTicker);
        }
        if self.sma_window == 0 {
            return Err(ConfigError::InvalidWindow(self.sma_window));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::InvalidLookback(self.lookback_days));
        }
        Ok(())
    }

    pub fn chart_path(&self) -> PathBuf {
        self.chart_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_chart.png", self.ticker.to_lowercase())))
    }

    /// Inclusive `(start, end)` fetch range ending on `today`.
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = today
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        (start, today)
    }

    pub fn chart_title(&self) -> String {
        format!(
            "{} Stock Price with {}-Day SMA (Last {} Days)",
            self.ticker, self.sma_window, self.lookback_days
        )
    }
}
