use crate::models::*;
use async_trait::async_trait;
use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Configuration Errors
// ---------------------------------------------------------------------------

/// Invalid run settings, reported before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid SMA window {0}: must be > 0")]
    InvalidWindow(usize),
    #[error("Invalid lookback of {0} days: must be > 0")]
    InvalidLookback(u32),
    #[error("Ticker must not be empty")]
    EmptyTicker,
    #[error("Config parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Data Provider Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while fetching price data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No data found for ticker {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Request failed: {0}")]
    RequestError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// Provides historical daily bars.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Load daily bars for `ticker` with `start <= date <= end`.
    ///
    /// An empty result is reported as [`FetchError::NoData`], never as an
    /// empty series.
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError>;

    /// Short name used in log output.
    fn name(&self) -> &str;
}
