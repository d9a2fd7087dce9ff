pub mod csv_loader;
pub mod report;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use pricelens_core::{DataProvider, FetchError, PriceSeries};

pub use report::{price_report_columns, write_csv, Column, ColumnData, ReportError};
pub use yahoo::YahooProvider;

/// A CSV-file-based data provider.
///
/// Bars for `TICKER` are read from `{directory}/TICKER.csv`.
pub struct CsvDataProvider {
    pub directory: std::path::PathBuf,
}

impl CsvDataProvider {
    pub fn new(directory: impl Into<std::path::PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl DataProvider for CsvDataProvider {
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        let file_path = self.directory.join(format!("{}.csv", ticker));
        if !file_path.exists() {
            return Err(FetchError::NotFound(format!(
                "CSV file not found: {}",
                file_path.display()
            )));
        }
        let series = csv_loader::load_bars_from_csv(&file_path)?;
        let filtered: Vec<_> = series
            .bars()
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect();
        if filtered.is_empty() {
            return Err(FetchError::NoData {
                ticker: ticker.to_string(),
                start,
                end,
            });
        }
        Ok(PriceSeries::new(ticker, filtered))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider_with_file() -> (tempfile::TempDir, CsvDataProvider) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("MSFT.csv"),
            "date,open,high,low,close\n\
             2024-01-02,370,375,366,370.87\n\
             2024-01-03,369,373,368,370.60\n\
             2024-01-04,370,373,367,367.94\n",
        )
        .unwrap();
        let provider = CsvDataProvider::new(dir.path());
        (dir, provider)
    }

    #[tokio::test]
    async fn test_filters_inclusive_range() {
        let (_dir, provider) = provider_with_file();
        let series = provider
            .fetch_bars("MSFT", ymd(2024, 1, 3), ymd(2024, 1, 4))
            .await
            .unwrap();
        assert_eq!(series.ticker(), "MSFT");
        assert_eq!(series.dates(), vec![ymd(2024, 1, 3), ymd(2024, 1, 4)]);
    }

    #[tokio::test]
    async fn test_empty_range_is_no_data() {
        let (_dir, provider) = provider_with_file();
        let err = provider
            .fetch_bars("MSFT", ymd(2023, 1, 1), ymd(2023, 12, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoData { .. }));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_not_found() {
        let (_dir, provider) = provider_with_file();
        let err = provider
            .fetch_bars("NOPE", ymd(2024, 1, 1), ymd(2024, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
