use chrono::NaiveDate;
use pricelens_chart::{price_and_sma_series, render, ChartError, ChartSpec};
use pricelens_core::{ConfigError, DataProvider, FetchError, RunConfig};
use pricelens_data::{price_report_columns, write_csv, ReportError};
use pricelens_indicators::sma_series;
use std::path::PathBuf;

/// Any failure that ends a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Could not write report: {0}")]
    Report(#[from] ReportError),
    #[error("Could not render chart: {0}")]
    Chart(#[from] ChartError),
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub bars: usize,
    pub sma_values: usize,
    pub csv_path: PathBuf,
    pub chart_path: Option<PathBuf>,
}

/// Fetch, average, save, plot. Each step finishes before the next starts and
/// the first error stops the run.
pub async fn run(
    config: &RunConfig,
    provider: &dyn DataProvider,
    today: NaiveDate,
) -> Result<RunSummary, RunError> {
    config.validate()?;

    let (start, end) = config.date_range(today);
    tracing::info!(
        ticker = %config.ticker,
        days = config.lookback_days,
        %start,
        %end,
        source = provider.name(),
        "Fetching historical data"
    );
    let prices = provider.fetch_bars(&config.ticker, start, end).await?;
    tracing::info!(bars = prices.len(), "Data fetched successfully");

    tracing::info!(window = config.sma_window, "Calculating SMA");
    let sma = sma_series(&prices, config.sma_window)?;

    tracing::info!(path = %config.csv_path.display(), "Saving data");
    let rows = write_csv(&price_report_columns(&prices, &sma), &config.csv_path)?;
    tracing::info!(path = %config.csv_path.display(), rows, "Data saved");

    let chart_path = if config.save_chart {
        let path = config.chart_path();
        tracing::info!(path = %path.display(), "Creating chart");
        render(
            &price_and_sma_series(&prices, &sma),
            &ChartSpec::new(config.chart_title()),
            &path,
        )?;
        tracing::info!(path = %path.display(), "Chart saved");
        Some(path)
    } else {
        None
    };

    Ok(RunSummary {
        bars: prices.len(),
        sma_values: sma.defined_count(),
        csv_path: config.csv_path.clone(),
        chart_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricelens_data::CsvDataProvider;

    const TODAY: (i32, u32, u32) = (2024, 1, 31);

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(TODAY.0, TODAY.1, TODAY.2).unwrap()
    }

    /// Twelve January sessions with closes 1..=12.
    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("Date,Open,High,Low,Close\n");
        for day in 1..=12u32 {
            body.push_str(&format!("2024-01-{:02},{day},{day},{day},{day}\n", day + 2));
        }
        std::fs::write(dir.path().join("AAPL.csv"), body).unwrap();
        dir
    }

    fn config_in(dir: &tempfile::TempDir) -> RunConfig {
        RunConfig {
            csv_path: dir.path().join("report.csv"),
            save_chart: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        let dir = data_dir();
        let provider = CsvDataProvider::new(dir.path());
        let config = config_in(&dir);

        let summary = run(&config, &provider, today()).await.unwrap();
        assert_eq!(summary.bars, 12);
        assert_eq!(summary.sma_values, 3);
        assert!(summary.chart_path.is_none());

        let report = std::fs::read_to_string(&summary.csv_path).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Date,Open,High,Low,Close,10_SMA");
        assert_eq!(lines.len(), 13);
        assert!(lines[1..10].iter().all(|l| l.ends_with(',')));
        assert_eq!(lines[10], "2024-01-12,10,10,10,10,5.5");
        assert_eq!(lines[12], "2024-01-14,12,12,12,12,7.5");
    }

    #[tokio::test]
    async fn test_run_writes_chart() {
        let dir = data_dir();
        let provider = CsvDataProvider::new(dir.path());
        let config = RunConfig {
            save_chart: true,
            chart_path: Some(dir.path().join("aapl_chart.png")),
            ..config_in(&dir)
        };

        let summary = run(&config, &provider, today()).await.unwrap();
        let chart = summary.chart_path.expect("chart path when save_chart is set");
        assert_eq!(chart, dir.path().join("aapl_chart.png"));
        assert!(std::fs::metadata(&chart).unwrap().len() > 0);
        assert!(summary.csv_path.exists());
    }

    #[tokio::test]
    async fn test_zero_window_stops_before_fetch() {
        let dir = data_dir();
        let provider = CsvDataProvider::new(dir.path());
        let config = RunConfig {
            sma_window: 0,
            ..config_in(&dir)
        };

        let err = run(&config, &provider, today()).await.unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::InvalidWindow(0))));
        assert!(!config.csv_path.exists());
    }

    #[tokio::test]
    async fn test_no_data_in_range() {
        let dir = data_dir();
        let provider = CsvDataProvider::new(dir.path());
        let config = RunConfig {
            lookback_days: 5,
            ..config_in(&dir)
        };

        let err = run(&config, &provider, today()).await.unwrap_err();
        assert!(matches!(err, RunError::Fetch(FetchError::NoData { .. })));
        assert!(!config.csv_path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_report_path() {
        let dir = data_dir();
        let provider = CsvDataProvider::new(dir.path());
        let config = RunConfig {
            csv_path: dir.path().join("missing").join("report.csv"),
            ..config_in(&dir)
        };

        let err = run(&config, &provider, today()).await.unwrap_err();
        assert!(matches!(err, RunError::Report(ReportError::IoError(_))));
    }

    #[tokio::test]
    async fn test_unwritable_chart_path_after_report() {
        let dir = data_dir();
        let provider = CsvDataProvider::new(dir.path());
        let config = RunConfig {
            save_chart: true,
            chart_path: Some(dir.path().join("missing").join("chart.png")),
            ..config_in(&dir)
        };

        let err = run(&config, &provider, today()).await.unwrap_err();
        assert!(matches!(err, RunError::Chart(ChartError::IoError(_))));
        assert!(config.csv_path.exists());
    }
}
