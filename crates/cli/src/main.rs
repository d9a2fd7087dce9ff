mod pipeline;

use anyhow::Result;
use clap::Parser;
use pricelens_core::{DataProvider, RunConfig};
use pricelens_data::{CsvDataProvider, YahooProvider};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pricelens")]
#[command(about = "Fetch daily prices, compute a simple moving average, save a CSV report and chart")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticker symbol (default AAPL)
    #[arg(short, long)]
    ticker: Option<String>,

    /// SMA window in trading days (default 10)
    #[arg(short, long)]
    window: Option<usize>,

    /// Calendar days of history to fetch (default 365)
    #[arg(short, long)]
    days: Option<u32>,

    /// CSV report path (default apple_stock_data.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chart image path, .png or .svg (default <ticker>_chart.png)
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Skip rendering the chart
    #[arg(long)]
    no_chart: bool,

    /// Read <TICKER>.csv from this directory instead of calling Yahoo Finance
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(ticker) = &self.ticker {
            config.ticker = ticker.clone();
        }
        if let Some(window) = self.window {
            config.sma_window = window;
        }
        if let Some(days) = self.days {
            config.lookback_days = days;
        }
        if let Some(output) = &self.output {
            config.csv_path = output.clone();
        }
        if let Some(chart) = &self.chart {
            config.chart_path = Some(chart.clone());
        }
        if self.no_chart {
            config.save_chart = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.run_config()?;

    let provider: Box<dyn DataProvider> = match &cli.data_dir {
        Some(dir) => Box::new(CsvDataProvider::new(dir)),
        None => Box::new(YahooProvider::new()?),
    };

    let today = chrono::Local::now().date_naive();
    match pipeline::run(&config, provider.as_ref(), today).await {
        Ok(summary) => {
            tracing::info!(
                bars = summary.bars,
                sma_values = summary.sma_values,
                csv = %summary.csv_path.display(),
                chart = ?summary.chart_path,
                "Run complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(ticker = %config.ticker, "An error occurred: {}", e);
            std::process::exit(1);
        }
    }
}
