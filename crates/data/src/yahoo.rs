use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use pricelens_core::{DataProvider, FetchError, PriceBar, PriceSeries};
use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde::Deserialize;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = concat!("pricelens/", env!("CARGO_PKG_VERSION"));

/// Daily bars from the Yahoo Finance chart endpoint.
///
/// Prices are the raw quotes from `indicators.quote`, not split/dividend
/// adjusted: `close` is not the adjusted close that yfinance returns by
/// default.
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at a different chart endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        let url = format!("{}/{}", self.base_url, ticker);
        let query = [
            ("period1", unix_midnight(start).to_string()),
            ("period2", unix_midnight(next_day(end)).to_string()),
            ("interval", "1d".to_string()),
            ("includePrePost", "false".to_string()),
        ];

        tracing::debug!(%url, %start, %end, "Requesting chart data");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::RequestError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::RequestError(e.to_string()))?;

        if !status.is_success() {
            // Unknown symbols come back as 404 with an error envelope.
            if let Ok(envelope) = serde_json::from_str::<ChartEnvelope>(&body) {
                if let Some(err) = envelope.chart.error {
                    return Err(FetchError::ApiError(err.describe()));
                }
            }
            return Err(FetchError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        parse_chart(ticker, start, end, &body)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

// ---------------------------------------------------------------------------
// Response model
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Deserialize, Debug)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Deserialize, Debug)]
struct ChartApiError {
    code: Option<String>,
    description: Option<String>,
}

impl ChartApiError {
    fn describe(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(desc)) => format!("{}: {}", code, desc),
            (None, Some(desc)) => desc.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown chart API error".to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize, Debug, Default)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Turn a chart response body into a series.
///
/// Rows missing any of open/high/low/close are dropped, as are bars outside
/// `start..=end`. Nothing left means [`FetchError::NoData`].
fn parse_chart(
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    body: &str,
) -> Result<PriceSeries, FetchError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::ParseError(format!("Invalid chart response: {}", e)))?;

    if let Some(err) = envelope.chart.error {
        return Err(FetchError::ApiError(err.describe()));
    }

    let no_data = || FetchError::NoData {
        ticker: ticker.to_string(),
        start,
        end,
    };

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(no_data)?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;
    for (i, ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
        ) else {
            skipped += 1;
            continue;
        };

        let date = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| FetchError::ParseError(format!("Timestamp out of range: {}", ts)))?;
        if date < start || date > end {
            continue;
        }

        bars.push(PriceBar {
            date,
            open: to_decimal(open, "open")?,
            high: to_decimal(high, "high")?,
            low: to_decimal(low, "low")?,
            close: to_decimal(close, "close")?,
            volume: match value_at(&quote.volume, i) {
                Some(v) => to_decimal(v, "volume")?,
                None => Decimal::ZERO,
            },
        });
    }

    if skipped > 0 {
        tracing::debug!(ticker, skipped, "Dropped incomplete chart rows");
    }
    if bars.is_empty() {
        return Err(no_data());
    }
    Ok(PriceSeries::new(ticker, bars))
}

fn value_at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal, FetchError> {
    Decimal::try_from(value)
        .map_err(|e| FetchError::ParseError(format!("Invalid {} value {}: {}", field, value, e)))
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}
