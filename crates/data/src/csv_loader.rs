use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pricelens_core::{FetchError, PriceBar, PriceSeries};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Load daily bars from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `date` (or `timestamp`, `datetime`), `open`, `high`, `low`, `close`, and
/// optionally `volume`. Extra columns are ignored, so a report written by
/// [`crate::report`] loads back fine.
///
/// The ticker is taken from the file stem.
pub fn load_bars_from_csv(path: &Path) -> Result<PriceSeries, FetchError> {
    let ticker = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| FetchError::ParseError(format!("Failed to open CSV: {}", e)))?;

    let headers = reader
        .headers()
        .map_err(|e| FetchError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();

    let col_map = resolve_bar_columns(&headers)?;

    let mut bars = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| FetchError::ParseError(format!("CSV record error: {}", e)))?;

        let volume = match col_map.volume.and_then(|idx| record.get(idx)) {
            Some(raw) if !raw.is_empty() => parse_decimal(raw, "volume")?,
            _ => Decimal::ZERO,
        };

        bars.push(PriceBar {
            date: parse_date(field(&record, col_map.date, "date")?)?,
            open: parse_decimal(field(&record, col_map.open, "open")?, "open")?,
            high: parse_decimal(field(&record, col_map.high, "high")?, "high")?,
            low: parse_decimal(field(&record, col_map.low, "low")?, "low")?,
            close: parse_decimal(field(&record, col_map.close, "close")?, "close")?,
            volume,
        });
    }

    tracing::debug!(path = %path.display(), bars = bars.len(), "Loaded CSV bars");
    Ok(PriceSeries::new(ticker, bars))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct BarColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

fn resolve_bar_columns(headers: &csv::StringRecord) -> Result<BarColumnMap, FetchError> {
    let date = find_column(headers, &["date", "timestamp", "datetime", "time"])
        .ok_or_else(|| FetchError::ParseError("No date column found".into()))?;
    let open = find_column(headers, &["open", "o"])
        .ok_or_else(|| FetchError::ParseError("No open column found".into()))?;
    let high = find_column(headers, &["high", "h"])
        .ok_or_else(|| FetchError::ParseError("No high column found".into()))?;
    let low = find_column(headers, &["low", "l"])
        .ok_or_else(|| FetchError::ParseError("No low column found".into()))?;
    let close = find_column(headers, &["close", "c"])
        .ok_or_else(|| FetchError::ParseError("No close column found".into()))?;
    let volume = find_column(headers, &["volume", "vol", "v"]);

    Ok(BarColumnMap {
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let h = header.trim().to_lowercase();
        names.iter().any(|name| h == *name)
    })
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, name: &str) -> Result<&'r str, FetchError> {
    record
        .get(idx)
        .ok_or_else(|| FetchError::ParseError(format!("Missing {} field in CSV record", name)))
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, FetchError> {
    Decimal::from_str(s.trim())
        .or_else(|_| Decimal::from_scientific(s.trim()))
        .map_err(|e| FetchError::ParseError(format!("Failed to parse {} '{}': {}", field, s, e)))
}

/// Calendar date of a date or datetime cell. Offsets are kept local, so
/// `2024-01-02 00:00:00-05:00` is the 2nd.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, FetchError> {
    let s = s.trim();

    let date_formats = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];
    for fmt in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.date_naive());
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for fmt in &datetime_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.date());
        }
    }

    // Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt.date_naive());
        }
    }

    Err(FetchError::ParseError(format!("Unable to parse date: '{}'", s)))
}
