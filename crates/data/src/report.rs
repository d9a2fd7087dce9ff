//! Column-oriented CSV output.

use chrono::NaiveDate;
use pricelens_core::{PriceSeries, SmaSeries};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from writing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    Misaligned {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Cell values of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnData {
    Dates(Vec<NaiveDate>),
    /// `None` is written as an empty cell.
    Numbers(Vec<Option<Decimal>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Dates(v) => v.len(),
            ColumnData::Numbers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, row: usize) -> String {
        match self {
            ColumnData::Dates(v) => v[row].format(DATE_FORMAT).to_string(),
            ColumnData::Numbers(v) => v[row].map(|d| d.normalize().to_string()).unwrap_or_default(),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn dates(name: impl Into<String>, values: Vec<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Dates(values),
        }
    }

    pub fn numbers(name: impl Into<String>, values: Vec<Option<Decimal>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numbers(values),
        }
    }
}

/// The `Date,Open,High,Low,Close,{w}_SMA` projection of a run.
pub fn price_report_columns(prices: &PriceSeries, sma: &SmaSeries) -> Vec<Column> {
    let bars = prices.bars();
    let pick = |f: fn(&pricelens_core::PriceBar) -> Decimal| -> Vec<Option<Decimal>> {
        bars.iter().map(|b| Some(f(b))).collect()
    };

    vec![
        Column::dates("Date", prices.dates()),
        Column::numbers("Open", pick(|b| b.open)),
        Column::numbers("High", pick(|b| b.high)),
        Column::numbers("Low", pick(|b| b.low)),
        Column::numbers("Close", pick(|b| b.close)),
        Column::numbers(sma.column_name(), sma.values()),
    ]
}

/// Write `columns` to `path`, overwriting it. Returns the number of data rows.
pub fn write_csv(columns: &[Column], path: &Path) -> Result<usize, ReportError> {
    let file = std::fs::File::create(path)?;
    let rows = write_csv_to(columns, file)?;
    tracing::debug!(path = %path.display(), rows, "Wrote CSV report");
    Ok(rows)
}

/// Write a header row plus one row per aligned index.
///
/// All columns must have the same length.
pub fn write_csv_to<W: Write>(columns: &[Column], writer: W) -> Result<usize, ReportError> {
    let rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
    if let Some(bad) = columns.iter().find(|c| c.data.len() != rows) {
        return Err(ReportError::Misaligned {
            column: bad.name.clone(),
            expected: rows,
            found: bad.data.len(),
        });
    }

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
    for row in 0..rows {
        writer.write_record(columns.iter().map(|c| c.data.cell(row)))?;
    }
    writer.flush()?;
    Ok(rows)
}
