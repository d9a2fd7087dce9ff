use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// One trading day's quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Zero when the source carries no volume.
    pub volume: Decimal,
}

/// Daily bars for a single ticker, oldest first.
///
/// Dates are strictly increasing. Missing days (weekends, holidays) are
/// simply absent; nothing is filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars in any order.
    ///
    /// Bars are sorted by date; when two bars share a date the later one in
    /// the input wins.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        // Stable sort keeps input order among equal dates.
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            if let Some(last) = deduped.last_mut() {
                if last.date == bar.date {
                    *last = bar;
                    continue;
                }
            }
            deduped.push(bar);
        }
        Self {
            ticker: ticker.into(),
            bars: deduped,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

// ---------------------------------------------------------------------------
// Derived Series
// ---------------------------------------------------------------------------

/// One point of a moving average, aligned to a price bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmaPoint {
    pub date: NaiveDate,
    /// `None` until a full window of closes is available.
    pub value: Option<Decimal>,
}

/// Simple moving average aligned position-for-position with a [`PriceSeries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmaSeries {
    pub window: usize,
    pub points: Vec<SmaPoint>,
}

impl SmaSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<Option<Decimal>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Number of positions holding a full-window average.
    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }

    /// Report column name, e.g. `10_SMA`.
    pub fn column_name(&self) -> String {
        format!("{}_SMA", self.window)
    }
}
