//! Line charts of a closing price and its moving average.
//!
//! Output format follows the file extension: `.svg` writes an SVG document,
//! anything else a PNG bitmap.

use chrono::{Days, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use pricelens_core::{PriceSeries, SmaSeries};
use rust_decimal::prelude::ToPrimitive;
use std::ops::Range;
use std::path::Path;

/// Errors that can occur while rendering a chart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("No plottable values in any series")]
    NoData,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Render error: {0}")]
    RenderError(String),
}

/// Line appearance.
#[derive(Debug, Clone, Copy)]
pub struct SeriesStyle {
    pub color: RGBColor,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,
    pub width: u32,
}

/// One labelled line. `None` values leave a gap.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
    pub style: SeriesStyle,
}

/// Canvas size, title and axis labels.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: "Date".to_string(),
            y_label: "Price (USD)".to_string(),
            width: 1200,
            height: 600,
        }
    }
}

/// The closing price (translucent blue) and the SMA (bold red).
pub fn price_and_sma_series(prices: &PriceSeries, sma: &SmaSeries) -> Vec<ChartSeries> {
    let close = prices
        .bars()
        .iter()
        .map(|b| (b.date, b.close.to_f64()))
        .collect();
    let average = sma
        .points
        .iter()
        .map(|p| (p.date, p.value.and_then(|v| v.to_f64())))
        .collect();

    vec![
        ChartSeries {
            label: "Closing Price".to_string(),
            points: close,
            style: SeriesStyle {
                color: BLUE,
                opacity: 0.5,
                width: 1,
            },
        },
        ChartSeries {
            label: format!("{}-Day SMA", sma.window),
            points: average,
            style: SeriesStyle {
                color: RED,
                opacity: 1.0,
                width: 2,
            },
        },
    ]
}

/// Draw `series` and write the image to `path`, replacing any existing file.
///
/// If drawing fails after the file was opened, the file is removed rather
/// than left truncated.
pub fn render(series: &[ChartSeries], spec: &ChartSpec, path: &Path) -> Result<(), ChartError> {
    let x_range = date_bounds(series).ok_or(ChartError::NoData)?;
    let y_range = value_bounds(series).ok_or(ChartError::NoData)?;

    // Surface unwritable paths as IO errors; the backends only touch the
    // file when the drawing is presented.
    std::fs::File::create(path)?;

    let size = (spec.width, spec.height);
    let is_svg = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    // Backends flush on drop, so each one is dropped before cleanup runs.
    let drawn = if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw(&root, series, spec, x_range, y_range)
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw(&root, series, spec, x_range, y_range)
    };
    discard_on_error(path, drawn)?;

    tracing::debug!(path = %path.display(), series = series.len(), "Rendered chart");
    Ok(())
}

fn discard_on_error(path: &Path, drawn: Result<(), ChartError>) -> Result<(), ChartError> {
    if drawn.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove partial chart");
        }
    }
    drawn
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &[ChartSeries],
    spec: &ChartSpec,
    x_range: Range<NaiveDate>,
    y_range: Range<f64>,
) -> Result<(), ChartError> {
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(12)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.2))
        .draw()
        .map_err(render_error)?;

    for s in series {
        let style = s.style.color.mix(s.style.opacity).stroke_width(s.style.width);
        let mut labelled = false;
        for segment in segments(&s.points) {
            let annotation = chart
                .draw_series(LineSeries::new(segment, style))
                .map_err(render_error)?;
            if !labelled {
                annotation
                    .label(s.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                labelled = true;
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

fn render_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> ChartError {
    ChartError::RenderError(err.to_string())
}

/// Split a series into runs of consecutive defined points.
pub fn segments(points: &[(NaiveDate, Option<f64>)]) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (date, value) in points {
        match value {
            Some(v) if v.is_finite() => current.push((*date, *v)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn defined_points(series: &[ChartSeries]) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    series
        .iter()
        .flat_map(|s| s.points.iter())
        .filter_map(|(d, v)| v.filter(|v| v.is_finite()).map(|v| (*d, v)))
}

/// X axis span over defined points, at least one day wide.
fn date_bounds(series: &[ChartSeries]) -> Option<Range<NaiveDate>> {
    let mut dates = defined_points(series).map(|(d, _)| d);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    let max = if max == min {
        max.checked_add_days(Days::new(1)).unwrap_or(max)
    } else {
        max
    };
    Some(min..max)
}

/// Y axis span over defined points with 5% headroom on each side.
fn value_bounds(series: &[ChartSeries]) -> Option<Range<f64>> {
    let mut values = defined_points(series).map(|(_, v)| v);
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    Some((min - pad)..(max + pad))
}
