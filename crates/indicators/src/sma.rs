use crate::Indicator;
use pricelens_core::{ConfigError, PriceSeries, SmaPoint, SmaSeries};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    len: usize,
    buffer: VecDeque<Decimal>,
    sum: Decimal,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            len: period,
            buffer: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
        }
    }

    /// Like [`Sma::new`], but reports a zero period instead of panicking.
    pub fn try_new(period: usize) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::InvalidWindow(period));
        }
        Ok(Self::new(period))
    }

    /// Get the current SMA value without feeding new data.
    pub fn value(&self) -> Option<Decimal> {
        if self.buffer.len() == self.len {
            Some(self.sum / Decimal::from(self.len))
        } else {
            None
        }
    }
}

impl Indicator for Sma {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.sum += value;
        self.buffer.push_back(value);

        if self.buffer.len() > self.len {
            if let Some(removed) = self.buffer.pop_front() {
                self.sum -= removed;
            }
        }

        self.value()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.sum = Decimal::ZERO;
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.len
    }
}

/// Trailing simple moving average over `values`.
///
/// The output has the same length as the input. Position `i` holds the mean
/// of `values[i + 1 - window..=i]`; the first `window - 1` positions are
/// `None`. There is no partial-window averaging, so fewer than `window`
/// values produce all `None` and an empty input produces an empty output.
pub fn simple_moving_average(
    values: &[Decimal],
    window: usize,
) -> Result<Vec<Option<Decimal>>, ConfigError> {
    let mut sma = Sma::try_new(window)?;
    Ok(values.iter().map(|v| sma.next(*v)).collect())
}

/// SMA of the closing prices, paired with each bar's date.
pub fn sma_series(prices: &PriceSeries, window: usize) -> Result<SmaSeries, ConfigError> {
    let values = simple_moving_average(&prices.closes(), window)?;
    let points = prices
        .bars()
        .iter()
        .zip(values)
        .map(|(bar, value)| SmaPoint {
            date: bar.date,
            value,
        })
        .collect();
    Ok(SmaSeries { window, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use pricelens_core::PriceBar;
    use rust_decimal_macros::dec;

    fn decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    /// Mean of the window ending at `i`, computed directly.
    fn window_mean(values: &[Decimal], i: usize, window: usize) -> Decimal {
        let slice = &values[i + 1 - window..=i];
        slice.iter().copied().sum::<Decimal>() / Decimal::from(window)
    }

    #[test]
    fn test_sma_basic() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.next(dec!(1)), None);
        assert_eq!(sma.next(dec!(2)), None);
        assert_eq!(sma.next(dec!(3)), Some(dec!(2)));
        assert_eq!(sma.next(dec!(4)), Some(dec!(3)));
        assert_eq!(sma.next(dec!(5)), Some(dec!(4)));
    }

    #[test]
    fn test_sma_reset() {
        let mut sma = Sma::new(2);
        sma.next(dec!(10));
        sma.next(dec!(20));
        sma.reset();
        assert!(!sma.is_ready());
        assert_eq!(sma.next(dec!(5)), None);
        assert_eq!(sma.next(dec!(15)), Some(dec!(10)));
    }

    #[test]
    fn test_try_new_rejects_zero() {
        assert!(matches!(Sma::try_new(0), Err(ConfigError::InvalidWindow(0))));
        assert_eq!(Sma::try_new(4).unwrap().period(), 4);
    }

    #[test]
    fn test_full_window_of_ten() {
        let closes = decimals(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let out = simple_moving_average(&closes, 10).unwrap();
        let mut expected = vec![None; 9];
        expected.push(Some(dec!(5.5)));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_window_of_two() {
        let out = simple_moving_average(&decimals(&[2, 4, 6]), 2).unwrap();
        assert_eq!(out, vec![None, Some(dec!(3)), Some(dec!(5))]);
    }

    #[test]
    fn test_empty_input() {
        assert!(simple_moving_average(&[], 10).unwrap().is_empty());
        assert!(simple_moving_average(&[], 1).unwrap().is_empty());
    }

    #[test]
    fn test_window_longer_than_input() {
        let out = simple_moving_average(&decimals(&[5, 6, 7]), 10).unwrap();
        assert_eq!(out, vec![None, None, None]);
    }

    #[test]
    fn test_zero_window_is_config_error() {
        let err = simple_moving_average(&decimals(&[1, 2]), 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow(0)));
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let closes = vec![dec!(1.25), dec!(3.5), dec!(2)];
        let out = simple_moving_average(&closes, 1).unwrap();
        assert_eq!(out, closes.into_iter().map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn test_matches_direct_mean() {
        let closes: Vec<Decimal> = (0..60)
            .map(|i| Decimal::new(15_000 + (i * 37 % 101) * 13 - (i % 7) * 29, 2))
            .collect();
        let tolerance = dec!(0.000000001);
        for window in [1, 2, 3, 7, 10, 20, 59, 60, 61] {
            let out = simple_moving_average(&closes, window).unwrap();
            assert_eq!(out.len(), closes.len());
            for (i, value) in out.iter().enumerate() {
                if i + 1 < window {
                    assert_eq!(*value, None, "window {window} index {i}");
                } else {
                    let got = value.expect("defined after a full window");
                    let want = window_mean(&closes, i, window);
                    assert!((got - want).abs() < tolerance, "window {window} index {i}");
                }
            }
        }
    }

    #[test]
    fn test_pure_and_idempotent() {
        let closes = vec![dec!(189.84), dec!(190.12), dec!(187.5), dec!(188.03)];
        let snapshot = closes.clone();
        let first = simple_moving_average(&closes, 3).unwrap();
        let second = simple_moving_average(&closes, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(closes, snapshot);
    }

    #[test]
    fn test_sma_series_aligns_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = (0..4u64)
            .map(|i| PriceBar {
                date: start + Days::new(i),
                open: dec!(0),
                high: dec!(0),
                low: dec!(0),
                close: Decimal::from(2 * (i + 1)),
                volume: dec!(0),
            })
            .collect();
        let prices = PriceSeries::new("TEST", bars);
        let sma = sma_series(&prices, 2).unwrap();

        assert_eq!(sma.window, 2);
        assert_eq!(sma.len(), prices.len());
        assert_eq!(sma.values(), vec![None, Some(dec!(3)), Some(dec!(5)), Some(dec!(7))]);
        for (point, bar) in sma.points.iter().zip(prices.bars()) {
            assert_eq!(point.date, bar.date);
        }
    }
}
