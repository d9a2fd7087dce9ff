pub mod sma;

use rust_decimal::Decimal;

pub use sma::{simple_moving_average, sma_series, Sma};

/// An indicator fed one closing price at a time.
pub trait Indicator: Send + Sync {
    /// Push the next value; returns the output once enough values have been seen.
    fn next(&mut self, value: Decimal) -> Option<Decimal>;

    /// Forget all values seen so far.
    fn reset(&mut self);

    /// Values needed before the first output.
    fn period(&self) -> usize;

    fn is_ready(&self) -> bool;
}
