//! Statistics calculation engine.
//!
//! Computes derived values from stored records:
//! - Player efficiency metrics and the position-weighted performance index
//! - Order totals for carts and sales
//! - Aggregate sales statistics
//!
//! Everything here is pure. Loading the records is the caller's job.

mod player;
mod sales;

pub use player::*;
pub use sales::*;

/// `numerator / denominator`, or `default` when there is nothing to divide by.
///
/// Takes a raw counter or an already widened sum of counters.
pub fn ratio_or(numerator: f64, denominator: impl Into<f64>, default: f64) -> f64 {
    let denominator = denominator.into();
    if denominator == 0.0 {
        default
    } else {
        numerator / denominator
    }
}

/// `numerator / denominator`, or 0 when there is nothing to divide by.
pub fn ratio(numerator: f64, denominator: impl Into<f64>) -> f64 {
    ratio_or(numerator, denominator, 0.0)
}
