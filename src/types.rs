//! Core types and constants

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Calendar date keying every observation and table row
pub type DateKey = NaiveDate;

/// Mid-market rate (always positive)
pub type Rate = f64;

/// Date-ordered mapping of rates for one series
pub type RateSeries = BTreeMap<DateKey, Rate>;

/// Name of the key column in every persisted table
pub const DATE_COLUMN: &str = "Date";

/// Date format used on the wire and on disk
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fractional digits kept for derived ratios and persisted values
pub const DECIMAL_PLACES: usize = 4;

/// Round to four decimal places, ties away from zero (`f64::round`).
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
