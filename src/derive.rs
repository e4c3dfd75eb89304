//! Derived cross rates
//!
//! A cross rate such as EUR/USD is obtained from two series sharing a quote
//! currency (EUR/PLN and USD/PLN) by dividing them date by date.

use crate::error::{FxError, Result};
use crate::types::{round4, RateSeries};

/// Divide `numerator` by `denominator` on every date both series quote.
///
/// Dates present in only one input are skipped. Each ratio is rounded to four
/// decimal places with [`round4`] (ties away from zero). A zero denominator on
/// a shared date is `FxError::DivisionUndefined`.
pub fn derive(numerator: &RateSeries, denominator: &RateSeries) -> Result<RateSeries> {
    numerator
        .iter()
        .filter_map(|(date, num)| denominator.get(date).map(|den| (*date, *num, *den)))
        .map(|(date, num, den)| {
            if den == 0.0 {
                Err(FxError::DivisionUndefined { date })
            } else {
                Ok((date, round4(num / den)))
            }
        })
        .collect()
}
