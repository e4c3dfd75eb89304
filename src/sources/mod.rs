//! Rate sources
//!
//! A rate source answers one question: the mid rates published for a single
//! currency over an inclusive date range. The only production source is the
//! National Bank of Poland table A API ([`NbpRateSource`]); tests plug in
//! in-memory sources through the same [`RateSource`] trait.

pub mod nbp;

pub use nbp::NbpRateSource;

use crate::currency::Currency;
use crate::error::{FxError, Result};
use crate::types::RateSeries;
use chrono::NaiveDate;
use std::future::Future;

/// Trait for sources of daily reference rates
pub trait RateSource: Send + Sync {
    /// Fetch mid rates for `currency` between `start` and `end` (inclusive).
    ///
    /// Non-business days are simply absent from the result. A range with no
    /// published rates at all is `FxError::NotFound`, never an empty map.
    fn fetch_rates(
        &self,
        currency: Currency,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<RateSeries>> + Send;

    /// Get the source name
    fn name(&self) -> &str;
}

/// Check a fetch request before it reaches the network.
pub fn validate_request(
    currency: Currency,
    start: NaiveDate,
    end: NaiveDate,
    max_span_days: i64,
) -> Result<()> {
    if !currency.is_published() {
        return Err(FxError::InvalidInput(format!(
            "{} is the quote currency and has no rate series",
            currency
        )));
    }

    if start > end {
        return Err(FxError::InvalidInput(format!(
            "Start date {} is after end date {}",
            start, end
        )));
    }

    let span_days = (end - start).num_days() + 1;
    if span_days > max_span_days {
        return Err(FxError::RangeTooLarge {
            currency: currency.to_string(),
            start,
            end,
            max_days: max_span_days,
        });
    }

    Ok(())
}
