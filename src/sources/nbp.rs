//! National Bank of Poland (NBP) table A rate source
//!
//! Endpoint: `{base}/exchangerates/rates/A/{CODE}/{start}/{end}/?format=json`.
//! The body carries a `rates` array of `{effectiveDate, mid}` entries, one per
//! business day.

use super::{validate_request, RateSource};
use crate::config::FxConfig;
use crate::currency::Currency;
use crate::error::{FxError, Result};
use crate::types::{RateSeries, DATE_FORMAT};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const NBP_BASE_URL: &str = "https://api.nbp.pl/api";

/// Maximum inclusive span of a single NBP rates query
pub const NBP_MAX_SPAN_DAYS: i64 = 93;

/// Marker the API puts in a 400 body when the span limit is exceeded
const SPAN_LIMIT_MARKER: &str = "Przekroczony limit";

/// NBP table A data source (no API key required)
pub struct NbpRateSource {
    base_url: String,
    max_span_days: i64,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct NbpResponse {
    rates: Vec<NbpRate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NbpRate {
    effective_date: String,
    mid: f64,
}

impl NbpRateSource {
    /// Create a new NBP source
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_span_days: i64) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_span_days,
            client,
        })
    }

    /// Create a source from the endpoint, timeout and span settings of `config`
    pub fn from_config(config: &FxConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            config.max_span_days,
        )
    }

    fn url_for(&self, currency: Currency, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/exchangerates/rates/A/{}/{}/{}/?format=json",
            self.base_url,
            currency.code(),
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        )
    }
}

impl RateSource for NbpRateSource {
    async fn fetch_rates(
        &self,
        currency: Currency,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries> {
        validate_request(currency, start, end, self.max_span_days)?;

        let transport = |message: String| FxError::Transport {
            currency: currency.to_string(),
            message,
        };

        let response = self
            .client
            .get(self.url_for(currency, start, end))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport(format!("Failed to read response: {}", e)))?;

        parse_response(currency, start, end, self.max_span_days, status, &body)
    }

    fn name(&self) -> &str {
        "nbp"
    }
}

/// Classify an NBP response and decode its rates.
pub(crate) fn parse_response(
    currency: Currency,
    start: NaiveDate,
    end: NaiveDate,
    max_span_days: i64,
    status: StatusCode,
    body: &str,
) -> Result<RateSeries> {
    let transport = |message: String| FxError::Transport {
        currency: currency.to_string(),
        message,
    };

    if status == StatusCode::NOT_FOUND {
        return Err(FxError::NotFound {
            currency: currency.to_string(),
            start,
            end,
        });
    }

    if status == StatusCode::BAD_REQUEST && body.contains(SPAN_LIMIT_MARKER) {
        return Err(FxError::RangeTooLarge {
            currency: currency.to_string(),
            start,
            end,
            max_days: max_span_days,
        });
    }

    if !status.is_success() {
        return Err(transport(format!("NBP returned {}: {}", status, body.trim())));
    }

    let response: NbpResponse = serde_json::from_str(body)
        .map_err(|e| transport(format!("Unexpected response schema: {}", e)))?;

    if response.rates.is_empty() {
        return Err(FxError::NotFound {
            currency: currency.to_string(),
            start,
            end,
        });
    }

    let mut series = RateSeries::new();
    for entry in response.rates {
        let date = NaiveDate::parse_from_str(&entry.effective_date, DATE_FORMAT).map_err(|e| {
            transport(format!("Invalid effectiveDate '{}': {}", entry.effective_date, e))
        })?;

        if !entry.mid.is_finite() || entry.mid <= 0.0 {
            return Err(transport(format!("Non-positive mid rate {} on {}", entry.mid, date)));
        }

        if series.insert(date, entry.mid).is_some() {
            return Err(transport(format!("Duplicate effectiveDate {}", date)));
        }
    }

    Ok(series)
}
