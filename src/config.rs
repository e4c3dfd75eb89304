//! Pipeline configuration
//!
//! Loaded from TOML. Every key is optional and falls back to the defaults
//! below, which reproduce the classic EUR/USD/CHF setup:
//!
//! ```toml
//! history_path = "all_currency_data.csv"
//! selection_path = "selected_currency_data.csv"
//! currencies = ["EUR", "USD", "CHF"]
//! ratios = [
//!     { numerator = "EUR", denominator = "USD" },
//!     { numerator = "CHF", denominator = "USD" },
//! ]
//! lookback_days = 90
//! schedule_at = "12:00"
//! ```

use crate::currency::{Currency, CurrencyPair};
use crate::error::{FxError, Result};
use crate::sources::nbp::{NBP_BASE_URL, NBP_MAX_SPAN_DAYS};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Currency every fetched rate is quoted in
pub const QUOTE_CURRENCY: Currency = Currency::PLN;

/// Configuration for one fetch-derive-merge cycle and its scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Append-only history of every tracked column
    pub history_path: PathBuf,
    /// Projection written by selection runs
    pub selection_path: PathBuf,
    /// Rate API root
    pub base_url: String,
    /// Currencies fetched each cycle, in column order
    pub currencies: Vec<Currency>,
    /// Derived cross rates, in column order after the fetched series
    pub ratios: Vec<CurrencyPair>,
    /// Days before today covered by each cycle
    pub lookback_days: i64,
    /// Longest inclusive range a single request may cover
    pub max_span_days: i64,
    pub request_timeout_secs: u64,
    pub lock_timeout_secs: u64,
    /// Local time of day for scheduled runs, `HH:MM`
    pub schedule_at: String,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("all_currency_data.csv"),
            selection_path: PathBuf::from("selected_currency_data.csv"),
            base_url: NBP_BASE_URL.to_string(),
            currencies: vec![Currency::EUR, Currency::USD, Currency::CHF],
            ratios: vec![
                CurrencyPair::new(Currency::EUR, Currency::USD),
                CurrencyPair::new(Currency::CHF, Currency::USD),
            ],
            lookback_days: 90,
            max_span_days: NBP_MAX_SPAN_DAYS,
            request_timeout_secs: 30,
            lock_timeout_secs: 10,
            schedule_at: "12:00".to_string(),
        }
    }
}

impl FxConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `~/.fx-history/config.toml`
    /// is used when present, otherwise the defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Default config location under the home directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fx-history").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            FxError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| FxError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text (not validated)
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| FxError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let err = |msg: String| Err(FxError::ConfigError(msg));

        if self.currencies.is_empty() {
            return err("at least one currency must be configured".to_string());
        }

        let mut seen = HashSet::new();
        for currency in &self.currencies {
            if !currency.is_published() {
                return err(format!("{} cannot be fetched; it is the quote currency", currency));
            }
            if !seen.insert(*currency) {
                return err(format!("currency {} is listed twice", currency));
            }
        }

        let mut seen_ratios = HashSet::new();
        for ratio in &self.ratios {
            if ratio.base == ratio.quote {
                return err(format!("ratio {} divides a currency by itself", ratio));
            }
            for leg in [ratio.base, ratio.quote] {
                if !seen.contains(&leg) {
                    return err(format!("ratio {} needs {} in currencies", ratio, leg));
                }
            }
            if !seen_ratios.insert(*ratio) {
                return err(format!("ratio {} is listed twice", ratio));
            }
        }

        if !(1..=NBP_MAX_SPAN_DAYS).contains(&self.max_span_days) {
            return err(format!("max_span_days must be between 1 and {}", NBP_MAX_SPAN_DAYS));
        }

        let span = self.lookback_days.checked_add(1);
        if self.lookback_days < 0 || span.map_or(true, |span| span > self.max_span_days) {
            return err(format!(
                "lookback_days must be between 0 and {}",
                self.max_span_days - 1
            ));
        }

        if self.request_timeout_secs == 0 || self.lock_timeout_secs == 0 {
            return err("timeouts must be greater than zero".to_string());
        }

        self.schedule_time()?;
        Ok(())
    }

    /// Column names of the history table, fetched series first
    pub fn columns(&self) -> Vec<String> {
        self.currencies
            .iter()
            .map(|c| CurrencyPair::new(*c, QUOTE_CURRENCY).column_name())
            .chain(self.ratios.iter().map(CurrencyPair::column_name))
            .collect()
    }

    /// Inclusive fetch range ending on `today`
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        ChronoDuration::try_days(self.lookback_days)
            .and_then(|back| today.checked_sub_signed(back))
            .map(|start| (start, today))
            .ok_or_else(|| {
                FxError::ConfigError(format!("lookback_days {} is out of range", self.lookback_days))
            })
    }

    /// Parsed `schedule_at`
    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.schedule_at.trim(), "%H:%M").map_err(|e| {
            FxError::ConfigError(format!("invalid schedule_at '{}': {}", self.schedule_at, e))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}
