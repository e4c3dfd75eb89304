//! Currency codes and currency pairs

use crate::error::FxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency enumeration (ISO 4217 codes published in NBP table A, plus PLN)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    /// Polish Zloty, the quote currency of every table A rate
    PLN,
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// Swiss Franc
    CHF,
    /// British Pound Sterling
    GBP,
    /// Japanese Yen
    JPY,
    /// Australian Dollar
    AUD,
    /// Canadian Dollar
    CAD,
    /// New Zealand Dollar
    NZD,
    /// Chinese Yuan
    CNY,
    /// Hong Kong Dollar
    HKD,
    /// Singapore Dollar
    SGD,
    /// Swedish Krona
    SEK,
    /// Norwegian Krone
    NOK,
    /// Danish Krone
    DKK,
    /// Czech Koruna
    CZK,
    /// Hungarian Forint
    HUF,
    /// Turkish Lira
    TRY,
    /// Ukrainian Hryvnia
    UAH,
}

impl Currency {
    /// Get ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::PLN => "PLN",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::CHF => "CHF",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::NZD => "NZD",
            Currency::CNY => "CNY",
            Currency::HKD => "HKD",
            Currency::SGD => "SGD",
            Currency::SEK => "SEK",
            Currency::NOK => "NOK",
            Currency::DKK => "DKK",
            Currency::CZK => "CZK",
            Currency::HUF => "HUF",
            Currency::TRY => "TRY",
            Currency::UAH => "UAH",
        }
    }

    /// Parse from ISO code, case-insensitive
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Whether the NBP publishes a mid rate for this currency.
    /// PLN is the quote side of every rate and has no series of its own.
    pub fn is_published(&self) -> bool {
        *self != Currency::PLN
    }

    /// Get all supported currencies
    pub fn all() -> Vec<Currency> {
        vec![
            Currency::PLN,
            Currency::USD,
            Currency::EUR,
            Currency::CHF,
            Currency::GBP,
            Currency::JPY,
            Currency::AUD,
            Currency::CAD,
            Currency::NZD,
            Currency::CNY,
            Currency::HKD,
            Currency::SGD,
            Currency::SEK,
            Currency::NOK,
            Currency::DKK,
            Currency::CZK,
            Currency::HUF,
            Currency::TRY,
            Currency::UAH,
        ]
    }
}

impl FromStr for Currency {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| FxError::InvalidInput(format!("Unknown currency code: {}", s)))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Currency pair, rendered as `BASE/QUOTE`.
///
/// Used both for the fetched series (`EUR/PLN`) and for derived cross rates
/// (`EUR/USD` = `EUR/PLN` divided by `USD/PLN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    #[serde(alias = "numerator")]
    pub base: Currency,
    #[serde(alias = "denominator")]
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create new currency pair
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// Column name used in the history table
    pub fn column_name(&self) -> String {
        self.to_string()
    }
}

impl FromStr for CurrencyPair {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| FxError::InvalidInput(format!("Expected BASE/QUOTE, got: {}", s)))?;
        Ok(Self::new(base.parse()?, quote.parse()?))
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code() {
        assert_eq!(Currency::USD.code(), "USD");
        assert_eq!(Currency::EUR.code(), "EUR");
        assert_eq!(Currency::PLN.code(), "PLN");
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("CHF"), Some(Currency::CHF));
        assert_eq!(Currency::from_code("usd"), Some(Currency::USD));
        assert_eq!(Currency::from_code("INVALID"), None);
        assert!("XXX".parse::<Currency>().is_err());
    }

    #[test]
    fn test_only_pln_is_unpublished() {
        let unpublished: Vec<_> = Currency::all()
            .into_iter()
            .filter(|c| !c.is_published())
            .collect();
        assert_eq!(unpublished, vec![Currency::PLN]);
    }

    #[test]
    fn test_currency_pair_display_and_parse() {
        let pair = CurrencyPair::new(Currency::EUR, Currency::USD);
        assert_eq!(pair.column_name(), "EUR/USD");
        assert_eq!("chf/usd".parse::<CurrencyPair>().unwrap(), CurrencyPair::new(Currency::CHF, Currency::USD));
        assert!("EURUSD".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn test_currency_pair_deserializes_ratio_aliases() {
        let pair: CurrencyPair =
            serde_json::from_str(r#"{"numerator":"EUR","denominator":"USD"}"#).unwrap();
        assert_eq!(pair, CurrencyPair::new(Currency::EUR, Currency::USD));
    }
}
