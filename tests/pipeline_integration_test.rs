//! Integration tests for the update cycle
//!
//! Uses an in-memory rate source and a temporary history file.

use chrono::NaiveDate;
use fx_history::pipeline::{report_history, run_cycle, run_cycle_with_selection};
use fx_history::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Rate source serving fixed series, or a fixed error per currency
struct InMemorySource {
    series: Mutex<HashMap<Currency, RateSeries>>,
    failing: Mutex<Option<Currency>>,
    calls: AtomicUsize,
}

impl InMemorySource {
    fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
            failing: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    fn set(&self, currency: Currency, rates: &[(NaiveDate, f64)]) {
        self.series
            .lock()
            .unwrap()
            .insert(currency, rates.iter().copied().collect());
    }

    fn fail(&self, currency: Option<Currency>) {
        *self.failing.lock().unwrap() = currency;
    }
}

impl RateSource for InMemorySource {
    async fn fetch_rates(
        &self,
        currency: Currency,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if *self.failing.lock().unwrap() == Some(currency) {
            return Err(FxError::Transport {
                currency: currency.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let series: RateSeries = self
            .series
            .lock()
            .unwrap()
            .get(&currency)
            .map(|s| s.range(start..=end).map(|(d, r)| (*d, *r)).collect())
            .unwrap_or_default();

        if series.is_empty() {
            return Err(FxError::NotFound {
                currency: currency.to_string(),
                start,
                end,
            });
        }
        Ok(series)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn config_in(dir: &TempDir) -> FxConfig {
    FxConfig {
        history_path: dir.path().join("all_currency_data.csv"),
        selection_path: dir.path().join("selected_currency_data.csv"),
        lookback_days: 30,
        ..FxConfig::default()
    }
}

fn seed(source: &InMemorySource, days: &[u32]) {
    let rates = |base: f64| -> Vec<(NaiveDate, f64)> {
        days.iter()
            .map(|&day| (d(day), base + day as f64 / 1000.0))
            .collect()
    };
    source.set(Currency::EUR, &rates(4.30));
    source.set(Currency::USD, &rates(3.95));
    source.set(Currency::CHF, &rates(4.50));
}

#[tokio::test]
async fn test_first_cycle_creates_history() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    seed(&source, &[4, 5, 6, 7, 8]);

    let outcome = run_cycle(&config, &source, d(8)).await.unwrap();

    assert!(outcome.merge.created);
    assert_eq!(outcome.merge.appended, 5);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);

    let text = fs::read_to_string(&config.history_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Date,EUR/PLN,USD/PLN,CHF/PLN,EUR/USD,CHF/USD"));
    assert_eq!(lines.next(), Some("2024-03-04,4.3040,3.9540,4.5040,1.0885,1.1391"));
    assert_eq!(text.lines().count(), 6);
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_new_days_append() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    seed(&source, &[4, 5, 6]);

    run_cycle(&config, &source, d(6)).await.unwrap();
    let before = fs::read_to_string(&config.history_path).unwrap();

    let rerun = run_cycle(&config, &source, d(6)).await.unwrap();
    assert_eq!(rerun.merge.appended, 0);
    assert_eq!(rerun.merge.dropped, 3);
    assert_eq!(fs::read_to_string(&config.history_path).unwrap(), before);

    // Upstream revises an old day and publishes two new ones
    seed(&source, &[4, 5, 6, 7, 8]);
    source.set(Currency::EUR, &[(d(5), 9.99), (d(7), 4.307), (d(8), 4.308)]);
    let next = run_cycle(&config, &source, d(8)).await.unwrap();

    assert_eq!(next.merge.appended, 2);
    let history = HistoryStore::new(&config.history_path).load().unwrap().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.value(d(5), "EUR/PLN"), Some(4.305));
    assert_eq!(history.value(d(8), "EUR/PLN"), Some(4.308));
    assert!(fs::read_to_string(&config.history_path)
        .unwrap()
        .starts_with(&before));
}

#[tokio::test]
async fn test_failed_fetch_aborts_before_merge() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    seed(&source, &[4, 5]);

    run_cycle(&config, &source, d(5)).await.unwrap();
    let before = fs::read_to_string(&config.history_path).unwrap();

    seed(&source, &[4, 5, 6]);
    source.fail(Some(Currency::USD));
    let result = run_cycle(&config, &source, d(6)).await;

    assert!(matches!(result, Err(FxError::Transport { currency, .. }) if currency == "USD"));
    assert_eq!(fs::read_to_string(&config.history_path).unwrap(), before);
}

#[tokio::test]
async fn test_empty_range_is_not_found() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    seed(&source, &[4, 5]);

    // Nothing published in the 30 days up to 2024-01-31
    let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let result = run_cycle(&config, &source, today).await;

    assert!(matches!(result, Err(FxError::NotFound { .. })));
    assert!(!config.history_path.exists());
}

#[tokio::test]
async fn test_selection_and_summary() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    source.set(Currency::EUR, &[(d(4), 1.10), (d(5), 1.12), (d(6), 1.08), (d(7), 1.15)]);
    source.set(Currency::USD, &[(d(4), 1.0), (d(5), 1.0), (d(6), 1.0), (d(7), 1.0)]);
    source.set(Currency::CHF, &[(d(4), 1.2), (d(5), 1.2), (d(6), 1.2), (d(7), 1.2)]);

    let columns = vec!["EUR/USD".to_string()];
    let (outcome, view) = run_cycle_with_selection(&config, &source, d(7), &columns)
        .await
        .unwrap();

    assert_eq!(outcome.merge.appended, 4);
    assert_eq!(view.columns(), &columns[..]);
    assert_eq!(
        fs::read_to_string(&config.selection_path).unwrap(),
        "Date,EUR/USD\n2024-03-04,1.1000\n2024-03-05,1.1200\n2024-03-06,1.0800\n2024-03-07,1.1500\n"
    );

    let summary = summarize(&view, &columns).unwrap();
    assert!((summary[0].mean - 1.1125).abs() < 1e-9);
    assert!((summary[0].median - 1.11).abs() < 1e-9);
    assert_eq!(summary[0].min, 1.08);
    assert_eq!(summary[0].max, 1.15);

    let stored = report_history(&config, &columns).unwrap();
    assert_eq!(stored, summary);
}

#[tokio::test]
async fn test_unknown_selection_column_fails_before_fetching() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    seed(&source, &[4]);

    let result =
        run_cycle_with_selection(&config, &source, d(4), &["GBP/USD".to_string()]).await;

    assert!(matches!(result, Err(FxError::UnknownColumn(name)) if name == "GBP/USD"));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert!(!config.history_path.exists());
}

#[tokio::test]
async fn test_schema_change_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let source = InMemorySource::new();
    seed(&source, &[4, 5]);
    run_cycle(&config, &source, d(5)).await.unwrap();

    let wider = FxConfig {
        currencies: vec![Currency::EUR, Currency::USD, Currency::CHF, Currency::GBP],
        ..config.clone()
    };
    source.set(Currency::GBP, &[(d(6), 5.0)]);
    seed(&source, &[4, 5, 6]);

    let result = run_cycle(&wider, &source, d(6)).await;
    assert!(matches!(result, Err(FxError::SchemaMismatch(_))));
}

#[test]
fn test_report_without_history() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let result = report_history(&config, &["EUR/USD".to_string()]);
    assert!(matches!(result, Err(FxError::StorageUnavailable { .. })));
}

#[tokio::test]
async fn test_selection_covers_only_this_cycles_window() {
    let dir = TempDir::new().unwrap();
    let config = FxConfig {
        lookback_days: 5,
        ..config_in(&dir)
    };
    let jan = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    let window = |month: u32, rate: f64| -> Vec<(NaiveDate, f64)> {
        (5..=10)
            .map(|day| (NaiveDate::from_ymd_opt(2024, month, day).unwrap(), rate))
            .collect()
    };

    let source = InMemorySource::new();
    let mut eur = window(1, 6.0);
    eur.extend(window(3, 4.0));
    let mut flat = window(1, 1.0);
    flat.extend(window(3, 1.0));
    source.set(Currency::EUR, &eur);
    source.set(Currency::USD, &flat);
    source.set(Currency::CHF, &flat);

    run_cycle(&config, &source, jan(10)).await.unwrap();

    let columns = vec!["EUR/PLN".to_string()];
    let (outcome, view) = run_cycle_with_selection(&config, &source, d(10), &columns)
        .await
        .unwrap();

    assert_eq!(outcome.start, d(5));
    assert_eq!(outcome.history().len(), 12);
    assert_eq!(view.len(), 6);
    assert_eq!(view.min_date(), Some(d(5)));

    let window_summary = summarize(&view, &columns).unwrap();
    assert_eq!(window_summary[0].count, 6);
    assert!((window_summary[0].mean - 4.0).abs() < 1e-9);
    assert_eq!(window_summary[0].max, 4.0);

    let stored = report_history(&config, &columns).unwrap();
    assert_eq!(stored[0].count, 12);
    assert!((stored[0].mean - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_lock_wait_does_not_block_the_runtime() {
    let dir = TempDir::new().unwrap();
    let config = FxConfig {
        lock_timeout_secs: 1,
        ..config_in(&dir)
    };
    let source = InMemorySource::new();
    seed(&source, &[4, 5]);

    let mut lock_name = config.history_path.clone().into_os_string();
    lock_name.push(".lock");
    let held = fs::File::create(&lock_name).unwrap();
    held.lock().unwrap();

    let timer_fired = tokio::select! {
        _ = run_cycle(&config, &source, d(5)) => false,
        _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => true,
    };
    assert!(timer_fired);

    drop(held);
    assert!(run_cycle(&config, &source, d(5)).await.is_ok());
}
