//! Fetch, derive, merge and select: one update cycle
//!
//! A cycle fetches every configured currency concurrently, waits for all of
//! them, derives the configured cross rates, assembles one dense table and
//! merges it into the history file. If any fetch fails the cycle stops before
//! touching the history.

use crate::config::{FxConfig, QUOTE_CURRENCY};
use crate::currency::{Currency, CurrencyPair};
use crate::derive::derive;
use crate::error::{FxError, Result};
use crate::sources::RateSource;
use crate::stats::{summarize, ColumnSummary};
use crate::store::{write_selection, HistoryStore, MergeOutcome};
use crate::table::{Assembly, RateTable, SelectionView};
use crate::types::{DateKey, RateSeries};
use chrono::NaiveDate;
use futures::future::try_join_all;
use std::collections::HashMap;

/// Summary of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Table assembled from this cycle's fetches
    pub table: RateTable,
    /// Dates some currency was missing on, left out of the table
    pub incomplete_dates: Vec<DateKey>,
    pub merge: MergeOutcome,
}

impl CycleOutcome {
    /// History after the merge
    pub fn history(&self) -> &RateTable {
        &self.merge.history
    }
}

/// History store configured from `config`
pub fn history_store(config: &FxConfig) -> HistoryStore {
    HistoryStore::new(config.history_path.clone()).with_lock_timeout(config.lock_timeout())
}

/// Run one cycle for the range ending on `today`.
pub async fn run_cycle<S: RateSource>(
    config: &FxConfig,
    source: &S,
    today: NaiveDate,
) -> Result<CycleOutcome> {
    let (start, end) = config.date_range(today)?;
    log::info!(
        "Fetching {} currencies from {} for {}..{}",
        config.currencies.len(),
        source.name(),
        start,
        end
    );

    let fetched = fetch_all(source, &config.currencies, start, end).await?;
    let assembly = build_table(config, fetched)?;
    if !assembly.incomplete_dates.is_empty() {
        log::debug!("Skipping {} dates not quoted for every currency", assembly.incomplete_dates.len());
    }

    let store = history_store(config);
    let merge = merge_blocking(store.clone(), assembly.table.clone()).await?;

    if merge.created {
        log::info!("Created {} with {} rows", store.path().display(), merge.appended);
    } else {
        log::info!(
            "Updated {}: {} rows appended, {} already recorded",
            store.path().display(),
            merge.appended,
            merge.dropped
        );
    }

    Ok(CycleOutcome {
        start,
        end,
        table: assembly.table,
        incomplete_dates: assembly.incomplete_dates,
        merge,
    })
}

/// Run one cycle, then project this cycle's table onto `columns` and write
/// the projection to the selection file.
pub async fn run_cycle_with_selection<S: RateSource>(
    config: &FxConfig,
    source: &S,
    today: NaiveDate,
    columns: &[String],
) -> Result<(CycleOutcome, SelectionView)> {
    check_columns(config, columns)?;

    let outcome = run_cycle(config, source, today).await?;
    let view = outcome.table.project(columns)?;
    write_selection(&view, &config.selection_path)?;
    log::info!("Wrote {} columns to {}", view.columns().len(), config.selection_path.display());

    Ok((outcome, view))
}

/// Summarize `columns` of the stored history without fetching.
pub fn report_history(config: &FxConfig, columns: &[String]) -> Result<Vec<ColumnSummary>> {
    let store = history_store(config);
    let history = store
        .load()?
        .ok_or_else(|| FxError::storage(store.path(), "no history has been recorded yet"))?;
    summarize(&history, columns)
}

/// Merge on the blocking pool; the lock wait and file I/O are synchronous.
async fn merge_blocking(store: HistoryStore, incoming: RateTable) -> Result<MergeOutcome> {
    let path = store.path().to_path_buf();
    tokio::task::spawn_blocking(move || store.merge(&incoming))
        .await
        .map_err(|e| FxError::storage(path, format!("merge task failed: {}", e)))?
}

/// Fetch all currencies concurrently; the first failure aborts the rest.
pub async fn fetch_all<S: RateSource>(
    source: &S,
    currencies: &[Currency],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(Currency, RateSeries)>> {
    let fetches = currencies.iter().map(|&currency| async move {
        let series = source.fetch_rates(currency, start, end).await?;
        log::debug!("{}: {} rates", currency, series.len());
        Ok::<_, FxError>((currency, series))
    });

    try_join_all(fetches).await
}

/// Assemble the fetched series and derived ratios into the history schema.
pub fn build_table(config: &FxConfig, fetched: Vec<(Currency, RateSeries)>) -> Result<Assembly> {
    let by_currency: HashMap<Currency, RateSeries> = fetched.into_iter().collect();
    let leg = |currency: Currency| {
        by_currency.get(&currency).ok_or_else(|| {
            FxError::InvalidInput(format!("no rates were fetched for {}", currency))
        })
    };

    let mut columns = Vec::with_capacity(config.currencies.len() + config.ratios.len());
    for currency in &config.currencies {
        let pair = CurrencyPair::new(*currency, QUOTE_CURRENCY);
        columns.push((pair.column_name(), leg(*currency)?.clone()));
    }
    for ratio in &config.ratios {
        let ratios = derive(leg(ratio.base)?, leg(ratio.quote)?)?;
        columns.push((ratio.column_name(), ratios));
    }

    RateTable::assemble(columns)
}

/// Split a comma separated column list, dropping spaces and uppercasing.
pub fn parse_column_list(input: &str) -> Result<Vec<String>> {
    let columns: Vec<String> = input
        .split(',')
        .map(|part| part.replace(' ', "").to_uppercase())
        .filter(|part| !part.is_empty())
        .collect();

    if columns.is_empty() {
        return Err(FxError::InvalidInput("no currency pairs provided".to_string()));
    }
    Ok(columns)
}

fn check_columns(config: &FxConfig, columns: &[String]) -> Result<()> {
    let known = config.columns();
    match columns.iter().find(|c| !known.contains(*c)) {
        Some(unknown) => Err(FxError::UnknownColumn(unknown.clone())),
        None => Ok(()),
    }
}
