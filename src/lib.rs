//! # fx-history
//!
//! Keeps an append-only history of NBP table A reference rates together with
//! derived cross rates, and summarizes selected columns.
//!
//! A cycle fetches each configured currency against PLN, derives ratios such
//! as EUR/USD from the PLN legs, and merges the rows newer than the stored
//! history into a CSV file. Re-running a cycle never rewrites recorded rows.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fx_history::prelude::*;
//!
//! # async fn run() -> fx_history::error::Result<()> {
//! let config = FxConfig::load(None)?;
//! let source = NbpRateSource::from_config(&config)?;
//! let today = chrono::Local::now().date_naive();
//!
//! let columns = vec!["EUR/USD".to_string()];
//! let (outcome, view) = run_cycle_with_selection(&config, &source, today, &columns).await?;
//! println!("{} rows appended", outcome.merge.appended);
//!
//! for summary in summarize(&view, &columns)? {
//!     println!("{}: mean {:.4}", summary.column, summary.mean);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod currency;
pub mod derive;
pub mod error;
pub mod pipeline;
pub mod schedule;
pub mod sources;
pub mod stats;
pub mod store;
pub mod table;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::config::FxConfig;
    pub use crate::currency::{Currency, CurrencyPair};
    pub use crate::derive::derive;
    pub use crate::error::{FxError, Result};
    pub use crate::pipeline::{run_cycle, run_cycle_with_selection, CycleOutcome};
    pub use crate::schedule::DailyAt;
    pub use crate::sources::{NbpRateSource, RateSource};
    pub use crate::stats::{summarize, ColumnSummary};
    pub use crate::store::{merge, HistoryStore, MergeOutcome};
    pub use crate::table::{RateRow, RateTable, SelectionView};
    pub use crate::types::*;
}
