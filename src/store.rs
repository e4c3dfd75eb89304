//! Append-only rate history
//!
//! [`merge`] is the pure merge rule: rows newer than the latest stored date are
//! appended, everything else in the incoming table is dropped. Stored rows are
//! never rewritten, so re-running a cycle with the same data is a no-op.
//!
//! [`HistoryStore`] applies that rule to a CSV file. A merge holds an advisory
//! lock on a file next to the history for its whole duration and replaces the file through a
//! temporary file and a rename, so a failed merge leaves the previous file as
//! it was.

use crate::error::{FxError, Result};
use crate::table::{RateRow, RateTable, SelectionView};
use crate::types::DateKey;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of merging an incoming table into history
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Full history after the merge
    pub history: RateTable,
    /// Rows added to the history
    pub appended: usize,
    /// Incoming rows at or before the previous latest date
    pub dropped: usize,
    /// True when there was no history before this merge
    pub created: bool,
    /// Latest stored date before the merge
    pub previous_max: Option<DateKey>,
}

/// Merge `incoming` into `existing` history.
///
/// With no existing history the incoming table becomes the history. Otherwise
/// only incoming rows dated strictly after the latest stored date are
/// appended; older rows are dropped even when their values differ. Both tables
/// must carry the same set of columns (`FxError::SchemaMismatch`), though the
/// incoming column order may differ.
pub fn merge(existing: Option<&RateTable>, incoming: &RateTable) -> Result<MergeOutcome> {
    let Some(existing) = existing else {
        return Ok(MergeOutcome {
            history: incoming.clone(),
            appended: incoming.len(),
            dropped: 0,
            created: true,
            previous_max: None,
        });
    };

    let mapping = align_columns(existing.columns(), incoming.columns())?;
    let previous_max = existing.max_date();

    let (fresh, stale): (Vec<&RateRow>, Vec<&RateRow>) = incoming
        .rows()
        .iter()
        .partition(|row| previous_max.map_or(true, |max| row.date > max));

    let appended = fresh.len();
    let mut history = existing.clone();
    history.extend_sorted(
        fresh
            .into_iter()
            .map(|row| RateRow::new(row.date, mapping.iter().map(|&i| row.values[i]).collect())),
    );

    Ok(MergeOutcome {
        history,
        appended,
        dropped: stale.len(),
        created: false,
        previous_max,
    })
}

/// For each stored column, its index in the incoming table.
fn align_columns(stored: &[String], incoming: &[String]) -> Result<Vec<usize>> {
    let unexpected: Vec<&str> = incoming
        .iter()
        .filter(|c| !stored.contains(*c))
        .map(String::as_str)
        .collect();
    if !unexpected.is_empty() {
        return Err(FxError::SchemaMismatch(format!(
            "incoming columns not present in history: {}",
            unexpected.join(", ")
        )));
    }

    stored
        .iter()
        .map(|name| {
            incoming.iter().position(|c| c == name).ok_or_else(|| {
                FxError::SchemaMismatch(format!("incoming table lacks history column {}", name))
            })
        })
        .collect()
}

/// File-backed rate history
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl HistoryStore {
    /// Create a store over `path` with a ten second lock timeout
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: Duration::from_secs(10),
        }
    }

    /// Set how long a merge waits for a concurrent writer
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored history, `None` if it has never been written
    pub fn load(&self) -> Result<Option<RateTable>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FxError::storage(&self.path, e)),
        };

        RateTable::read_csv(BufReader::new(file), &self.path).map(Some)
    }

    /// Merge `incoming` into the stored history under an exclusive lock.
    ///
    /// The file is only rewritten when the merge adds rows or creates the
    /// history. On any error the file is left untouched.
    pub fn merge(&self, incoming: &RateTable) -> Result<MergeOutcome> {
        let _lock = HistoryLock::acquire(&self.path, self.lock_timeout)?;

        let existing = self.load()?;
        let outcome = merge(existing.as_ref(), incoming)?;

        if outcome.created || outcome.appended > 0 {
            write_table_atomic(&outcome.history, &self.path)?;
        }

        Ok(outcome)
    }
}

/// Overwrite the selection file with `view`
pub fn write_selection(view: &SelectionView, path: &Path) -> Result<()> {
    write_table_atomic(view, path)
}

/// Write `table` to a temporary file beside `path`, then rename it into place.
pub fn write_table_atomic(table: &RateTable, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FxError::storage(path, e))?;
    table
        .write_csv(&mut tmp)
        .map_err(|e| FxError::storage(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| FxError::storage(path, e))?;
    tmp.persist(path)
        .map_err(|e| FxError::storage(path, e.error))?;

    Ok(())
}

/// Exclusive writer lock: an advisory lock on `<history>.lock`.
///
/// The lock belongs to the open file handle, so the operating system releases
/// it when the guard drops or the process exits. The lock file itself stays on
/// disk; its presence alone never blocks a writer.
#[derive(Debug)]
struct HistoryLock {
    _file: File,
}

impl HistoryLock {
    fn acquire(target: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(target);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                FxError::storage(target, format!("cannot open lock file {}: {}", path.display(), e))
            })?;
        let deadline = Instant::now() + timeout;

        loop {
            match file.try_lock() {
                Ok(()) => return Ok(Self { _file: file }),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(FxError::storage(
                            target,
                            format!("another merge holds {}", path.display()),
                        ));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(TryLockError::Error(e)) => {
                    return Err(FxError::storage(
                        target,
                        format!("cannot lock {}: {}", path.display(), e),
                    ))
                }
            }
        }
    }
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
