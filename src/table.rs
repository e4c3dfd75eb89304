//! Date-keyed rate tables and their CSV form
//!
//! A [`RateTable`] holds one row per date, ascending, with exactly one value
//! per column. The constructors enforce this, so every table handed to the
//! store or the reporter is dense and duplicate-free.

use crate::error::{FxError, Result};
use crate::types::{DateKey, RateSeries, DATE_COLUMN, DATE_FORMAT, DECIMAL_PLACES};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::{BTreeSet, HashSet};
use std::io::{Read, Write};
use std::path::Path;

/// One table row: the date key and a value per column
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub date: DateKey,
    pub values: Vec<f64>,
}

impl RateRow {
    pub fn new(date: DateKey, values: Vec<f64>) -> Self {
        Self { date, values }
    }
}

/// Ordered, dense, date-keyed table of rate columns
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    columns: Vec<String>,
    rows: Vec<RateRow>,
}

/// Column-projected copy of a table
pub type SelectionView = RateTable;

/// Result of assembling a table from independently fetched series
#[derive(Debug, Clone)]
pub struct Assembly {
    pub table: RateTable,
    /// Dates quoted by some but not all series, left out of the table
    pub incomplete_dates: Vec<DateKey>,
}

impl RateTable {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Result<Self> {
        validate_columns(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a table from rows in any order.
    ///
    /// Rows are sorted by date; duplicate dates and rows whose width differs
    /// from the column count are rejected.
    pub fn from_rows(columns: Vec<String>, mut rows: Vec<RateRow>) -> Result<Self> {
        validate_columns(&columns)?;

        if let Some(row) = rows.iter().find(|r| r.values.len() != columns.len()) {
            return Err(FxError::InvalidInput(format!(
                "Row {} has {} values, expected {}",
                row.date,
                row.values.len(),
                columns.len()
            )));
        }

        rows.sort_by_key(|r| r.date);
        if let Some(pair) = rows.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(FxError::InvalidInput(format!("Duplicate date {}", pair[0].date)));
        }

        Ok(Self { columns, rows })
    }

    /// Build a table from named series, keeping only dates every series quotes.
    pub fn assemble(series: Vec<(String, RateSeries)>) -> Result<Assembly> {
        let columns: Vec<String> = series.iter().map(|(name, _)| name.clone()).collect();
        validate_columns(&columns)?;

        let all_dates: BTreeSet<DateKey> = series
            .iter()
            .flat_map(|(_, s)| s.keys().copied())
            .collect();

        let mut rows = Vec::new();
        let mut incomplete_dates = Vec::new();
        for date in all_dates {
            let values: Option<Vec<f64>> = series.iter().map(|(_, s)| s.get(&date).copied()).collect();
            match values {
                Some(values) => rows.push(RateRow::new(date, values)),
                None => incomplete_dates.push(date),
            }
        }

        Ok(Assembly {
            table: Self { columns, rows },
            incomplete_dates,
        })
    }

    /// Column names, excluding the date key
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in ascending date order
    pub fn rows(&self) -> &[RateRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest date in the table
    pub fn min_date(&self) -> Option<DateKey> {
        self.rows.first().map(|r| r.date)
    }

    /// Latest date in the table
    pub fn max_date(&self) -> Option<DateKey> {
        self.rows.last().map(|r| r.date)
    }

    /// Dates in ascending order
    pub fn dates(&self) -> impl Iterator<Item = DateKey> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in date order
    pub fn column_values(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| FxError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Value of one column on one date
    pub fn value(&self, date: DateKey, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        let pos = self.rows.binary_search_by_key(&date, |r| r.date).ok()?;
        Some(self.rows[pos].values[idx])
    }

    /// Copy of the table restricted to `columns`, in the order given
    pub fn project(&self, columns: &[String]) -> Result<SelectionView> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| FxError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut selected = Vec::new();
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for (name, idx) in columns.iter().zip(indices) {
            if seen.insert(name.as_str()) {
                selected.push(name.clone());
                kept.push(idx);
            }
        }

        let rows = self
            .rows
            .iter()
            .map(|r| RateRow::new(r.date, kept.iter().map(|&i| r.values[i]).collect()))
            .collect();

        Ok(Self {
            columns: selected,
            rows,
        })
    }

    /// Append rows already known to be newer than the last row
    pub(crate) fn extend_sorted(&mut self, rows: impl IntoIterator<Item = RateRow>) {
        self.rows.extend(rows);
    }

    /// Parse a table from CSV. Any structural problem is `CorruptHistory`
    /// attributed to `origin`.
    ///
    /// Values must be plain decimals with at most four fractional digits, the
    /// precision [`RateTable::write_csv`] reproduces exactly.
    pub fn read_csv<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| FxError::corrupt(origin, format!("Failed to read header: {}", e)))?
            .clone();

        let mut fields = headers.iter();
        match fields.next() {
            Some(first) if first == DATE_COLUMN => {}
            Some("") | None => return Err(FxError::corrupt(origin, "Missing header row")),
            Some(other) => {
                return Err(FxError::corrupt(
                    origin,
                    format!("First column must be '{}', found '{}'", DATE_COLUMN, other),
                ))
            }
        }
        let columns: Vec<String> = fields.map(str::to_string).collect();
        validate_columns(&columns).map_err(|e| FxError::corrupt(origin, e))?;

        let mut rows: Vec<RateRow> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let line = line + 2;
            let record = result
                .map_err(|e| FxError::corrupt(origin, format!("Line {}: {}", line, e)))?;

            let date_str = record.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|_| {
                FxError::corrupt(origin, format!("Line {}: invalid date '{}'", line, date_str))
            })?;

            let values = record
                .iter()
                .skip(1)
                .map(|field| {
                    parse_value(field).ok_or_else(|| {
                        FxError::corrupt(
                            origin,
                            format!(
                                "Line {}: invalid value '{}' (expected at most {} decimals)",
                                line, field, DECIMAL_PLACES
                            ),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            if let Some(prev) = rows.last() {
                if prev.date >= date {
                    return Err(FxError::corrupt(
                        origin,
                        format!("Line {}: date {} does not follow {}", line, date, prev.date),
                    ));
                }
            }

            rows.push(RateRow::new(date, values));
        }

        Ok(Self { columns, rows })
    }

    /// Write the table as CSV with four fractional digits per value
    pub fn write_csv<W: Write>(&self, writer: W) -> std::result::Result<(), csv::Error> {
        let mut wtr = WriterBuilder::new().from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(DATE_COLUMN);
        header.extend(self.columns.iter().map(String::as_str));
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.date.format(DATE_FORMAT).to_string());
            record.extend(
                row.values
                    .iter()
                    .map(|v| format!("{:.*}", DECIMAL_PLACES, v)),
            );
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

/// Parse a stored rate written as `[-]digits[.digits]`
fn parse_value(field: &str) -> Option<f64> {
    let unsigned = field.strip_prefix('-').unwrap_or(field);
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if int.is_empty() || !is_digits(int) || !is_digits(frac) || frac.len() > DECIMAL_PLACES {
        return None;
    }
    field.parse().ok()
}

fn validate_columns(columns: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in columns {
        if name.trim().is_empty() {
            return Err(FxError::InvalidInput("Empty column name".to_string()));
        }
        if name == DATE_COLUMN {
            return Err(FxError::InvalidInput(format!(
                "'{}' is reserved for the date key",
                DATE_COLUMN
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(FxError::InvalidInput(format!("Duplicate column {}", name)));
        }
    }
    Ok(())
}
