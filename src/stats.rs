//! Distributional summaries of table columns

use crate::error::{FxError, Result};
use crate::table::RateTable;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min};

/// Mean, median, min and max of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize the requested columns of `table`, in request order.
///
/// Columns are looked up by name. A column missing from the table is
/// `FxError::UnknownColumn`; a table without rows is `FxError::EmptySeries`.
/// The median of an even number of values is the mean of the middle two.
pub fn summarize(table: &RateTable, column_names: &[String]) -> Result<Vec<ColumnSummary>> {
    column_names
        .iter()
        .map(|name| {
            let values = table.column_values(name)?;
            summarize_values(name, values)
        })
        .collect()
}

fn summarize_values(column: &str, values: Vec<f64>) -> Result<ColumnSummary> {
    let count = values.len();
    if count == 0 {
        return Err(FxError::EmptySeries(column.to_string()));
    }

    let data = Data::new(values);
    let mean = data
        .mean()
        .ok_or_else(|| FxError::EmptySeries(column.to_string()))?;

    Ok(ColumnSummary {
        column: column.to_string(),
        count,
        mean,
        median: data.median(),
        min: data.min(),
        max: data.max(),
    })
}
