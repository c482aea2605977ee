//! # Cleaning Module
//!
//! The two user-triggered cleaning operations. Both mutate the table in place and cannot
//! fail; repeating either one leaves the table as it is.

use crate::table::value::Value;
use crate::table::Table;
use std::collections::HashSet;
use tracing::info;
use tracing::warn;

/// Outcome of [`fill_missing_with_mean`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FillReport {
    /// Numeric columns that had missing cells, with the mean written into them and how many
    /// cells were filled
    pub filled: Vec<(String, f64, usize)>,
    /// Numeric columns without any present value, left missing
    pub skipped: Vec<String>,
}

impl FillReport {
    /// Total number of cells written.
    pub fn cells(&self) -> usize {
        self.filled.iter().map(|(_, _, cells)| cells).sum()
    }
}

/// Removes every row equal to an earlier row, keeping first occurrences in order.
/// Returns the number of rows removed.
pub fn remove_duplicates(table: &mut Table) -> usize {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(table.rows.len());
        table.rows.iter().map(|row| seen.insert(row.as_slice())).collect()
    };
    let before = table.rows.len();
    let mut flags = keep.into_iter();
    table.rows.retain(|_| flags.next().unwrap_or(true));
    let removed = before - table.rows.len();
    info!(table = %table.name, removed, "removed duplicate rows");
    removed
}

/// Overwrites missing cells of every numeric column with the mean of the column's present
/// values. Non-numeric columns and present cells are never touched.
///
/// A numeric column with no present value has no mean; it stays missing and is reported in
/// [`FillReport::skipped`].
pub fn fill_missing_with_mean(table: &mut Table) -> FillReport {
    let mut report = FillReport::default();
    for index in table.numeric_columns() {
        let name = table.columns[index].name.clone();
        let present: Vec<f64> = table.column_values(index).filter_map(Value::as_number).collect();
        if present.is_empty() {
            if table.rows.iter().any(|row| row[index].is_missing()) {
                warn!(table = %table.name, column = %name, "column has no values to average, left missing");
                report.skipped.push(name);
            }
            continue;
        }

        let mean = present.iter().sum::<f64>() / present.len() as f64;
        let mut cells = 0;
        for row in table.rows.iter_mut() {
            if row[index].is_missing() {
                row[index] = Value::number(mean);
                cells += 1;
            }
        }
        if cells > 0 {
            info!(table = %table.name, column = %name, mean, cells, "filled missing values");
            report.filled.push((name, mean, cells));
        }
    }
    report
}
