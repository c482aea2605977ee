//! # Column Selection Module
//!
//! Resolves user-typed column names or glob patterns against a table and projects the table
//! onto the chosen columns.

use crate::table::Table;
use glob::Pattern;
use tracing::warn;

/// Ordered set of column names, always a subset of the table it was resolved against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    names: Vec<String>,
}

impl ColumnSelection {
    /// Selects every column in table order.
    pub fn all(table: &Table) -> Self {
        Self {
            names: table.column_names().into_iter().map(str::to_owned).collect(),
        }
    }

    /// Resolves patterns in order. A pattern is first taken as an exact column name and
    /// otherwise as a glob pattern; names already chosen are not repeated.
    ///
    /// Returns the selection and the patterns that matched no column.
    pub fn resolve<S: AsRef<str>>(table: &Table, patterns: &[S]) -> (Self, Vec<String>) {
        let mut names: Vec<String> = Vec::new();
        let mut unmatched = Vec::new();
        for pattern in patterns {
            let pattern: &str = pattern.as_ref();
            let matches: Vec<&str> = if table.column_index(pattern).is_some() {
                vec![pattern]
            } else {
                match Pattern::new(pattern) {
                    Ok(glob) => table
                        .column_names()
                        .into_iter()
                        .filter(|name| glob.matches(name))
                        .collect(),
                    Err(_) => Vec::new(),
                }
            };

            if matches.is_empty() {
                warn!(table = %table.name(), pattern, "no column matches selection");
                unmatched.push(pattern.to_owned());
            }
            for name in matches {
                if !names.iter().any(|chosen| chosen == name) {
                    names.push(name.to_owned());
                }
            }
        }
        (Self { names }, unmatched)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Projects the table onto the selected columns in selection order.
/// Names no longer present in the table are skipped.
pub fn select(table: &Table, selection: &ColumnSelection) -> Table {
    let indexes: Vec<usize> = selection
        .names
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    let columns = indexes.iter().map(|&index| table.columns[index].clone()).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| indexes.iter().map(|&index| row[index].clone()).collect())
        .collect();
    Table::new(table.name(), columns, rows)
}
