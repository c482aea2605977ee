//! # Table Module
//!
//! In-memory tabular data: ordered named columns with an inferred type each, and rows of
//! cells positionally aligned with the columns. Every loader produces a [`Table`] and every
//! later stage (cleaning, column selection, charting, export) consumes one.

pub mod column;
pub mod value;

use crate::table::column::normalize_headers;
use crate::table::column::Column;
use crate::table::column::ColumnType;
use crate::table::value::Value;
use prettytable::format;
use prettytable::Cell as PrettyCell;
use prettytable::Row as PrettyRow;
use prettytable::Table as PrettyTable;

/// Marker shown for missing cells in previews.
const MISSING_MARKER: &str = "<NA>";

/// Rows x named columns decoded from one uploaded file.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// Source file name
    pub(crate) name: String,
    /// Column definitions, in display order
    pub(crate) columns: Vec<Column>,
    /// Cells, one vector per row, each as wide as `columns`
    pub(crate) rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates a table from typed columns.
    /// Rows are padded with missing cells (or cut) to the column count and every cell is
    /// coerced to its column type.
    pub fn new(name: &str, columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row.into_iter()
                    .zip(&columns)
                    .map(|(value, column)| value.coerce(column.kind))
                    .collect()
            })
            .collect();
        Table {
            name: name.to_owned(),
            columns,
            rows,
        }
    }

    /// Creates a table from raw header names and decoded cells, normalising the headers
    /// and inferring each column type from its cells.
    pub fn from_values(name: &str, headers: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let headers = normalize_headers(headers);
        for row in rows.iter_mut() {
            row.resize(headers.len(), Value::Missing);
        }
        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(index, header)| Column {
                name: header,
                kind: ColumnType::detect(rows.iter().map(|row| row[index].candidate_type())),
            })
            .collect();
        Table::new(name, columns, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Cells of the column at `index`, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Indexes of numeric columns in their table order.
    pub fn numeric_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.kind.is_numeric())
            .map(|(index, _)| index)
            .collect()
    }

    /// Renders the first `limit` rows as a boxed text table with a row index column.
    pub fn preview(&self, limit: usize) -> String {
        let mut table = PrettyTable::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        let mut titles = vec![PrettyCell::new("")];
        titles.extend(
            self.columns
                .iter()
                .map(|column| PrettyCell::new(&column.name).style_spec("b")),
        );
        table.set_titles(PrettyRow::new(titles));

        for (index, row) in self.rows.iter().take(limit).enumerate() {
            let mut cells = vec![PrettyCell::new(&index.to_string()).style_spec("r")];
            cells.extend(row.iter().zip(&self.columns).map(|(value, column)| {
                let text = match value {
                    Value::Missing => MISSING_MARKER.to_owned(),
                    value => value.to_string(),
                };
                if column.kind.is_numeric() {
                    PrettyCell::new(&text).style_spec("r")
                } else {
                    PrettyCell::new(&text)
                }
            }));
            table.add_row(PrettyRow::new(cells));
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_values(
            "people.csv",
            vec!["name".to_owned(), "age".to_owned(), "name".to_owned()],
            vec![
                vec![Value::Text("Alice".to_owned()), Value::Number(30.0), Value::Text("A".to_owned())],
                vec![Value::Text("Bob".to_owned()), Value::Missing],
            ],
        )
    }

    #[test]
    fn infers_types_and_pads_rows() {
        let table = sample();
        assert_eq!(table.column_names(), vec!["name", "age", "name.1"]);
        assert_eq!(table.columns()[0].kind, ColumnType::Text);
        assert_eq!(table.columns()[1].kind, ColumnType::Number);
        assert_eq!(table.rows()[1], vec![Value::Text("Bob".to_owned()), Value::Missing, Value::Missing]);
        assert_eq!(table.numeric_columns(), vec![1]);
        assert_eq!(table.column_index("name.1"), Some(2));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn mixed_column_becomes_text() {
        let table = Table::from_values(
            "mixed.csv",
            vec!["code".to_owned()],
            vec![vec![Value::Number(7.0)], vec![Value::Text("x".to_owned())]],
        );
        assert_eq!(table.columns()[0].kind, ColumnType::Text);
        assert_eq!(
            table.column_values(0).cloned().collect::<Vec<_>>(),
            vec![Value::Text("7".to_owned()), Value::Text("x".to_owned())]
        );
    }

    #[test]
    fn preview_limits_rows() {
        let preview = sample().preview(1);
        assert!(preview.contains("Alice"));
        assert!(!preview.contains("Bob"));
        assert!(preview.contains("name.1"));
    }

    #[test]
    fn preview_marks_missing() {
        let preview = sample().preview(10);
        assert!(preview.contains(MISSING_MARKER));
    }
}
