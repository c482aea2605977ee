use crate::error::SweeperError;
use crate::helpers::text::decode;
use crate::spreadsheet::LoadOptions;
use crate::spreadsheet::SpreadsheetError;
use crate::table::column::normalize_headers;
use crate::table::column::Column;
use crate::table::column::ColumnType;
use crate::table::value::Value;
use crate::table::Table;
use csv::ReaderBuilder;
use csv::StringRecord;
use tracing::debug;

/// Decodes comma-delimited bytes into a table; the first record names the columns.
///
/// Blank lines are skipped. Short records are padded with missing cells, records longer
/// than the header are an error. Columns whose present cells are not all numbers (or all
/// booleans) keep every cell's original text.
pub(super) fn read(name: &str, bytes: &[u8], options: &LoadOptions) -> Result<Table, SweeperError> {
    let text = decode(bytes)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        if is_blank(&record, &text) {
            continue;
        }
        match &header {
            None => header = Some(record.iter().map(str::to_owned).collect()),
            Some(header) => {
                if record.len() > header.len() {
                    Err(SpreadsheetError::RaggedRow {
                        line: record.position().map(|position| position.line()).unwrap_or_default(),
                        expected: header.len(),
                        found: record.len(),
                    })?
                }
                records.push(record.iter().map(str::to_owned).collect());
            }
        }
    }
    let headers = normalize_headers(header.ok_or(SpreadsheetError::NoColumns)?);
    debug!(file = name, columns = headers.len(), rows = records.len(), "parsed delimited text");

    let parsed: Vec<Vec<Value>> = records
        .iter()
        .map(|record| record.iter().map(|raw| parse_field(raw, options)).collect())
        .collect();
    let columns: Vec<Column> = headers
        .into_iter()
        .enumerate()
        .map(|(index, header)| Column {
            name: header,
            kind: ColumnType::detect(
                parsed.iter().map(|row| row.get(index).and_then(Value::candidate_type)),
            ),
        })
        .collect();

    let rows = records
        .into_iter()
        .zip(parsed)
        .map(|(record, values)| {
            record
                .into_iter()
                .zip(values)
                .zip(&columns)
                .map(|((raw, value), column)| match value {
                    Value::Missing => Value::Missing,
                    _ if column.kind == ColumnType::Text => Value::Text(raw),
                    value => value,
                })
                .collect()
        })
        .collect();
    Ok(Table::new(name, columns, rows))
}

/// A line with no fields at all. A quoted empty field (`""`) is a missing value, not a blank.
fn is_blank(record: &StringRecord, text: &str) -> bool {
    let quoted = record
        .position()
        .and_then(|position| text.as_bytes().get(position.byte() as usize))
        .is_some_and(|byte| *byte == b'"');
    record.len() <= 1 && record.iter().all(str::is_empty) && !quoted
}

/// Interprets one field: missing literal, boolean, number, or text.
fn parse_field(raw: &str, options: &LoadOptions) -> Value {
    if options.is_null(raw) {
        return Value::Missing;
    }
    match raw {
        "True" | "true" | "TRUE" => Value::Boolean(true),
        "False" | "false" | "FALSE" => Value::Boolean(false),
        _ => match raw.trim().parse::<f64>() {
            Ok(number) => Value::number(number),
            Err(_) => Value::Text(raw.to_owned()),
        },
    }
}
