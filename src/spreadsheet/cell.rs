use crate::error::SweeperError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use crate::table::value::Value;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeDelta;

const MILLISECONDS_PER_DAY: f64 = 86_400_000f64;

/// Types of cell data in worksheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (1/0)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline and formula string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#N/A`
    Error,
}

impl CellType {
    fn date_time(is_1904: bool) -> Self {
        if is_1904 {
            Self::NumberDateTime1904
        } else {
            Self::NumberDateTime1900
        }
    }

    /// Parses built-in number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47" => {
                Some(Self::date_time(is_1904))
            }
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns outside literals and brackets.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => is_date_time = true,
                _ => (),
            }
        }

        if is_date_time {
            Self::date_time(is_1904)
        } else {
            Self::Number
        }
    }
}

/// Represents a single worksheet cell with position, type, and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the worksheet
    pub(crate) value: String,
}

impl Cell {
    /// Returns the A1-style cell reference.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    fn invalid(&self, message: &str) -> SpreadsheetError {
        SpreadsheetError::CellValueError {
            reference: self.reference(),
            message: format!("{} '{}'", message, self.value),
        }
    }

    fn to_double(&self) -> Result<f64, SpreadsheetError> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| self.invalid("cannot parse number"))
    }

    /// Converts the raw cell into a table value, resolving shared strings.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<Value, SweeperError> {
        let value = match self.kind {
            CellType::Empty | CellType::Error => Value::Missing,
            CellType::Boolean => Value::Boolean(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => Value::number(self.to_double()?),
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                let is_1904 = self.kind == CellType::NumberDateTime1904;
                serial_to_datetime(self.to_double()?, is_1904)
                    .map(Value::DateTime)
                    .ok_or_else(|| self.invalid("date out of range"))?
            }
            CellType::IsoDateTime => parse_iso_datetime(&self.value)
                .map(Value::DateTime)
                .ok_or_else(|| self.invalid("cannot parse date"))?,
            CellType::InlineString => Value::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.trim().parse::<usize>()?;
                shared_strings
                    .get(index)
                    .map(|text| Value::Text(text.to_owned()))
                    .ok_or_else(|| self.invalid("unknown shared string"))?
            }
        };
        Ok(value)
    }
}

fn epoch(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("NaiveDate literal")
        .and_hms_opt(0, 0, 0)
        .expect("Midnight literal")
}

/// Converts an Excel serial number to a date/time, rounded to milliseconds.
/// Serials below 61 in the 1900 system count from 1899-12-31 to absorb the fictitious
/// 1900-02-29 inherited from Lotus 1-2-3.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    let base = if is_1904 {
        epoch(1904, 1, 1)
    } else if serial < 61.0 {
        epoch(1899, 12, 31)
    } else {
        epoch(1899, 12, 30)
    };
    let milliseconds = (serial * MILLISECONDS_PER_DAY).round();
    if !milliseconds.is_finite() || milliseconds.abs() > 1e15 {
        return None;
    }
    base.checked_add_signed(TimeDelta::try_milliseconds(milliseconds as i64)?)
}

/// Converts a date/time to an Excel serial number in the 1900 date system.
pub(crate) fn datetime_to_serial(datetime: &NaiveDateTime) -> f64 {
    let days = (*datetime - epoch(1899, 12, 30)).num_milliseconds() as f64 / MILLISECONDS_PER_DAY;
    if days < 61.0 {
        days - 1.0
    } else {
        days
    }
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 1,
            col: 2,
            kind,
            value: value.to_owned(),
        }
    }

    fn datetime(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDateTime1900));
        assert_eq!(CellType::parse_builtin_number_format_id("22", true), Some(CellType::NumberDateTime1904));
        assert_eq!(CellType::parse_builtin_number_format_id("2", false), None);
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("0 \"days\"", false), CellType::Number);
    }

    #[test]
    fn serial_dates() {
        assert_eq!(serial_to_datetime(45000.5, false), Some(datetime("2023-03-15 12:00:00")));
        assert_eq!(serial_to_datetime(59.0, false), Some(datetime("1900-02-28 00:00:00")));
        assert_eq!(serial_to_datetime(61.0, false), Some(datetime("1900-03-01 00:00:00")));
        assert_eq!(serial_to_datetime(0.0, true), Some(datetime("1904-01-01 00:00:00")));
        assert_eq!(serial_to_datetime(f64::INFINITY, false), None);
    }

    #[test]
    fn serial_round_trip() {
        for text in ["2023-03-15 12:00:00", "1900-02-28 00:00:00", "1900-03-01 06:30:00", "1999-12-31 23:59:59"] {
            let value = datetime(text);
            assert_eq!(serial_to_datetime(datetime_to_serial(&value), false), Some(value));
        }
    }

    #[test]
    fn cell_values() {
        let shared = vec!["Alice".to_owned()];
        assert_eq!(cell(CellType::Number, "30").to_value(&shared).unwrap(), Value::Number(30.0));
        assert_eq!(cell(CellType::Boolean, "1").to_value(&shared).unwrap(), Value::Boolean(true));
        assert_eq!(cell(CellType::SharedString, "0").to_value(&shared).unwrap(), Value::Text("Alice".to_owned()));
        assert_eq!(cell(CellType::Error, "#N/A").to_value(&shared).unwrap(), Value::Missing);
        assert_eq!(
            cell(CellType::IsoDateTime, "2024-01-02").to_value(&shared).unwrap(),
            Value::DateTime(datetime("2024-01-02 00:00:00"))
        );
    }

    #[test]
    fn invalid_cells_name_their_reference() {
        let error = cell(CellType::Number, "abc").to_value(&[]).unwrap_err();
        assert_eq!(error.to_string(), "Invalid cell value at 'C2': cannot parse number 'abc'");
        assert!(cell(CellType::SharedString, "3").to_value(&[]).is_err());
    }
}
