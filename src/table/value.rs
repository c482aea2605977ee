use crate::table::column::ColumnType;
use chrono::NaiveDateTime;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;

/// Display format for date/time cells; the fraction is printed only when non-zero.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single table cell.
///
/// `Number` never holds NaN: readers turn NaN into `Missing`, which keeps equality
/// reflexive so rows can be hashed when looking for duplicates.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No recorded data (distinct from zero or the empty string)
    #[default]
    Missing,
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Builds a number cell, mapping NaN to `Missing`.
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Value::Missing
        } else {
            Value::Number(value)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The column type this cell alone suggests; `None` for missing cells.
    pub fn candidate_type(&self) -> Option<ColumnType> {
        match self {
            Value::Missing => None,
            Value::Number(_) => Some(ColumnType::Number),
            Value::Boolean(_) => Some(ColumnType::Boolean),
            Value::DateTime(_) => Some(ColumnType::DateTime),
            Value::Text(_) => Some(ColumnType::Text),
        }
    }

    /// Coerces the cell into a column of type `kind`.
    /// Only text columns rewrite present values; other kinds are already consistent.
    pub fn coerce(self, kind: ColumnType) -> Self {
        match (kind, self) {
            (_, Value::Missing) => Value::Missing,
            (ColumnType::Text, Value::Text(text)) => Value::Text(text),
            (ColumnType::Text, value) => Value::Text(value.to_string()),
            (_, value) => value,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Missing => (),
            // 0.0 and -0.0 compare equal, so they must hash equal
            Value::Number(value) if *value == 0.0 => 0u64.hash(state),
            Value::Number(value) => value.to_bits().hash(state),
            Value::Boolean(value) => value.hash(state),
            Value::DateTime(value) => value.hash(state),
            Value::Text(value) => value.hash(state),
        }
    }
}

impl Display for Value {
    /// Renders the cell as written to delimited output; missing cells are empty.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(value) => write!(f, "{}", format_number(*value)),
            Value::Boolean(value) => write!(f, "{}", if *value { "True" } else { "False" }),
            Value::DateTime(value) => write!(f, "{}", value.format(DATETIME_FORMAT)),
            Value::Text(value) => write!(f, "{}", value),
        }
    }
}

/// Formats a number, dropping the fractional part of integral values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn nan_becomes_missing() {
        assert_eq!(Value::number(f64::NAN), Value::Missing);
        assert_eq!(Value::number(1.5), Value::Number(1.5));
    }

    #[test]
    fn display_numbers() {
        assert_eq!(Value::Number(30.0).to_string(), "30");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::Boolean(true).to_string(), "True");
    }

    #[test]
    fn display_datetimes() {
        let date = chrono::NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        let whole = date.and_hms_opt(12, 30, 0).unwrap();
        let fraction = date.and_hms_milli_opt(12, 30, 0, 500).unwrap();
        assert_eq!(Value::DateTime(whole).to_string(), "2023-03-15 12:30:00");
        assert_eq!(Value::DateTime(fraction).to_string(), "2023-03-15 12:30:00.500");
    }

    #[test]
    fn signed_zero_hashes_equal() {
        let mut set = HashSet::new();
        set.insert(Value::Number(0.0));
        assert!(set.contains(&Value::Number(-0.0)));
        assert!(!set.contains(&Value::Missing));
    }

    #[test]
    fn coerce_into_text() {
        assert_eq!(Value::Number(7.0).coerce(ColumnType::Text), Value::Text("7".to_owned()));
        assert_eq!(Value::Missing.coerce(ColumnType::Text), Value::Missing);
        assert_eq!(Value::Number(7.0).coerce(ColumnType::Number), Value::Number(7.0));
    }
}
