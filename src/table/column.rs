use std::collections::HashSet;

/// Inferred data type of a table column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Floating point numbers (integers included)
    Number,
    /// True/false values
    Boolean,
    /// Date and time values
    DateTime,
    /// Free text, also the fallback for mixed columns
    Text,
}

/// Represents a column of a table with name and data type.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl ColumnType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Text => "text",
        }
    }

    /// Only number columns take part in mean filling and charts.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Number)
    }

    /// Detects the common type from per-cell candidates, ignoring missing cells.
    /// A column without any present value is numeric; mixed candidates fall back to text.
    pub fn detect<I>(candidates: I) -> ColumnType
    where
        I: IntoIterator<Item = Option<ColumnType>>,
    {
        let types: Vec<ColumnType> = candidates.into_iter().flatten().collect();
        if types.is_empty() || types.iter().all(|kind| kind.is_numeric()) {
            ColumnType::Number
        } else if types.iter().all(|kind| *kind == ColumnType::Boolean) {
            ColumnType::Boolean
        } else if types.iter().all(|kind| *kind == ColumnType::DateTime) {
            ColumnType::DateTime
        } else {
            ColumnType::Text
        }
    }
}

/// Normalises header names read from a file.
///
/// Blank names become `Unnamed: <index>`; a repeated name gets `.1`, `.2`, ... in order of
/// appearance, skipping suffixes that are already taken.
pub fn normalize_headers(names: Vec<String>) -> Vec<String> {
    let names: Vec<String> = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            if name.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut normalized = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 0usize;
        while taken.contains(&candidate) {
            suffix += 1;
            candidate = format!("{name}.{suffix}");
        }
        taken.insert(candidate.clone());
        normalized.push(candidate);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn detect_types() {
        use ColumnType::*;
        assert_eq!(ColumnType::detect(vec![Some(Number), None, Some(Number)]), Number);
        assert_eq!(ColumnType::detect(vec![Some(Boolean), Some(Boolean)]), Boolean);
        assert_eq!(ColumnType::detect(vec![Some(DateTime), None]), DateTime);
        assert_eq!(ColumnType::detect(vec![Some(Number), Some(Text)]), Text);
        assert_eq!(ColumnType::detect(vec![Some(Number), Some(Boolean)]), Text);
    }

    #[test]
    fn all_missing_column_is_numeric() {
        assert_eq!(ColumnType::detect(vec![None, None]), ColumnType::Number);
        assert_eq!(ColumnType::detect(Vec::new()), ColumnType::Number);
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        assert_eq!(
            normalize_headers(names(&["a", "b", "a", "a"])),
            names(&["a", "b", "a.1", "a.2"])
        );
        assert_eq!(
            normalize_headers(names(&["a", "a.1", "a"])),
            names(&["a", "a.1", "a.2"])
        );
    }

    #[test]
    fn blank_headers_are_unnamed() {
        assert_eq!(
            normalize_headers(names(&["", "x", " "])),
            names(&["Unnamed: 0", "x", "Unnamed: 2"])
        );
    }
}
