//! # Spreadsheet Loading Module
//!
//! Turns an uploaded file into a [`Table`]. The file type is detected from the name's
//! extension: `.csv` is decoded as comma-delimited text and `.xlsx` as an Office Open XML
//! workbook whose first worksheet is read. In both cases the first row holds the column
//! names.
//!
//! A file that cannot be loaded fails on its own with either
//! [`SpreadsheetError::UnsupportedFormat`] or [`SpreadsheetError::DecodeError`]; callers
//! report the error and carry on with the next file.
pub(crate) mod cell;
mod delimited;
pub(crate) mod reference;
pub(crate) mod sheet;
mod xlsx;

use crate::table::Table;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::info;

/// Cell texts read as missing values unless configured otherwise.
pub const DEFAULT_NULLS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Errors raised while loading an uploaded file.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// File extension is neither `.csv` nor `.xlsx`
    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat { name: String, extension: String },

    /// The bytes could not be decoded as the detected format
    #[error("Error reading {name}: {message}")]
    DecodeError { name: String, message: String },

    #[error("Invalid {0} text")]
    InvalidEncoding(String),

    #[error("No columns to parse from file")]
    NoColumns,

    #[error("Expected {expected} fields in line {line}, saw {found}")]
    RaggedRow { line: u64, expected: usize, found: usize },

    #[error("Missing package part '{0}'")]
    MissingPart(String),

    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("Invalid cell value at '{reference}': {message}")]
    CellValueError { reference: String, message: String },
}

/// Supported upload formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detects the format from the file name's extension, ignoring case.
    pub fn detect(name: &str) -> Result<FileFormat, SpreadsheetError> {
        let extension = Path::new(name)
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("xlsx") => Ok(FileFormat::Xlsx),
            other => Err(SpreadsheetError::UnsupportedFormat {
                name: name.to_owned(),
                extension: other.map(|extension| format!(".{extension}")).unwrap_or_default(),
            }),
        }
    }
}

/// One uploaded file: its name and raw content. Immutable once received.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a file from disk, naming it after the path's final component.
    pub fn read<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Options for decoding uploads.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Cell texts treated as missing values
    pub nulls: HashSet<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            nulls: DEFAULT_NULLS.iter().map(|null| null.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    pub fn is_null(&self, text: &str) -> bool {
        self.nulls.contains(text)
    }
}

/// Loads an uploaded file into a table.
///
/// # Errors
///
/// Returns `UnsupportedFormat` for extensions other than `.csv`/`.xlsx` and `DecodeError`,
/// carrying the underlying message, when the content cannot be decoded.
pub fn load(file: &UploadedFile, options: &LoadOptions) -> Result<Table, SpreadsheetError> {
    let format = FileFormat::detect(&file.name)?;
    debug!(file = %file.name, ?format, bytes = file.bytes.len(), "decoding upload");
    let result = match format {
        FileFormat::Csv => delimited::read(&file.name, &file.bytes, options),
        FileFormat::Xlsx => xlsx::read(&file.name, &file.bytes, options),
    };
    match result {
        Ok(table) => {
            info!(
                file = %file.name,
                rows = table.row_count(),
                columns = table.column_count(),
                "loaded table"
            );
            Ok(table)
        }
        Err(error) => Err(SpreadsheetError::DecodeError {
            name: file.name.to_owned(),
            message: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_formats() {
        assert_eq!(FileFormat::detect("a.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::detect("REPORT.XLSX").unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::detect("archive.tar.csv").unwrap(), FileFormat::Csv);
    }

    #[test]
    fn unsupported_formats() {
        let error = FileFormat::detect("notes.txt").unwrap_err();
        assert_eq!(error.to_string(), "Unsupported file type: .txt");
        assert!(matches!(
            FileFormat::detect("README"),
            Err(SpreadsheetError::UnsupportedFormat { extension, .. }) if extension.is_empty()
        ));
        assert!(FileFormat::detect("legacy.xls").is_err());
    }

    #[test]
    fn load_csv() {
        let file = UploadedFile::new("people.csv", b"name,age\nAlice,30\n".to_vec());
        let table = load(&file, &LoadOptions::default()).unwrap();
        assert_eq!(table.name(), "people.csv");
        assert_eq!(table.column_names(), vec!["name", "age"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn load_reports_decode_errors() {
        let file = UploadedFile::new("corrupt.xlsx", b"definitely not a zip".to_vec());
        match load(&file, &LoadOptions::default()) {
            Err(SpreadsheetError::DecodeError { name, message }) => {
                assert_eq!(name, "corrupt.xlsx");
                assert!(!message.is_empty());
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_unsupported() {
        let file = UploadedFile::new("notes.txt", b"hello".to_vec());
        assert!(matches!(
            load(&file, &LoadOptions::default()),
            Err(SpreadsheetError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn custom_nulls() {
        let mut options = LoadOptions::default();
        options.nulls.insert("-".to_owned());
        let file = UploadedFile::new("dash.csv", b"v\n-\n4\n".to_vec());
        let table = load(&file, &options).unwrap();
        assert!(table.columns()[0].kind.is_numeric());
        assert!(table.rows()[0][0].is_missing());
    }
}
