//! # Export Module
//!
//! Encodes a table as CSV or as a single-sheet `.xlsx` workbook for download. Both encodings
//! carry the header row and no row index column.

mod delimited;
mod workbook;

use crate::table::Table;
use std::collections::HashSet;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unknown conversion format '{0}', expected csv or excel")]
    UnknownChoice(String),

    #[error("Error writing {name}: {message}")]
    EncodeError { name: String, message: String },
}

/// Target encoding picked by the user.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ConversionChoice {
    #[default]
    Csv,
    #[value(alias = "xlsx")]
    Excel,
}

impl ConversionChoice {
    pub const fn extension(&self) -> &'static str {
        match self {
            ConversionChoice::Csv => "csv",
            ConversionChoice::Excel => "xlsx",
        }
    }

    pub const fn mime_type(&self) -> &'static str {
        match self {
            ConversionChoice::Csv => "text/csv",
            ConversionChoice::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl Display for ConversionChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionChoice::Csv => write!(f, "CSV"),
            ConversionChoice::Excel => write!(f, "Excel"),
        }
    }
}

impl FromStr for ConversionChoice {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ConversionChoice::Csv),
            "excel" | "xlsx" => Ok(ConversionChoice::Excel),
            _ => Err(ExportError::UnknownChoice(value.to_owned())),
        }
    }
}

/// Encoded output ready to be saved or downloaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Original file stem with the extension of `choice`: `report.data.xlsx` -> `report.data.csv`.
pub fn target_file_name(original: &str, choice: ConversionChoice) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "export".to_owned());
    format!("{stem}.{}", choice.extension())
}

/// Encodes the table as `choice`, naming the output after `original`.
pub fn export(table: &Table, original: &str, choice: ConversionChoice) -> Result<Export, ExportError> {
    let file_name = target_file_name(original, choice);
    let result = match choice {
        ConversionChoice::Csv => delimited::write(table),
        ConversionChoice::Excel => workbook::write(table),
    };
    let bytes = result.map_err(|error| ExportError::EncodeError {
        name: file_name.to_owned(),
        message: error.to_string(),
    })?;
    info!(
        file = %file_name,
        format = %choice,
        rows = table.row_count(),
        bytes = bytes.len(),
        "exported table"
    );
    Ok(Export {
        file_name,
        mime_type: choice.mime_type(),
        bytes,
    })
}

/// Output names already handed out in one batch, plus reserved names that must never be
/// written, such as files already present in the output directory.
///
/// A name claimed twice gets ` (1)`, ` (2)`, ... inserted before its extension, so
/// `a.csv` and `a.xlsx` both converted to CSV end up as `a.csv` and `a (1).csv`.
/// Names compare case-insensitively.
#[derive(Debug, Default)]
pub struct OutputNames {
    taken: HashSet<String>,
}

impl OutputNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the name of every entry in `dir`; a missing directory reserves nothing.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let mut names = Self::new();
        let dir = dir.as_ref();
        if dir.is_dir() {
            for entry in fs::read_dir(dir)? {
                names.reserve(&entry?.file_name().to_string_lossy());
            }
        }
        Ok(names)
    }

    /// Marks `name` as unavailable without handing it out.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_lowercase());
    }

    /// Returns `name`, or the first free suffixed variant of it, and marks it as taken.
    pub fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_lowercase()) {
            return name.to_owned();
        }
        let (stem, extension) = match name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => (stem, format!(".{extension}")),
            _ => (name, String::new()),
        };
        (1..)
            .map(|counter| format!("{stem} ({counter}){extension}"))
            .find(|candidate| self.taken.insert(candidate.to_lowercase()))
            .unwrap_or_else(|| name.to_owned())
    }
}
