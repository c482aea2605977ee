//! # Session Module
//!
//! Per-file processing state and the batch driver. Each uploaded file gets a
//! [`FileSession`] holding its table and the user's choices for it; user actions are applied
//! to the session explicitly and produce [`Effect`]s for the surface to show.
//!
//! [`sweep`] runs one [`SweepPlan`] over a batch of files in upload order. A file that fails
//! to load is reported and skipped; later files are processed as usual.

use crate::chart::Chart;
use crate::cleaner::fill_missing_with_mean;
use crate::cleaner::remove_duplicates;
use crate::error::SweeperError;
use crate::export::export;
use crate::export::ConversionChoice;
use crate::export::Export;
use crate::export::OutputNames;
use crate::selector::select;
use crate::selector::ColumnSelection;
use crate::spreadsheet::load;
use crate::spreadsheet::LoadOptions;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::UploadedFile;
use crate::table::Table;
use std::fmt::Display;
use std::fmt::Formatter;
use tracing::info;
use tracing::warn;

pub const DUPLICATES_REMOVED: &str = "Duplicates removed successfully!";
pub const MISSING_FILLED: &str = "Missing values filled with column means!";
pub const NO_NUMERIC_COLUMNS: &str = "No numeric columns to visualize.";

/// Text shown to the user, with its severity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Success(String),
    Info(String),
    Warning(String),
    Error(String),
}

impl Message {
    pub fn text(&self) -> &str {
        match self {
            Message::Success(text) | Message::Info(text) | Message::Warning(text) | Message::Error(text) => text,
        }
    }

    pub const fn level(&self) -> &'static str {
        match self {
            Message::Success(_) => "success",
            Message::Info(_) => "info",
            Message::Warning(_) => "warning",
            Message::Error(_) => "error",
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// One user-triggered step on a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    RemoveDuplicates,
    FillMissingWithMean,
    /// Column names or glob patterns, in the order the columns should appear
    SelectColumns(Vec<String>),
    ShowChart,
    Export,
}

/// What applying an action produced.
#[derive(Clone, Debug)]
pub enum Effect {
    Notice(Message),
    Chart(Chart),
    Export(Export),
}

/// Processing state of one uploaded file.
#[derive(Clone, Debug)]
pub struct FileSession {
    pub file_name: String,
    /// Table after the cleaning steps applied so far, with every column
    pub table: Table,
    pub cleaning_enabled: bool,
    pub selected_columns: ColumnSelection,
    pub conversion: ConversionChoice,
}

impl FileSession {
    /// Starts a session on a loaded table with all columns selected and cleaning off.
    pub fn new(table: Table) -> Self {
        Self {
            file_name: table.name().to_owned(),
            selected_columns: ColumnSelection::all(&table),
            table,
            cleaning_enabled: false,
            conversion: ConversionChoice::default(),
        }
    }

    pub fn open(file: &UploadedFile, options: &LoadOptions) -> Result<Self, SpreadsheetError> {
        Ok(Self::new(load(file, options)?))
    }

    /// The table as currently shown: the cleaned table restricted to the selected columns.
    pub fn view(&self) -> Table {
        select(&self.table, &self.selected_columns)
    }

    pub fn apply(&mut self, action: &Action) -> Result<Vec<Effect>, SweeperError> {
        let effects = match action {
            Action::RemoveDuplicates | Action::FillMissingWithMean if !self.cleaning_enabled => {
                warn!(file = %self.file_name, ?action, "cleaning is not enabled");
                vec![Effect::Notice(Message::Warning(format!(
                    "Cleaning is not enabled for `{}`.",
                    self.file_name
                )))]
            }
            Action::RemoveDuplicates => {
                remove_duplicates(&mut self.table);
                vec![Effect::Notice(Message::Success(DUPLICATES_REMOVED.to_owned()))]
            }
            Action::FillMissingWithMean => {
                let report = fill_missing_with_mean(&mut self.table);
                let mut effects = vec![Effect::Notice(Message::Success(MISSING_FILLED.to_owned()))];
                effects.extend(report.skipped.iter().map(|column| {
                    Effect::Notice(Message::Warning(format!(
                        "Column `{column}` has no values to average and was left empty."
                    )))
                }));
                effects
            }
            Action::SelectColumns(patterns) => {
                let (selection, unmatched) = ColumnSelection::resolve(&self.table, patterns);
                self.selected_columns = selection;
                let mut effects: Vec<Effect> = unmatched
                    .iter()
                    .map(|pattern| Effect::Notice(Message::Warning(format!("No column matches `{pattern}`."))))
                    .collect();
                effects.push(Effect::Notice(Message::Info(format!(
                    "Selected columns: {}",
                    self.selected_columns.names().join(", ")
                ))));
                effects
            }
            Action::ShowChart => match Chart::from_table(&self.view()) {
                Some(chart) => vec![Effect::Chart(chart)],
                None => vec![Effect::Notice(Message::Warning(NO_NUMERIC_COLUMNS.to_owned()))],
            },
            Action::Export => {
                let output = export(&self.view(), &self.file_name, self.conversion)?;
                vec![Effect::Export(output)]
            }
        };
        Ok(effects)
    }
}

/// Choices applied to every file of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepPlan {
    pub clean: bool,
    pub remove_duplicates: bool,
    pub fill_missing: bool,
    /// `None` keeps all columns
    pub columns: Option<Vec<String>>,
    pub chart: bool,
    pub conversion: ConversionChoice,
    pub convert: bool,
}

impl SweepPlan {
    /// Actions in pipeline order: cleaning, column selection, chart, export.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.remove_duplicates {
            actions.push(Action::RemoveDuplicates);
        }
        if self.fill_missing {
            actions.push(Action::FillMissingWithMean);
        }
        if let Some(columns) = &self.columns {
            actions.push(Action::SelectColumns(columns.to_owned()));
        }
        if self.chart {
            actions.push(Action::ShowChart);
        }
        if self.convert {
            actions.push(Action::Export);
        }
        actions
    }
}

/// Result of sweeping one file.
#[derive(Debug)]
pub enum FileOutcome {
    Processed {
        session: FileSession,
        effects: Vec<Effect>,
    },
    Failed {
        file_name: String,
        error: SweeperError,
    },
}

impl FileOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            FileOutcome::Processed { session, .. } => &session.file_name,
            FileOutcome::Failed { file_name, .. } => file_name,
        }
    }

    /// Messages to show for this file, in order.
    pub fn messages(&self) -> Vec<Message> {
        match self {
            FileOutcome::Processed { effects, .. } => effects
                .iter()
                .filter_map(|effect| match effect {
                    Effect::Notice(message) => Some(message.to_owned()),
                    _ => None,
                })
                .collect(),
            FileOutcome::Failed { error, .. } => vec![Message::Error(error.to_string())],
        }
    }

    pub fn exports(&self) -> Vec<&Export> {
        match self {
            FileOutcome::Processed { effects, .. } => effects
                .iter()
                .filter_map(|effect| match effect {
                    Effect::Export(output) => Some(output),
                    _ => None,
                })
                .collect(),
            FileOutcome::Failed { .. } => Vec::new(),
        }
    }

    pub fn charts(&self) -> Vec<&Chart> {
        match self {
            FileOutcome::Processed { effects, .. } => effects
                .iter()
                .filter_map(|effect| match effect {
                    Effect::Chart(chart) => Some(chart),
                    _ => None,
                })
                .collect(),
            FileOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Runs the plan over every file in order. Export names are made unique across the batch.
pub fn sweep(files: &[UploadedFile], plan: &SweepPlan, options: &LoadOptions) -> Vec<FileOutcome> {
    sweep_into(files, plan, options, &mut OutputNames::new())
}

/// Like [`sweep`], but export names also avoid everything already claimed or reserved in
/// `names`, such as the files present in the output directory.
pub fn sweep_into(
    files: &[UploadedFile],
    plan: &SweepPlan,
    options: &LoadOptions,
    names: &mut OutputNames,
) -> Vec<FileOutcome> {
    let actions = plan.actions();
    files
        .iter()
        .map(|file| match process(file, plan, &actions, options, names) {
            Ok((session, effects)) => {
                info!(file = %file.name(), "processed file");
                FileOutcome::Processed { session, effects }
            }
            Err(error) => {
                warn!(file = %file.name(), %error, "skipping file");
                FileOutcome::Failed {
                    file_name: file.name().to_owned(),
                    error,
                }
            }
        })
        .collect()
}

fn process(
    file: &UploadedFile,
    plan: &SweepPlan,
    actions: &[Action],
    options: &LoadOptions,
    names: &mut OutputNames,
) -> Result<(FileSession, Vec<Effect>), SweeperError> {
    let mut session = FileSession::open(file, options)?;
    session.cleaning_enabled = plan.clean;
    session.conversion = plan.conversion;

    let columns = session
        .table
        .columns()
        .iter()
        .map(|column| format!("{}: {}", column.name, column.kind.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut effects = vec![Effect::Notice(Message::Info(format!(
        "`{}`: {} rows, {} columns ({columns})",
        session.file_name,
        session.table.row_count(),
        session.table.column_count()
    )))];
    for action in actions {
        for effect in session.apply(action)? {
            effects.push(match effect {
                Effect::Export(mut output) => {
                    output.file_name = names.claim(&output.file_name);
                    Effect::Export(output)
                }
                effect => effect,
            });
        }
    }
    effects.push(Effect::Notice(Message::Success(format!(
        "`{}` processed and ready!",
        session.file_name
    ))));
    Ok((session, effects))
}
