//! # Data Sweeper
//!
//! Loads uploaded CSV and Excel files into in-memory tables and lets the user clean them,
//! narrow them to selected columns, chart their numeric columns and convert them between
//! CSV and Excel.
//!
//! ## Pipeline
//!
//! Each file moves through the stages independently:
//!
//! - **Load** ([`spreadsheet::load`]): `.csv` and `.xlsx` files become a [`Table`] whose
//!   column names come from the first row and whose column types are inferred from the cells
//! - **Clean** ([`cleaner`]): remove duplicate rows, fill missing numeric cells with the
//!   column mean
//! - **Select** ([`selector`]): keep only some columns, in the order given
//! - **Chart** ([`chart`]): grouped bar chart of up to two numeric columns, as SVG
//! - **Export** ([`export`]): CSV or single-sheet `.xlsx` bytes with a matching file name
//!
//! [`session`] ties the stages together per file and runs a batch, reporting files that fail
//! to load without stopping the rest.
//!
//! ## Example
//!
//! ```no_run
//! use data_sweeper::session::{sweep, SweepPlan};
//! use data_sweeper::spreadsheet::{LoadOptions, UploadedFile};
//!
//! let files = vec![UploadedFile::read("people.csv")?];
//! let plan = SweepPlan { clean: true, remove_duplicates: true, convert: true, ..SweepPlan::default() };
//! for outcome in sweep(&files, &plan, &LoadOptions::default()) {
//!     for message in outcome.messages() {
//!         println!("{message}");
//!     }
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod chart;
pub mod cleaner;
pub mod error;
pub mod export;
mod helpers;
pub mod selector;
pub mod session;
pub mod spreadsheet;
pub mod table;

pub use crate::error::SweeperError;
pub use crate::table::Table;
