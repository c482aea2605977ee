use anyhow::{bail, Context, Result};
use clap::Parser;
use data_sweeper::export::{ConversionChoice, OutputNames};
use data_sweeper::session::{sweep_into, FileOutcome, Message, SweepPlan};
use data_sweeper::spreadsheet::{LoadOptions, UploadedFile};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

/// Clean, inspect and convert CSV and Excel files.
#[derive(Parser, Debug)]
#[command(name = "data-sweeper", version)]
#[command(about = "Load CSV/XLSX files, clean them, pick columns, chart them and convert them")]
struct Args {
    /// Files to process, in order (glob patterns are expanded)
    #[arg(required = true)]
    files: Vec<String>,

    /// Enable the cleaning steps
    #[arg(long)]
    clean: bool,

    /// Remove duplicate rows
    #[arg(long, requires = "clean")]
    remove_duplicates: bool,

    /// Fill missing numeric cells with the column mean
    #[arg(long, requires = "clean")]
    fill_missing: bool,

    /// Columns to keep, by name or glob pattern, in output order
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Write a bar chart of the first numeric columns as SVG
    #[arg(long)]
    chart: bool,

    /// Conversion target
    #[arg(long, value_enum, env = "DATA_SWEEPER_FORMAT", default_value_t = ConversionChoice::Csv)]
    format: ConversionChoice,

    /// Write the converted file
    #[arg(long)]
    convert: bool,

    /// Directory for converted files and charts
    #[arg(short, long, env = "DATA_SWEEPER_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Number of rows shown in each preview
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Extra cell texts read as missing values
    #[arg(long = "null", value_name = "TEXT")]
    nulls: Vec<String>,

    /// Log debug details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut failures = 0;
    let mut files = Vec::new();
    let paths = expand(&args.files)?;
    for path in &paths {
        match UploadedFile::read(path) {
            Ok(file) => files.push(file),
            Err(error) => {
                failures += 1;
                tracing::warn!(path = %path.display(), %error, "skipping unreadable file");
                print_message(&Message::Error(format!("Failed to read {}: {error}", path.display())));
            }
        }
    }
    tracing::info!(files = files.len(), "starting sweep");

    let mut options = LoadOptions::default();
    options.nulls.extend(args.nulls.iter().cloned());
    let plan = SweepPlan {
        clean: args.clean,
        remove_duplicates: args.remove_duplicates,
        fill_missing: args.fill_missing,
        columns: args.columns.clone(),
        chart: args.chart,
        conversion: args.format,
        convert: args.convert,
    };

    if args.chart || args.convert {
        fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    }
    // Inputs living in the output directory are among its entries and stay untouched.
    let mut names = OutputNames::from_dir(&args.output_dir)
        .with_context(|| format!("Failed to list {}", args.output_dir.display()))?;

    let outcomes = sweep_into(&files, &plan, &options, &mut names);
    for outcome in &outcomes {
        println!("== {} ==", outcome.file_name());
        let FileOutcome::Processed { session, .. } = outcome else {
            failures += 1;
            for message in outcome.messages() {
                print_message(&message);
            }
            continue;
        };

        print!("{}", session.view().preview(args.preview_rows));
        let mut failed = false;
        for chart in outcome.charts() {
            let written = chart
                .render_svg()
                .context("Failed to draw chart")
                .and_then(|svg| {
                    let name = names.claim(&chart_file_name(outcome.file_name()));
                    write_new(&args.output_dir, &mut names, name, svg.as_bytes())
                });
            match written {
                Ok(path) => println!("chart: {}", path.display()),
                Err(error) => {
                    failed = true;
                    print_message(&Message::Error(format!("{}: {error:#}", outcome.file_name())));
                }
            }
        }
        for output in outcome.exports() {
            match write_new(&args.output_dir, &mut names, output.file_name.to_owned(), &output.bytes) {
                Ok(path) => println!("download: {} ({})", path.display(), output.mime_type),
                Err(error) => {
                    failed = true;
                    print_message(&Message::Error(format!("{}: {error:#}", outcome.file_name())));
                }
            }
        }
        for message in outcome.messages() {
            print_message(&message);
        }
        if failed {
            failures += 1;
        }
    }

    let total = paths.len();
    tracing::info!(files = total, failures, "sweep finished");
    if failures > 0 {
        bail!("{failures} of {total} files failed");
    }
    Ok(())
}

/// Writes `bytes` to a new file in `dir`, never replacing an existing one. If `name` turns
/// out to exist already, the next free name from `names` is used instead.
fn write_new(dir: &Path, names: &mut OutputNames, mut name: String, bytes: &[u8]) -> Result<PathBuf> {
    loop {
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                return Ok(path);
            }
            Err(error) if error.kind() == ErrorKind::AlreadyExists => name = names.claim(&name),
            Err(error) => return Err(error).with_context(|| format!("Failed to create {}", path.display())),
        }
    }
}

/// Expands glob patterns; arguments without glob syntax are kept as given.
fn expand(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let before = paths.len();
        for entry in glob::glob(pattern).with_context(|| format!("Invalid pattern {pattern}"))? {
            paths.push(entry?);
        }
        if paths.len() == before {
            tracing::warn!(pattern, "pattern matched no files");
        }
    }
    Ok(paths)
}

fn chart_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "chart".to_owned());
    format!("{stem}.chart.svg")
}

fn print_message(message: &Message) {
    match message {
        Message::Error(_) | Message::Warning(_) => eprintln!("[{}] {message}", message.level()),
        _ => println!("[{}] {message}", message.level()),
    }
}
