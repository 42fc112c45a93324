//! Labelport: annotation exchange packages for a normalized annotation store.
//!
//! Labelport moves annotations between a store (datasets, images,
//! categories, annotations) and a portable exchange package: a COCO style
//! JSON document plus a tarball of the dataset's images, with privacy
//! sensitive regions blurred.
//!
//! # Modules
//!
//! - [`model`]: Store records (Dataset, Category, Image, Annotation, ...)
//! - [`store`]: Repository traits and the in-memory JSON-backed store
//! - [`exchange`]: Exchange document schema and JSON I/O
//! - [`redaction`]: Region blurring
//! - [`archive`]: Tarball packaging
//! - [`export`] / [`import`]: The two pipelines
//! - [`progress`]: Progress and job log reporting
//! - [`job`]: Job entry points wrapping the pipelines
//! - [`error`]: Error types for labelport operations

pub mod archive;
pub mod error;
pub mod exchange;
pub mod export;
pub mod import;
pub mod job;
pub mod model;
pub mod progress;
pub mod redaction;
pub mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::LabelportError;

use export::ExportOptions;
use job::JobOutcome;
use model::{CategoryId, DatasetId, JobId};

/// The labelport CLI application.
#[derive(Parser)]
#[command(name = "labelport")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Export a dataset as an exchange document plus a redacted image archive.
    Export(ExportArgs),
    /// Merge an exchange document into a dataset.
    Import(ImportArgs),
}

/// Arguments shared by every subcommand.
#[derive(clap::Args)]
struct StoreArgs {
    /// Store file (JSON).
    #[arg(long, env = "LABELPORT_STORE")]
    store: PathBuf,

    /// Target dataset id.
    #[arg(long)]
    dataset: u64,

    /// Job id used to tag progress and log events.
    #[arg(long, default_value_t = 1)]
    job_id: u64,

    /// Output format for the job result ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    common: StoreArgs,

    /// Category ids to export (comma separated).
    #[arg(long, value_delimiter = ',')]
    categories: Vec<u64>,

    /// Category ids whose bbox annotations are blurred (comma separated).
    #[arg(long, value_delimiter = ',')]
    blur: Vec<u64>,

    /// Gaussian sigma for blurred regions.
    #[arg(long, env = "LABELPORT_BLUR_SIGMA", default_value_t = redaction::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Format tag recorded on the export artifact.
    #[arg(long, env = "LABELPORT_FORMAT_TAG", default_value = "COCO")]
    format_tag: String,
}

/// Arguments for the import subcommand.
#[derive(clap::Args)]
struct ImportArgs {
    #[command(flatten)]
    common: StoreArgs,

    /// Exchange document to import.
    input: PathBuf,
}

/// Run the labelport CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelportError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Export(args)) => run_export(args),
        Some(Commands::Import(args)) => run_import(args),
        None => {
            println!("labelport {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation exchange packages: redacted export and idempotent import.");
            println!();
            println!("Run 'labelport --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the export subcommand.
fn run_export(args: ExportArgs) -> Result<(), LabelportError> {
    let mut store = store::read_store_json(&args.common.store)?;

    let options = ExportOptions {
        blur_sigma: args.blur_sigma,
        format_tag: args.format_tag,
        ..Default::default()
    };
    let categories: Vec<CategoryId> = args.categories.into_iter().map(CategoryId::new).collect();
    let blur: Vec<CategoryId> = args.blur.into_iter().map(CategoryId::new).collect();

    let outcome = job::run_export_job(
        JobId::new(args.common.job_id),
        &mut store,
        DatasetId::new(args.common.dataset),
        &categories,
        &blur,
        options,
    );

    store::write_store_json(&args.common.store, &store)?;
    print_outcome(&outcome, &args.common.output, |path| {
        println!("Export written to {}", path.display())
    })
}

/// Execute the import subcommand.
fn run_import(args: ImportArgs) -> Result<(), LabelportError> {
    let mut store = store::read_store_json(&args.common.store)?;
    let document = exchange::read_exchange_json(&args.input)?;

    let outcome = job::run_import_job(
        JobId::new(args.common.job_id),
        &mut store,
        DatasetId::new(args.common.dataset),
        &document,
    );

    // Import is at-least-once: whatever was merged before a failure stays.
    store::write_store_json(&args.common.store, &store)?;
    print_outcome(&outcome, &args.common.output, |summary| print!("{}", summary))
}

fn print_outcome<T: serde::Serialize>(
    outcome: &JobOutcome<T>,
    output: &str,
    print_text: impl FnOnce(&T),
) -> Result<(), LabelportError> {
    match output {
        "json" => {
            let json = serde_json::to_string_pretty(outcome).map_err(LabelportError::OutputJson)?;
            println!("{}", json);
        }
        _ => {
            if let Some(result) = &outcome.output {
                print_text(result);
            }
        }
    }

    if outcome.is_completed() {
        Ok(())
    } else {
        Err(LabelportError::JobFailed(outcome.job_id))
    }
}
