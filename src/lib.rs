//! waffle-hub: Waffle dataset tooling.
//!
//! Waffle datasets are directories of per-record JSON files with two-level
//! categories (supercategory / name). This crate moves them in and out of
//! the Superb AI labeling platform's export format through an in-memory
//! intermediate representation (IR), and coordinates a model's train,
//! inference and export lifecycle around a pluggable training backend.
//!
//! # Modules
//!
//! - [`ir`]: IR types plus the Waffle and Superb AI directory adapters
//! - [`hub`]: model hub directories, configs and the [`hub::Backend`] seam
//! - [`validation`]: dataset validation and error reporting
//! - [`error`]: the crate error type

pub mod error;
pub mod hub;
pub mod ir;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use error::WaffleError;

use ir::io_superb_ai::{self, SuperbExportOptions};
use ir::io_waffle::{self, WaffleDataset};
use ir::TaskType;

/// The waffle-hub CLI application.
#[derive(Parser)]
#[command(name = "waffle-hub")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log progress (info level). RUST_LOG overrides.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a Superb AI export as a new Waffle dataset.
    ImportSuperbAi(ImportArgs),
    /// Export a Waffle dataset in Superb AI format.
    ExportSuperbAi(ExportArgs),
    /// Validate a dataset for errors and warnings.
    Validate(ValidateArgs),
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Name of the Waffle dataset to create.
    #[arg(long)]
    name: String,

    /// Directory holding project.json, meta/ and labels/.
    #[arg(long)]
    label_dir: PathBuf,

    /// Directory image data keys are resolved against (defaults to --label-dir).
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Root directory for Waffle datasets.
    #[arg(long, env = "WAFFLE_DATASET_ROOT", default_value = io_waffle::DEFAULT_ROOT_DIR)]
    root_dir: PathBuf,

    /// Task the dataset is for.
    #[arg(long, default_value = "object_detection", value_parser = parse_task)]
    task: TaskType,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Name of the Waffle dataset to export.
    #[arg(long)]
    name: String,

    /// Root directory for Waffle datasets.
    #[arg(long, env = "WAFFLE_DATASET_ROOT", default_value = io_waffle::DEFAULT_ROOT_DIR)]
    root_dir: PathBuf,

    /// Directory to write the Superb AI export into.
    #[arg(short, long)]
    output: PathBuf,

    /// Seed for class colors, for reproducible exports.
    #[arg(long)]
    seed: Option<u64>,

    /// Value for every meta file's work_assignee.
    #[arg(long, default_value = io_superb_ai::DEFAULT_WORK_ASSIGNEE)]
    work_assignee: String,

    /// Value for every meta file's status.
    #[arg(long, default_value = io_superb_ai::DEFAULT_STATUS)]
    status: String,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Dataset directory (waffle) or label directory (superb-ai).
    input: PathBuf,

    /// Input format ('waffle' or 'superb-ai').
    #[arg(long, default_value = "waffle")]
    format: String,

    /// Image directory for 'superb-ai' input (defaults to the input).
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

fn parse_task(value: &str) -> Result<TaskType, String> {
    value.parse()
}

/// Run the waffle-hub CLI. Called from `main.rs`.
pub fn run() -> Result<(), WaffleError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::ImportSuperbAi(args)) => run_import(args),
        Some(Commands::ExportSuperbAi(args)) => run_export(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("waffle-hub {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Waffle dataset tooling.");
            println!();
            println!("Run 'waffle-hub --help' for usage information.");
            Ok(())
        }
    }
}

/// Logs go to stderr so `validate --output json` stays parseable.
fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("waffle_hub={level}")));
    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_import(args: ImportArgs) -> Result<(), WaffleError> {
    let image_dir = args.image_dir.as_deref().unwrap_or(&args.label_dir);
    let (target, dataset) = io_superb_ai::create_from_superb_ai(
        image_dir,
        &args.label_dir,
        &args.name,
        Some(args.root_dir.as_path()),
        args.task,
    )?;

    println!(
        "Imported {} images ({} categories, {} annotations) into {}",
        dataset.images.len(),
        dataset.categories.len(),
        dataset.annotations.len(),
        target.dataset_dir().display()
    );
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), WaffleError> {
    let source = WaffleDataset::open(&args.name, Some(args.root_dir.as_path()))?;
    let opts = SuperbExportOptions {
        seed: args.seed,
        work_assignee: args.work_assignee,
        status: args.status,
    };
    let export_dir = io_superb_ai::export_superb_ai(&source, &args.output, &opts)?;

    println!("Exported {} to {}", source.name(), export_dir.display());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), WaffleError> {
    let report = match args.format.as_str() {
        "waffle" => {
            let dataset = io_waffle::read_waffle_dir(&args.input)?;
            let mut report = validation::validate_dataset(&dataset, &validate_opts(&args));
            report.extend(validation::validate_raw_images(
                &dataset,
                &args.input.join("raw"),
            ));
            report
        }
        "superb-ai" | "superb_ai" => {
            let image_dir: &Path = args.image_dir.as_deref().unwrap_or(&args.input);
            let dataset = io_superb_ai::read_superb_ai(image_dir, &args.input)?;
            validation::validate_dataset(&dataset, &validate_opts(&args))
        }
        other => {
            return Err(WaffleError::UnsupportedFormat(format!(
                "'{}' (supported: waffle, superb-ai)",
                other
            )));
        }
    };

    match args.output.as_str() {
        "json" => {
            let json = report.to_json().map_err(|source| WaffleError::JsonWrite {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
            println!("{}", json);
        }
        _ => print!("{}", report),
    }

    if report.passes(args.strict) {
        Ok(())
    } else {
        Err(WaffleError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    }
}

fn validate_opts(args: &ValidateArgs) -> validation::ValidateOptions {
    validation::ValidateOptions {
        strict: args.strict,
    }
}
