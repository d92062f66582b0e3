//! Berryscan: strawberry disease dataset tooling and two-stage detection.
//!
//! Berryscan merges YOLO datasets whose class lists disagree into a single
//! class index space, and runs a "part-first" inference pipeline in which a
//! locator model finds plant parts and a classifier model looks for disease
//! inside each part.
//!
//! # Modules
//!
//! - [`dataset`]: Class-list merging, label remapping and dataset moves
//! - [`detect`]: The detector seam, the external-command detector and box drawing
//! - [`pipeline`]: Region cropping, compositing and prediction assembly
//! - [`config`]: The pipeline configuration file
//! - [`error`]: Error types for berryscan operations

pub mod config;
pub mod dataset;
pub mod detect;
pub mod error;
pub mod files;
pub mod geometry;
pub mod logging;
pub mod pipeline;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;

use config::{validate_threshold, PipelineConfig};
use detect::{Annotator, ExternalDetector};
use pipeline::{DetectionMode, OutputOptions, RegionClassifier, RegionDetector, TwoStagePipeline};

pub use error::BerryscanError;

/// The berryscan CLI application.
#[derive(Parser)]
#[command(name = "berryscan")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Move a dataset into another, merging class lists and remapping labels.
    Combine(CombineArgs),
    /// Rewrite class indices of every label file in place.
    Relabel(RelabelArgs),
    /// Show the merged class list and index mapping without moving anything.
    MergeNames(MergeNamesArgs),
    /// Run the detection pipeline on one image and print the JSON result.
    Predict(PredictArgs),
    /// Run the detection pipeline on every image in a folder.
    PredictFolder(PredictFolderArgs),
}

/// Arguments for the combine subcommand.
#[derive(clap::Args)]
struct CombineArgs {
    /// Dataset whose files are moved (consumed).
    source: PathBuf,

    /// Dataset that receives the files; its data.yaml is updated.
    target: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the relabel subcommand.
#[derive(clap::Args)]
struct RelabelArgs {
    /// Dataset root containing train/valid/test splits.
    root: PathBuf,

    /// Class index rewrite, repeatable (e.g. --map 0=3 --map 1=3).
    #[arg(long = "map", value_name = "OLD=NEW", required = true)]
    map: Vec<String>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the merge-names subcommand.
#[derive(clap::Args)]
struct MergeNamesArgs {
    /// Dataset whose classes would be merged in.
    source: PathBuf,

    /// Dataset whose class order is kept.
    target: PathBuf,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Pipeline options shared by predict and predict-folder.
#[derive(clap::Args)]
struct PipelineArgs {
    /// Pipeline config file (YAML).
    #[arg(long, env = "BERRYSCAN_CONFIG")]
    config: PathBuf,

    /// Detection mode ('part-first' or 'direct').
    #[arg(long, default_value = "part-first")]
    mode: String,

    /// Override the locator confidence threshold.
    #[arg(long)]
    locator_conf: Option<f64>,

    /// Override the classifier confidence threshold.
    #[arg(long)]
    classifier_conf: Option<f64>,

    /// Override the directory crop references are made relative to.
    #[arg(long)]
    crop_url_root: Option<PathBuf>,
}

/// Arguments for the predict subcommand.
#[derive(clap::Args)]
struct PredictArgs {
    /// Image to run on.
    image: PathBuf,

    /// Directory for the annotated image and crops.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

/// Arguments for the predict-folder subcommand.
#[derive(clap::Args)]
struct PredictFolderArgs {
    /// Folder of images.
    input: PathBuf,

    /// Output root; each image gets `<out>/<relative dir>/<stem>/`.
    #[arg(long)]
    out: PathBuf,

    /// Descend into subfolders.
    #[arg(long)]
    recursive: bool,

    /// Also write a CSV summary to this path.
    #[arg(long)]
    summary_csv: Option<PathBuf>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

/// Run the berryscan CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BerryscanError> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Combine(args)) => run_combine(args),
        Some(Commands::Relabel(args)) => run_relabel(args),
        Some(Commands::MergeNames(args)) => run_merge_names(args),
        Some(Commands::Predict(args)) => run_predict(args),
        Some(Commands::PredictFolder(args)) => run_predict_folder(args),
        None => {
            println!("berryscan {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Strawberry disease dataset tooling and two-stage detection.");
            println!();
            println!("Run 'berryscan --help' for usage information.");
            Ok(())
        }
    }
}

fn check_output_format(output: &str) -> Result<(), BerryscanError> {
    match output {
        "text" | "json" => Ok(()),
        other => Err(BerryscanError::UnsupportedFormat(format!(
            "output '{}' (supported: text, json)",
            other
        ))),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), BerryscanError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| BerryscanError::Io(std::io::Error::other(e)))?;
    println!("{}", json);
    Ok(())
}

/// Prints `value` as text or pretty JSON.
fn emit<T: Serialize + std::fmt::Display>(value: &T, output: &str) -> Result<(), BerryscanError> {
    check_output_format(output)?;
    if output == "json" {
        print_json(value)
    } else {
        print!("{}", value);
        Ok(())
    }
}

/// Execute the combine subcommand.
fn run_combine(args: CombineArgs) -> Result<(), BerryscanError> {
    // Reject a bad format before any file is moved.
    check_output_format(&args.output)?;

    let report = dataset::combine_dataset(&args.source, &args.target)?;
    emit(&report, &args.output)?;

    if report.is_complete() {
        Ok(())
    } else {
        Err(BerryscanError::CombineIncomplete {
            failed_splits: report.failed_split_count(),
            failed_files: report.failed_file_count(),
            report,
        })
    }
}

/// Execute the relabel subcommand.
fn run_relabel(args: RelabelArgs) -> Result<(), BerryscanError> {
    check_output_format(&args.output)?;
    let mapping = dataset::parse_mapping_pairs(&args.map)?;
    let report = dataset::relabel_dataset(&args.root, &mapping)?;
    emit(&report, &args.output)
}

/// Execute the merge-names subcommand.
fn run_merge_names(args: MergeNamesArgs) -> Result<(), BerryscanError> {
    let merge = dataset::preview_merge(&args.source, &args.target)?;

    check_output_format(&args.output)?;
    if args.output == "json" {
        return print_json(&merge);
    }

    println!("Merged names ({}):", merge.names.len());
    for (index, name) in merge.names.iter().enumerate() {
        println!("  {}: {}", index, name);
    }
    if merge.appended.is_empty() {
        println!("Appended: (none)");
    } else {
        println!("Appended: {}", merge.appended.join(", "));
    }
    println!("Mapping: {}", merge.mapping);
    Ok(())
}

/// Detectors built from the config file, owned for the whole command.
struct PipelineSetup {
    mode: DetectionMode,
    config: PipelineConfig,
    locator: Option<ExternalDetector>,
    classifier: ExternalDetector,
    annotator: Annotator,
}

impl PipelineSetup {
    fn load(args: &PipelineArgs) -> Result<Self, BerryscanError> {
        let mode: DetectionMode = args.mode.parse()?;
        let mut config = PipelineConfig::from_yaml_file(&args.config)?;

        if let Some(conf) = args.locator_conf {
            validate_threshold("--locator-conf", conf)?;
            if let Some(locator) = &mut config.locator {
                locator.confidence = conf;
            }
        }
        if let Some(conf) = args.classifier_conf {
            validate_threshold("--classifier-conf", conf)?;
            config.classifier.confidence = conf;
        }
        if let Some(root) = &args.crop_url_root {
            config.output.crop_url_root = Some(root.clone());
        }

        let locator = match mode {
            DetectionMode::PartFirst => {
                let spec = config.locator.as_ref().ok_or_else(|| BerryscanError::ConfigInvalid {
                    message: format!(
                        "part-first mode needs a `locator` entry in {}",
                        args.config.display()
                    ),
                })?;
                Some(ExternalDetector::from_spec(spec)?)
            }
            DetectionMode::Direct => None,
        };
        let classifier = ExternalDetector::from_spec(&config.classifier)?;
        let annotator = Annotator::from_style(config.annotation.clone())?;

        Ok(Self {
            mode,
            config,
            locator,
            classifier,
            annotator,
        })
    }

    fn pipeline(&self) -> TwoStagePipeline<'_> {
        let locator_conf = self
            .config
            .locator
            .as_ref()
            .map(|spec| spec.confidence)
            .unwrap_or(config::DEFAULT_CONFIDENCE);
        TwoStagePipeline::new(
            self.locator
                .as_ref()
                .map(|detector| RegionDetector::new(detector, locator_conf)),
            RegionClassifier::new(&self.classifier, self.config.classifier.confidence),
            self.annotator.clone(),
        )
    }

    fn output_options(&self, output_dir: &Path) -> OutputOptions {
        OutputOptions {
            output_dir: output_dir.to_path_buf(),
            crop_url_root: self.config.output.crop_url_root.clone(),
        }
    }
}

/// Execute the predict subcommand.
fn run_predict(args: PredictArgs) -> Result<(), BerryscanError> {
    let setup = PipelineSetup::load(&args.pipeline)?;
    let two_stage = setup.pipeline();
    let outcome = pipeline::process_image(
        &two_stage,
        setup.mode,
        &args.image,
        &setup.output_options(&args.out),
    );

    print_json(&outcome)?;

    if outcome.is_success() {
        Ok(())
    } else {
        Err(BerryscanError::BatchIncomplete {
            failed: 1,
            total: 1,
        })
    }
}

/// Execute the predict-folder subcommand.
fn run_predict_folder(args: PredictFolderArgs) -> Result<(), BerryscanError> {
    check_output_format(&args.output)?;
    let setup = PipelineSetup::load(&args.pipeline)?;
    let two_stage = setup.pipeline();
    let report = pipeline::process_folder(
        &two_stage,
        setup.mode,
        &args.input,
        &setup.output_options(&args.out),
        args.recursive,
    )?;

    if let Some(path) = &args.summary_csv {
        report.write_csv_summary(path)?;
    }
    emit(&report, &args.output)?;

    if report.is_complete() {
        Ok(())
    } else {
        Err(BerryscanError::BatchIncomplete {
            failed: report.failed_count(),
            total: report.total(),
        })
    }
}
