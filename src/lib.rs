//! vocprep: dataset preparation for Pascal VOC, COCO and YOLO detection
//! pipelines.
//!
//! Each subcommand is a one-shot batch job over files on disk:
//!
//! - [`check`]: report missing files in a path list;
//! - [`labels`]: derive `label_map.txt` / `label_list.txt` from category
//!   directories;
//! - [`split`]: stratified train/validation split;
//! - [`aggregate`]: VOC XML to COCO ground truth;
//! - [`yolo`]: darknet YOLO label files and renaming;
//! - [`remap`]: fix category ids in detector output;
//! - [`eval`]: COCO bbox evaluation.
//!
//! Shared types and file formats live in [`ir`]; errors in [`error`].

pub mod aggregate;
pub mod check;
pub mod error;
pub mod eval;
pub mod ir;
pub mod labels;
pub mod remap;
pub mod split;
pub mod yolo;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::VocprepError;

use ir::{CategoryList, DatasetInfo};

/// The vocprep CLI application.
#[derive(Parser)]
#[command(name = "vocprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check that every path listed in a file exists.
    CheckFiles(CheckFilesArgs),

    /// Create label_map.txt and label_list.txt from category directories.
    LabelFiles(LabelFilesArgs),

    /// Split a category-per-directory dataset into training and validation lists.
    Split(SplitArgs),

    /// Build a COCO annotations file from an image list and VOC XML files.
    CocoAnnotations(CocoAnnotationsArgs),

    /// Write YOLO label files and normalize image names for darknet.
    YoloPreprocess(YoloPreprocessArgs),

    /// Remap darknet COCO category ids in a detection results file.
    FixResults(FixResultsArgs),

    /// Evaluate COCO detection results against COCO ground truth.
    Evaluate(EvaluateArgs),
}

#[derive(clap::Args)]
struct CheckFilesArgs {
    /// Text file with one path per line.
    #[arg(short = 'i', long = "input-list")]
    input_list: PathBuf,
}

#[derive(clap::Args)]
struct LabelFilesArgs {
    /// Dataset root with one sub-directory per category.
    #[arg(short = 'd', long = "data-dir")]
    data_dir: PathBuf,

    /// Existing directory to write the label files into.
    #[arg(short = 'o', long = "output-dir", default_value = "./")]
    output_dir: PathBuf,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Dataset root with one sub-directory per category, XML files next to images.
    #[arg(short = 'd', long = "data-dir")]
    data_dir: PathBuf,

    /// Extra training-only data, same layout as --data-dir.
    #[arg(short = 'e', long = "enhanced-data-dir")]
    enhanced_data_dir: Option<PathBuf>,

    /// Share of each category that goes to the validation set, in [0.0, 1.0].
    #[arg(short = 'r', long = "validation-ratio", default_value_t = split::DEFAULT_VALIDATION_RATIO)]
    validation_ratio: f64,

    /// Seed for a reproducible shuffle.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the four output lists.
    #[arg(long = "output-dir", default_value = ".")]
    output_dir: PathBuf,
}

#[derive(clap::Args)]
struct CocoAnnotationsArgs {
    /// Text file with one image path per line.
    #[arg(short = 'i', long = "image-set")]
    image_set: PathBuf,

    /// Text file with one category name per line.
    #[arg(short = 'c', long = "categories-file", env = "VOCPREP_CATEGORIES")]
    categories_file: PathBuf,

    /// Output COCO JSON path.
    #[arg(short = 'o', long, default_value = aggregate::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Dataset description for the info block.
    #[arg(long)]
    description: Option<String>,

    /// Dataset URL for the info block.
    #[arg(long)]
    url: Option<String>,

    /// Dataset version for the info block.
    #[arg(long = "dataset-version")]
    dataset_version: Option<String>,

    /// Dataset year for the info block.
    #[arg(long)]
    year: Option<u32>,

    /// Contributor for the info block.
    #[arg(long)]
    contributor: Option<String>,
}

#[derive(clap::Args)]
struct YoloPreprocessArgs {
    /// Dataset root containing an 'images' directory.
    #[arg(short = 'd', long = "data-dir")]
    data_dir: PathBuf,

    /// Training image list.
    #[arg(short = 't', long = "train-set")]
    train_set: Option<PathBuf>,

    /// Validation image list; these images get a numeric id appended.
    #[arg(short = 'v', long = "val-set")]
    val_set: Option<PathBuf>,

    /// Text file with one category name per line.
    #[arg(short = 'c', long = "categories-file", env = "VOCPREP_CATEGORIES")]
    categories_file: PathBuf,
}

#[derive(clap::Args)]
struct FixResultsArgs {
    /// Darknet COCO results JSON.
    #[arg(short = 'i', long = "input-path")]
    input_path: PathBuf,

    /// Output path [default: <input stem>_fixed.<ext>].
    #[arg(short = 'o', long = "output-path")]
    output_path: Option<PathBuf>,

    /// Sparse id table, one id per line, used instead of the darknet COCO table.
    #[arg(long = "id-list")]
    id_list: Option<PathBuf>,
}

#[derive(clap::Args)]
struct EvaluateArgs {
    /// COCO ground-truth annotations JSON.
    #[arg(short = 'a', long)]
    annotations: PathBuf,

    /// COCO detection results JSON.
    #[arg(short = 'r', long)]
    results: PathBuf,

    /// Output format for the summary ('text' or 'json').
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    output: String,
}

/// Run the vocprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), VocprepError> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match cli.command {
        Some(Commands::CheckFiles(args)) => run_check_files(args),
        Some(Commands::LabelFiles(args)) => run_label_files(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::CocoAnnotations(args)) => run_coco_annotations(args),
        Some(Commands::YoloPreprocess(args)) => run_yolo_preprocess(args),
        Some(Commands::FixResults(args)) => run_fix_results(args),
        Some(Commands::Evaluate(args)) => run_evaluate(args),
        None => {
            println!("vocprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Dataset preparation for VOC, COCO and YOLO detection pipelines.");
            println!();
            println!("Run 'vocprep --help' for usage information.");
            Ok(())
        }
    }
}

fn run_check_files(args: CheckFilesArgs) -> Result<(), VocprepError> {
    let report = check::check_file_list(&args.input_list)?;
    print!("{report}");
    Ok(())
}

fn run_label_files(args: LabelFilesArgs) -> Result<(), VocprepError> {
    let report = labels::write_label_files(&args.data_dir, &args.output_dir)?;
    println!(
        "Wrote {} categories to {} and {}",
        report.categories.len(),
        report.label_map_path.display(),
        report.label_list_path.display()
    );
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<(), VocprepError> {
    let opts = split::SplitOptions {
        data_dir: args.data_dir,
        enhanced_dir: args.enhanced_data_dir,
        ratio: args.validation_ratio,
        seed: args.seed,
        output_dir: args.output_dir,
    };
    let report = split::run_split(&opts)?;
    print!("{report}");
    Ok(())
}

fn run_coco_annotations(args: CocoAnnotationsArgs) -> Result<(), VocprepError> {
    if !args.image_set.is_file() {
        return Err(VocprepError::MissingFile {
            path: args.image_set,
        });
    }
    let categories = CategoryList::read(&args.categories_file)?;

    let info = DatasetInfo {
        description: args.description,
        url: args.url,
        version: args.dataset_version,
        year: args.year,
        contributor: args.contributor,
        date_created: None,
    };

    let report = aggregate::run_aggregate(&args.image_set, &categories, info, &args.output)?;
    print!("{report}");
    println!("Wrote {}", args.output.display());
    Ok(())
}

fn run_yolo_preprocess(args: YoloPreprocessArgs) -> Result<(), VocprepError> {
    let opts = yolo::YoloPreprocessOptions {
        data_dir: args.data_dir,
        train_set: args.train_set,
        val_set: args.val_set,
    };
    yolo::validate_yolo_options(&opts)?;
    let categories = CategoryList::read(&args.categories_file)?;

    let report = yolo::run_yolo_preprocess(&opts, &categories)?;
    print!("{report}");
    Ok(())
}

fn run_fix_results(args: FixResultsArgs) -> Result<(), VocprepError> {
    let map = match &args.id_list {
        Some(path) => remap::CategoryIdMap::from_sparse(&remap::read_id_list(path)?),
        None => remap::CategoryIdMap::darknet_coco(),
    };
    let output = args
        .output_path
        .unwrap_or_else(|| remap::default_output_path(&args.input_path));

    let count = remap::run_remap(&args.input_path, &output, &map)?;
    println!("Remapped {count} detections to {}", output.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<(), VocprepError> {
    let summary = eval::run_evaluation(&args.annotations, &args.results)?;

    match args.output.as_str() {
        "json" => {
            let json = summary
                .to_json_string()
                .map_err(|err| VocprepError::EvaluationFailed {
                    message: format!("cannot serialize summary: {err}"),
                })?;
            println!("{json}");
        }
        _ => print!("{summary}"),
    }
    Ok(())
}
