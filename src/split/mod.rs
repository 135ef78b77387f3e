//! Stratified train/validation split over a category-per-directory corpus.
//!
//! Each category directory holds VOC XML files next to their images. Pairs
//! are shuffled per category and the first `floor(total * ratio)` go to the
//! validation set, so every category keeps its share. An optional enhanced
//! pool (augmented samples) only ever feeds the training set.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use walkdir::WalkDir;

use crate::error::VocprepError;
use crate::ir::io_voc_xml::has_xml_extension;
use crate::ir::path_list::write_path_list;

/// Image suffixes tried, in order, when looking for the image of an XML file.
pub const IMAGE_SUFFIXES: [&str; 6] = [".jpg", ".png", ".jpeg", ".JPG", ".PNG", ".JPEG"];

pub const DEFAULT_VALIDATION_RATIO: f64 = 0.1;

/// An annotation file and its image, tagged with the category directory they
/// were found in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPair {
    pub category: String,
    pub xml_path: PathBuf,
    pub image_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SplitOptions {
    pub data_dir: PathBuf,
    pub enhanced_dir: Option<PathBuf>,
    pub ratio: f64,
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct DatasetSplit {
    pub train: Vec<SplitPair>,
    pub val: Vec<SplitPair>,
}

/// Summary of a split run.
#[derive(Clone, Debug, Default)]
pub struct SplitReport {
    pub categories: usize,
    pub train_count: usize,
    pub val_count: usize,
    pub enhanced_count: usize,
    /// XML files skipped because no image was found next to them.
    pub unmatched_xml: Vec<PathBuf>,
    pub seed: u64,
    pub written: Vec<PathBuf>,
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Split {} categories: {} training pairs ({} enhanced), {} validation pairs (seed {})",
            self.categories, self.train_count, self.enhanced_count, self.val_count, self.seed
        )?;
        if !self.unmatched_xml.is_empty() {
            writeln!(
                f,
                "  {} annotation file(s) had no image",
                self.unmatched_xml.len()
            )?;
        }
        for path in &self.written {
            writeln!(f, "  wrote {}", path.display())?;
        }
        Ok(())
    }
}

/// Validate split options before touching the filesystem.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), VocprepError> {
    if !(0.0..=1.0).contains(&opts.ratio) {
        return Err(VocprepError::InvalidArgument(
            "the ratio for the validation set must be within [0.0, 1.0]".to_string(),
        ));
    }

    if !opts.data_dir.is_dir() {
        return Err(VocprepError::MissingDirectory {
            path: opts.data_dir.clone(),
        });
    }

    if !opts.output_dir.is_dir() {
        return Err(VocprepError::MissingDirectory {
            path: opts.output_dir.clone(),
        });
    }

    Ok(())
}

/// Looks for `<xml path without extension><suffix>` for each known image
/// suffix and returns the first existing file.
pub fn find_image_for_xml(xml_path: &Path) -> Option<PathBuf> {
    let base = xml_path.with_extension("");

    IMAGE_SUFFIXES.iter().find_map(|suffix| {
        let mut candidate = OsString::from(base.as_os_str());
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        candidate.is_file().then_some(candidate)
    })
}

/// Pairs collected from one root directory: matched pairs grouped by
/// category, plus the XML files without an image.
#[derive(Debug, Default)]
struct CollectedPairs {
    by_category: Vec<Vec<SplitPair>>,
    unmatched: Vec<PathBuf>,
}

/// Scans every category subdirectory of `root`, in name order.
fn collect_pairs(root: &Path) -> Result<CollectedPairs, VocprepError> {
    let mut collected = CollectedPairs::default();

    for category_entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let category_entry = category_entry.map_err(|err| VocprepError::Io(err.into()))?;
        if !category_entry.file_type().is_dir() {
            continue;
        }

        let category = category_entry.file_name().to_string_lossy().into_owned();
        let mut pairs = Vec::new();

        for entry in WalkDir::new(category_entry.path())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| VocprepError::Io(err.into()))?;
            if !entry.file_type().is_file() || !has_xml_extension(entry.path()) {
                continue;
            }

            let xml_path = entry.into_path();
            match find_image_for_xml(&xml_path) {
                Some(image_path) => pairs.push(SplitPair {
                    category: category.clone(),
                    xml_path,
                    image_path,
                }),
                None => collected.unmatched.push(xml_path),
            }
        }

        collected.by_category.push(pairs);
    }

    Ok(collected)
}

/// Shuffles one category's pairs and splits off the validation share.
///
/// Returns `(train, val)` with `val.len() == floor(total * ratio)`.
pub fn split_category(
    mut pairs: Vec<SplitPair>,
    ratio: f64,
    rng: &mut StdRng,
) -> (Vec<SplitPair>, Vec<SplitPair>) {
    pairs.shuffle(rng);
    let num_val = ((pairs.len() as f64) * ratio).floor() as usize;
    let train = pairs.split_off(num_val.min(pairs.len()));
    (train, pairs)
}

/// Builds the split in memory without writing anything.
pub fn split_dataset(
    opts: &SplitOptions,
    rng: &mut StdRng,
) -> Result<(DatasetSplit, SplitReport), VocprepError> {
    let data_dir = std::path::absolute(&opts.data_dir)?;
    let collected = collect_pairs(&data_dir)?;

    let mut split = DatasetSplit::default();
    let mut report = SplitReport {
        categories: collected.by_category.len(),
        ..Default::default()
    };

    for xml_path in &collected.unmatched {
        log::warn!("{} has no corresponding image", xml_path.display());
    }
    report.unmatched_xml = collected.unmatched;

    for pairs in collected.by_category {
        if pairs.is_empty() {
            continue;
        }
        let (train, val) = split_category(pairs, opts.ratio, rng);
        split.train.extend(train);
        split.val.extend(val);
    }

    if let Some(enhanced_dir) = &opts.enhanced_dir {
        if enhanced_dir.is_dir() {
            let enhanced_dir = std::path::absolute(enhanced_dir)?;
            let enhanced = collect_pairs(&enhanced_dir)?;
            for xml_path in &enhanced.unmatched {
                log::debug!("{} has no corresponding image", xml_path.display());
            }

            let pairs: Vec<SplitPair> = enhanced.by_category.into_iter().flatten().collect();
            report.enhanced_count = pairs.len();
            split.train.extend(pairs);
            split.train.shuffle(rng);
        } else {
            log::warn!(
                "the enhanced training data directory {} does not exist, ignore it",
                enhanced_dir.display()
            );
        }
    }

    report.train_count = split.train.len();
    report.val_count = split.val.len();

    Ok((split, report))
}

/// Runs the split and writes the four path lists into `opts.output_dir`.
pub fn run_split(opts: &SplitOptions) -> Result<SplitReport, VocprepError> {
    validate_split_options(opts)?;

    let seed = opts.seed.unwrap_or_else(rand::random);
    log::debug!("split seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let (split, mut report) = split_dataset(opts, &mut rng)?;
    report.seed = seed;

    for (prefix, pairs) in [("train", &split.train), ("val", &split.val)] {
        let xml_list = opts
            .output_dir
            .join(format!("{prefix}_xml_paths_{}.txt", pairs.len()));
        let image_list = opts
            .output_dir
            .join(format!("{prefix}_image_paths_{}.txt", pairs.len()));

        write_path_list(&xml_list, pairs.iter().map(|p| p.xml_path.as_path()))?;
        write_path_list(&image_list, pairs.iter().map(|p| p.image_path.as_path()))?;

        report.written.push(xml_list);
        report.written.push(image_list);
    }

    Ok(report)
}
