//! Prepares a VOC-annotated image tree for darknet YOLO training.
//!
//! For every listed image with at least one usable box this writes a label
//! file under `labels/`, renames images whose stem contains an image suffix
//! (darknet derives label paths by string replacement on those), and for the
//! validation set appends a sequential `_<n>` to the stem so darknet can
//! recover an image id. Surviving image and XML paths are written to new
//! manifests next to the input list.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VocprepError;
use crate::ir::io_voc_xml::{read_voc_xml, VOC_XML_EXTENSION};
use crate::ir::io_yolo::{label_path_for_image, write_label_file, YoloLabelRow};
use crate::ir::path_list::{read_path_list, sibling_with_suffix, write_path_list};
use crate::ir::CategoryList;
use crate::split::IMAGE_SUFFIXES;

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";

/// Which list is being processed. Validation images get an id appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSetKind {
    Train,
    Val,
}

impl ImageSetKind {
    fn appends_id(self) -> bool {
        matches!(self, ImageSetKind::Val)
    }
}

impl fmt::Display for ImageSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSetKind::Train => write!(f, "train"),
            ImageSetKind::Val => write!(f, "val"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct YoloPreprocessOptions {
    pub data_dir: PathBuf,
    pub train_set: Option<PathBuf>,
    pub val_set: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ImageSetReport {
    pub kind: ImageSetKind,
    pub list_path: PathBuf,
    pub listed: usize,
    /// Images that got a label file.
    pub processed: usize,
    pub renamed: usize,
    pub image_manifest: Option<PathBuf>,
    pub xml_manifest: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct YoloPreprocessReport {
    pub sets: Vec<ImageSetReport>,
}

impl fmt::Display for YoloPreprocessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in &self.sets {
            writeln!(
                f,
                "{} set {}: {} of {} images labeled, {} renamed",
                set.kind,
                set.list_path.display(),
                set.processed,
                set.listed,
                set.renamed
            )?;
            if let (Some(images), Some(xmls)) = (&set.image_manifest, &set.xml_manifest) {
                writeln!(f, "  wrote {}", images.display())?;
                writeln!(f, "  wrote {}", xmls.display())?;
            }
        }
        Ok(())
    }
}

pub fn validate_yolo_options(opts: &YoloPreprocessOptions) -> Result<(), VocprepError> {
    if !opts.data_dir.is_dir() {
        return Err(VocprepError::MissingDirectory {
            path: opts.data_dir.clone(),
        });
    }

    if !opts.data_dir.join(IMAGES_DIR).is_dir() {
        return Err(VocprepError::LayoutInvalid {
            path: opts.data_dir.clone(),
            message: format!("must contain a sub-directory named '{IMAGES_DIR}'"),
        });
    }

    if opts.train_set.is_none() && opts.val_set.is_none() {
        return Err(VocprepError::InvalidArgument(
            "specify at least one image set with --train-set or --val-set".to_string(),
        ));
    }

    for list in [&opts.train_set, &opts.val_set].into_iter().flatten() {
        if !list.is_file() {
            return Err(VocprepError::MissingFile { path: list.clone() });
        }
    }

    Ok(())
}

/// Removes `<data_dir>/labels` if present and creates it empty.
pub fn reset_labels_dir(data_dir: &Path) -> Result<PathBuf, VocprepError> {
    let labels_dir = data_dir.join(LABELS_DIR);
    if labels_dir.is_dir() {
        fs::remove_dir_all(&labels_dir)?;
    }
    fs::create_dir(&labels_dir)?;
    Ok(labels_dir)
}

/// YOLO rows for one XML file.
///
/// Unparsable files and files with a width or height below one pixel yield
/// no rows.
pub fn yolo_rows_for_xml(
    xml_path: &Path,
    categories: &CategoryList,
) -> Result<Vec<YoloLabelRow>, VocprepError> {
    let voc = match read_voc_xml(xml_path) {
        Ok(voc) => voc,
        Err(VocprepError::VocXmlParse { path, message }) => {
            log::warn!("skipping {}: {}", path.display(), message);
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    if !voc.has_valid_size() {
        log::warn!(
            "{} has invalid image size: width {}, height {}",
            xml_path.display(),
            voc.width,
            voc.height
        );
        return Ok(Vec::new());
    }

    let (width, height) = (voc.width as f64, voc.height as f64);
    Ok(voc
        .labeled_boxes(categories, xml_path)
        .iter()
        .map(|labeled| YoloLabelRow::from_labeled_box(labeled, width, height))
        .collect())
}

/// Removes the dot from every image suffix embedded in a stem, so that
/// `cat.jpg_1` becomes `catjpg_1`.
pub fn strip_suffix_variants(stem: &str) -> String {
    IMAGE_SUFFIXES
        .iter()
        .fold(stem.to_string(), |fixed, suffix| {
            fixed.replace(suffix, &suffix[1..])
        })
}

/// Renames an image and its same-stem XML. The image moves first; a failure
/// on the XML leaves the image renamed.
fn rename_pair(image_from: &Path, image_to: &Path) -> Result<(), VocprepError> {
    let xml_from = image_from.with_extension(VOC_XML_EXTENSION);
    let xml_to = image_to.with_extension(VOC_XML_EXTENSION);

    for (from, to) in [(image_from, image_to), (xml_from.as_path(), xml_to.as_path())] {
        fs::rename(from, to).map_err(|source| VocprepError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;
        log::info!("rename {} to {}", from.display(), to.display());
    }

    Ok(())
}

/// Strips embedded image suffixes from the stem, renaming image and XML if
/// anything changed. Returns the (possibly unchanged) image path.
pub fn fix_image_name(image_path: &Path) -> Result<PathBuf, VocprepError> {
    let Some(stem) = image_path.file_stem().and_then(|stem| stem.to_str()) else {
        return Ok(image_path.to_path_buf());
    };

    let fixed_stem = strip_suffix_variants(stem);
    if fixed_stem == stem {
        return Ok(image_path.to_path_buf());
    }

    let mut file_name = OsString::from(fixed_stem);
    if let Some(ext) = image_path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    let fixed = image_path.with_file_name(file_name);

    rename_pair(image_path, &fixed)?;
    Ok(fixed)
}

/// Appends `_<id>` to the stem, renaming image and XML.
pub fn append_image_id(image_path: &Path, id: u64) -> Result<PathBuf, VocprepError> {
    let renamed = sibling_with_suffix(image_path, &format!("_{id}"));
    rename_pair(image_path, &renamed)?;
    Ok(renamed)
}

/// Processes one image list.
pub fn process_image_set(
    list_path: &Path,
    categories: &CategoryList,
    kind: ImageSetKind,
) -> Result<ImageSetReport, VocprepError> {
    let image_paths = read_path_list(list_path)?;

    let mut report = ImageSetReport {
        kind,
        list_path: list_path.to_path_buf(),
        listed: image_paths.len(),
        processed: 0,
        renamed: 0,
        image_manifest: None,
        xml_manifest: None,
    };
    let mut valid_images = Vec::new();
    let mut valid_xmls = Vec::new();
    let mut next_id = 1u64;

    for image_path in image_paths {
        let xml_path = image_path.with_extension(VOC_XML_EXTENSION);
        if !image_path.is_file() || !xml_path.is_file() {
            log::debug!("skipping {}: image or annotation missing", image_path.display());
            continue;
        }

        let rows = yolo_rows_for_xml(&xml_path, categories)?;
        if rows.is_empty() {
            log::debug!("skipping {}: no usable boxes", image_path.display());
            continue;
        }

        let mut final_path = fix_image_name(&image_path)?;
        if kind.appends_id() {
            final_path = append_image_id(&final_path, next_id)?;
            next_id += 1;
        }
        if final_path != image_path {
            report.renamed += 1;
        }

        write_label_file(&label_path_for_image(&final_path), &rows)?;

        valid_xmls.push(final_path.with_extension(VOC_XML_EXTENSION));
        valid_images.push(final_path);
    }

    report.processed = valid_images.len();
    if report.processed > 0 {
        let n = report.processed;
        let image_manifest = sibling_with_suffix(list_path, &format!("_yolo_{n}"));
        let xml_manifest = image_manifest.with_extension(VOC_XML_EXTENSION);

        write_path_list(&image_manifest, valid_images.iter().map(PathBuf::as_path))?;
        write_path_list(&xml_manifest, valid_xmls.iter().map(PathBuf::as_path))?;

        report.image_manifest = Some(image_manifest);
        report.xml_manifest = Some(xml_manifest);
    }

    Ok(report)
}

/// Validates options, resets `labels/` and processes the train then the
/// validation list.
pub fn run_yolo_preprocess(
    opts: &YoloPreprocessOptions,
    categories: &CategoryList,
) -> Result<YoloPreprocessReport, VocprepError> {
    validate_yolo_options(opts)?;
    reset_labels_dir(&opts.data_dir)?;

    let mut report = YoloPreprocessReport::default();
    let sets = [
        (ImageSetKind::Train, &opts.train_set),
        (ImageSetKind::Val, &opts.val_set),
    ];
    for (kind, list) in sets {
        if let Some(list) = list {
            report.sets.push(process_image_set(list, categories, kind)?);
        }
    }

    Ok(report)
}
