//! Builds a COCO ground-truth document from VOC XML annotations.
//!
//! Input is a list of image paths; each image's annotation is the XML file
//! with the same stem in the same directory. Image ids come from the
//! trailing `_<int>` of the file stem, so `cat_12.jpg` has id 12.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::VocprepError;
use crate::ir::io_coco_json::write_coco_json;
use crate::ir::io_voc_xml::{read_voc_xml, VOC_XML_EXTENSION};
use crate::ir::path_list::read_path_list;
use crate::ir::{
    Annotation, AnnotationId, CategoryId, CategoryList, Dataset, DatasetInfo, Image, ImageId,
    License,
};

/// Boxes with an area below this (32 x 32 px) are reported as small.
pub const SMALL_BOX_AREA: f64 = 32.0 * 32.0;

pub const DEFAULT_OUTPUT: &str = "annotations.json";

/// Id of the single placeholder license every image points at.
const PLACEHOLDER_LICENSE_ID: u64 = 0;

#[derive(Clone, Debug, Default)]
pub struct AggregateReport {
    pub images: usize,
    pub annotations: usize,
    pub small_boxes: usize,
    /// Images left out because their XML was unusable.
    pub skipped_images: Vec<PathBuf>,
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Aggregated {} images with {} annotations ({} small boxes)",
            self.images, self.annotations, self.small_boxes
        )?;
        if !self.skipped_images.is_empty() {
            writeln!(
                f,
                "  skipped {} image(s) with unusable annotations",
                self.skipped_images.len()
            )?;
        }
        Ok(())
    }
}

/// Parses the image id from the part of the file stem after the last `_`.
pub fn image_id_from_path(image_path: &Path) -> Result<ImageId, VocprepError> {
    image_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit_once('_'))
        .and_then(|(_, suffix)| suffix.parse::<u64>().ok())
        .map(ImageId::new)
        .ok_or_else(|| VocprepError::ImageIdParse {
            path: image_path.to_path_buf(),
        })
}

/// The same-stem `.xml` next to an image.
pub fn xml_path_for_image(image_path: &Path) -> PathBuf {
    image_path.with_extension(VOC_XML_EXTENSION)
}

/// Collects images and annotations for every listed image.
///
/// Missing image or XML files, unparsable image ids and two images sharing
/// an id abort the run.
/// Images whose XML is malformed or reports a zero size are skipped.
pub fn build_coco_dataset(
    image_paths: &[PathBuf],
    categories: &CategoryList,
    info: DatasetInfo,
) -> Result<(Dataset, AggregateReport), VocprepError> {
    let mut dataset = Dataset {
        info,
        licenses: vec![License::new(PLACEHOLDER_LICENSE_ID, "unknown")],
        categories: categories.coco_categories(),
        ..Default::default()
    };
    let mut report = AggregateReport::default();
    let mut next_annotation_id = 1u64;
    let mut seen_ids: BTreeMap<ImageId, &Path> = BTreeMap::new();

    for image_path in image_paths {
        if !image_path.is_file() {
            return Err(VocprepError::MissingFile {
                path: image_path.clone(),
            });
        }

        let image_id = image_id_from_path(image_path)?;

        let xml_path = xml_path_for_image(image_path);
        if !xml_path.is_file() {
            return Err(VocprepError::MissingFile { path: xml_path });
        }

        let voc = match read_voc_xml(&xml_path) {
            Ok(voc) => voc,
            Err(VocprepError::VocXmlParse { path, message }) => {
                log::warn!("skipping {}: {}", path.display(), message);
                report.skipped_images.push(image_path.clone());
                continue;
            }
            Err(err) => return Err(err),
        };

        let (Ok(width), Ok(height)) = (u32::try_from(voc.width), u32::try_from(voc.height))
        else {
            log::warn!("{} has invalid image size", xml_path.display());
            report.skipped_images.push(image_path.clone());
            continue;
        };
        if !voc.has_valid_size() {
            log::warn!("{} has invalid image size", xml_path.display());
            report.skipped_images.push(image_path.clone());
            continue;
        }

        if let Some(first) = seen_ids.insert(image_id, image_path) {
            return Err(VocprepError::DuplicateImageId {
                id: image_id.as_u64(),
                first: first.to_path_buf(),
                second: image_path.clone(),
            });
        }

        dataset.images.push(
            Image::new(image_id, image_path.to_string_lossy(), width, height)
                .with_license(PLACEHOLDER_LICENSE_ID),
        );

        for labeled in voc.labeled_boxes(categories, &xml_path) {
            let mut annotation = Annotation::new(
                AnnotationId::new(next_annotation_id),
                image_id,
                CategoryId::new(labeled.class_index as u64 + 1),
                labeled.bbox,
            );
            next_annotation_id += 1;

            let area = labeled.bbox.area();
            annotation.area = Some(area);
            if area < SMALL_BOX_AREA {
                log::info!("image {} has small gt box", image_path.display());
                report.small_boxes += 1;
            }

            dataset.annotations.push(annotation);
        }
    }

    report.images = dataset.images.len();
    report.annotations = dataset.annotations.len();
    Ok((dataset, report))
}

/// Reads the image list, aggregates and writes the COCO JSON to `output`.
pub fn run_aggregate(
    image_list: &Path,
    categories: &CategoryList,
    info: DatasetInfo,
    output: &Path,
) -> Result<AggregateReport, VocprepError> {
    let image_paths = read_path_list(image_list)?;
    let (dataset, report) = build_coco_dataset(&image_paths, categories, info)?;
    write_coco_json(output, &dataset)?;
    log::info!("wrote {}", output.display());
    Ok(report)
}
