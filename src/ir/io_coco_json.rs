//! COCO JSON reader and writer.
//!
//! Two document kinds are handled:
//!
//! - ground-truth datasets (`info`, `licenses`, `images`, `annotations`,
//!   `categories`), converted to and from [`Dataset`];
//! - detection results, a bare JSON array of `{image_id, category_id, bbox,
//!   score}` objects as written by darknet and other detectors.
//!
//! COCO boxes are `[x, y, width, height]` with `(x, y)` the top-left corner.
//! Output is deterministic: lists are sorted by id.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{Annotation, Category, Dataset, DatasetInfo, Image, License};
use super::{AnnotationId, BBoxXYXY, CategoryId, ImageId, LicenseId, Pixel};
use crate::error::VocprepError;

// ============================================================================
// COCO Schema Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CocoDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<CocoInfo>,

    #[serde(default)]
    licenses: Vec<CocoLicense>,

    images: Vec<CocoImage>,

    #[serde(default)]
    annotations: Vec<CocoAnnotation>,

    categories: Vec<CocoCategory>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CocoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_created: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoLicense {
    id: u64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supercategory: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    /// `[x, y, width, height]`
    bbox: [f64; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<f64>,

    #[serde(default)]
    iscrowd: u8,

    /// Polygons or RLE. Read but ignored; written as the box outline.
    #[serde(default)]
    segmentation: serde_json::Value,
}

/// One element of a COCO detection results array.
///
/// Fields other than the four known ones are kept in `extra` and written
/// back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoResult {
    pub image_id: u64,
    pub category_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a ground-truth dataset from a COCO JSON file.
pub fn read_coco_json(path: &Path) -> Result<Dataset, VocprepError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let coco: CocoDataset =
        serde_json::from_reader(reader).map_err(|source| VocprepError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(coco_to_dataset(coco))
}

/// Writes a ground-truth dataset as pretty-printed COCO JSON.
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), VocprepError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let coco = dataset_to_coco(dataset);
    serde_json::to_writer_pretty(&mut writer, &coco).map_err(|source| {
        VocprepError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush()?;
    Ok(())
}

pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDataset = serde_json::from_str(json)?;
    Ok(coco_to_dataset(coco))
}

pub fn to_coco_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&dataset_to_coco(dataset))
}

/// Reads a COCO detection results array.
pub fn read_coco_results(path: &Path) -> Result<Vec<CocoResult>, VocprepError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| VocprepError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a COCO detection results array, pretty-printed.
pub fn write_coco_results(path: &Path, results: &[CocoResult]) -> Result<(), VocprepError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, results).map_err(|source| {
        VocprepError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush()?;
    Ok(())
}

/// Parses a detection results array from raw bytes. Used by the fuzz target.
pub fn from_coco_results_slice(bytes: &[u8]) -> Result<Vec<CocoResult>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

// ============================================================================
// Conversion: COCO -> Dataset
// ============================================================================

fn coco_to_dataset(coco: CocoDataset) -> Dataset {
    let info = coco
        .info
        .map(|info| DatasetInfo {
            description: info.description,
            url: info.url,
            version: info.version,
            year: info.year,
            contributor: info.contributor,
            date_created: info.date_created,
        })
        .unwrap_or_default();

    let licenses = coco
        .licenses
        .into_iter()
        .map(|l| License {
            id: LicenseId::new(l.id),
            name: l.name,
            url: l.url,
        })
        .collect();

    let images = coco
        .images
        .into_iter()
        .map(|img| Image {
            id: ImageId::new(img.id),
            file_name: img.file_name,
            width: img.width,
            height: img.height,
            license_id: img.license.map(LicenseId::new),
        })
        .collect();

    let categories = coco
        .categories
        .into_iter()
        .map(|cat| Category {
            id: CategoryId::new(cat.id),
            name: cat.name,
            supercategory: cat.supercategory,
        })
        .collect();

    let annotations = coco
        .annotations
        .into_iter()
        .map(|ann| {
            let [x, y, w, h] = ann.bbox;
            let mut annotation = Annotation::new(
                AnnotationId::new(ann.id),
                ImageId::new(ann.image_id),
                CategoryId::new(ann.category_id),
                BBoxXYXY::<Pixel>::from_xywh(x, y, w, h),
            );
            annotation.area = ann.area;
            annotation.iscrowd = ann.iscrowd != 0;
            annotation
        })
        .collect();

    Dataset {
        info,
        licenses,
        images,
        categories,
        annotations,
    }
}

// ============================================================================
// Conversion: Dataset -> COCO
// ============================================================================

fn dataset_to_coco(dataset: &Dataset) -> CocoDataset {
    let info = Some(CocoInfo {
        description: dataset.info.description.clone(),
        url: dataset.info.url.clone(),
        version: dataset.info.version.clone(),
        year: dataset.info.year,
        contributor: dataset.info.contributor.clone(),
        date_created: dataset.info.date_created.clone(),
    });

    let mut licenses: Vec<CocoLicense> = dataset
        .licenses
        .iter()
        .map(|l| CocoLicense {
            id: l.id.as_u64(),
            name: l.name.clone(),
            url: l.url.clone(),
        })
        .collect();
    licenses.sort_by_key(|l| l.id);

    let mut images: Vec<CocoImage> = dataset
        .images
        .iter()
        .map(|img| CocoImage {
            id: img.id.as_u64(),
            file_name: img.file_name.clone(),
            width: img.width,
            height: img.height,
            license: img.license_id.map(|l| l.as_u64()),
        })
        .collect();
    images.sort_by_key(|i| i.id);

    let mut categories: Vec<CocoCategory> = dataset
        .categories
        .iter()
        .map(|cat| CocoCategory {
            id: cat.id.as_u64(),
            name: cat.name.clone(),
            supercategory: cat.supercategory.clone(),
        })
        .collect();
    categories.sort_by_key(|c| c.id);

    let mut annotations: Vec<CocoAnnotation> = dataset
        .annotations
        .iter()
        .map(|ann| CocoAnnotation {
            id: ann.id.as_u64(),
            image_id: ann.image_id.as_u64(),
            category_id: ann.category_id.as_u64(),
            bbox: ann.bbox.to_xywh(),
            area: Some(ann.effective_area()),
            iscrowd: u8::from(ann.iscrowd),
            segmentation: serde_json::json!([ann.bbox.to_polygon()]),
        })
        .collect();
    annotations.sort_by_key(|a| a.id);

    CocoDataset {
        info,
        licenses,
        images,
        annotations,
        categories,
    }
}

// ============================================================================
// Tests
// ============================================================================
