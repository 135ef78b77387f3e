//! In-memory detection dataset shared by the COCO writer, reader and evaluator.
//!
//! Boxes are always pixel-space XYXY; COCO's XYWH layout only exists in
//! [`io_coco_json`](super::io_coco_json).

use super::bbox::BBoxXYXY;
use super::ids::{AnnotationId, CategoryId, ImageId, LicenseId};
use super::space::Pixel;

/// A ground-truth detection dataset.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub info: DatasetInfo,
    pub licenses: Vec<License>,
    pub images: Vec<Image>,
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
}

/// The COCO `info` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetInfo {
    pub description: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub year: Option<u32>,
    pub contributor: Option<String>,
    pub date_created: Option<String>,
}

#[derive(Clone, Debug)]
pub struct License {
    pub id: LicenseId,
    pub name: String,
    pub url: Option<String>,
}

impl License {
    pub fn new(id: impl Into<LicenseId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: None,
        }
    }
}

/// An image record.
#[derive(Clone, Debug)]
pub struct Image {
    pub id: ImageId,
    /// Path of the image as listed in the input manifest.
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub license_id: Option<LicenseId>,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            license_id: None,
        }
    }

    pub fn with_license(mut self, license_id: impl Into<LicenseId>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }
}

/// A category (class label).
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: Option<String>,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
        }
    }
}

/// A labeled box on one image.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub bbox: BBoxXYXY<Pixel>,
    /// Area as stored in the source file; the box area is used when absent.
    pub area: Option<f64>,
    pub iscrowd: bool,
}

impl Annotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYXY<Pixel>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            area: None,
            iscrowd: false,
        }
    }

    /// Area used for COCO output and for evaluation area ranges.
    pub fn effective_area(&self) -> f64 {
        self.area.unwrap_or_else(|| self.bbox.area())
    }
}
