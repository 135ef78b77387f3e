//! Darknet YOLO label files.
//!
//! One file per image, one row per box:
//! `<class_id> <cx> <cy> <w> <h>` with normalized center coordinates.
//! Label files live in a `labels/` tree mirroring the `images/` tree.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use super::io_voc_xml::LabeledBox;
use super::{BBoxCxCyWh, Normalized};
use crate::error::VocprepError;

pub const LABEL_EXTENSION: &str = "txt";

const IMAGES_DIR: &str = "images";
const LABELS_DIR: &str = "labels";

/// One row of a YOLO label file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloLabelRow {
    pub class_id: usize,
    pub bbox: BBoxCxCyWh<Normalized>,
}

impl YoloLabelRow {
    /// Converts a filtered VOC box for an image of the given size.
    pub fn from_labeled_box(labeled: &LabeledBox, image_width: f64, image_height: f64) -> Self {
        Self {
            class_id: labeled.class_index,
            bbox: labeled.bbox.to_yolo(image_width, image_height),
        }
    }
}

impl fmt::Display for YoloLabelRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.bbox.cx, self.bbox.cy, self.bbox.w, self.bbox.h
        )
    }
}

/// Maps an image path to its label path: every `images` directory component
/// becomes `labels` and the extension becomes `.txt`.
///
/// `/d/images/train/a.jpg` maps to `/d/labels/train/a.txt`.
pub fn label_path_for_image(image_path: &Path) -> PathBuf {
    let mut label_path = PathBuf::new();
    let components: Vec<Component<'_>> = image_path.components().collect();
    let last = components.len().saturating_sub(1);

    for (index, component) in components.into_iter().enumerate() {
        match component {
            Component::Normal(name) if index != last && name == IMAGES_DIR => {
                label_path.push(LABELS_DIR);
            }
            other => label_path.push(other.as_os_str()),
        }
    }

    label_path.set_extension(LABEL_EXTENSION);
    label_path
}

/// Writes one label file, creating parent directories as needed. An existing
/// file is truncated.
pub fn write_label_file(path: &Path, rows: &[YoloLabelRow]) -> Result<(), VocprepError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(())
}
