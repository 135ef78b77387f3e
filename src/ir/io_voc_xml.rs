//! Pascal VOC XML reader.
//!
//! Only the parts the pipeline consumes are read: `<size>` and, per
//! `<object>`, `<name>`, `<difficult>` and `<bndbox>`. Object-level problems
//! are kept on the parsed object so that callers can skip one object without
//! losing the rest of the file.

use std::fs;
use std::path::Path;

use roxmltree::Node;

use super::{BBoxXYXY, CategoryList, Pixel};
use crate::error::VocprepError;

pub const VOC_XML_EXTENSION: &str = "xml";

/// One parsed VOC annotation file.
#[derive(Clone, Debug)]
pub struct VocAnnotation {
    /// `<size><width>`; may be zero or negative in broken exports.
    pub width: i64,
    /// `<size><height>`; may be zero or negative in broken exports.
    pub height: i64,
    pub objects: Vec<VocObject>,
}

#[derive(Clone, Debug)]
pub struct VocObject {
    /// Trimmed `<name>` text, `None` when the tag is absent or empty.
    pub name: Option<String>,
    pub difficult: bool,
    pub bndbox: VocBox,
}

#[derive(Clone, Debug)]
pub enum VocBox {
    Missing,
    Malformed(String),
    Present(BBoxXYXY<Pixel>),
}

/// An object that passed the category filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabeledBox {
    /// 0-based index into the category list.
    pub class_index: usize,
    pub bbox: BBoxXYXY<Pixel>,
}

impl VocAnnotation {
    /// True when both image dimensions are at least one pixel.
    pub fn has_valid_size(&self) -> bool {
        self.width >= 1 && self.height >= 1
    }

    /// Applies the object filter chain and returns the surviving boxes.
    ///
    /// Checks run in this order: difficult flag, name presence, category
    /// membership (on the lowercased name), then box presence.
    pub fn labeled_boxes(&self, categories: &CategoryList, source: &Path) -> Vec<LabeledBox> {
        let mut boxes = Vec::new();

        for object in &self.objects {
            if object.difficult {
                continue;
            }

            let Some(name) = object.name.as_deref() else {
                log::debug!("{}: skipping <object> without <name>", source.display());
                continue;
            };

            let lower = name.to_lowercase();
            let Some(class_index) = categories.index_of(&lower) else {
                log::debug!(
                    "{}: skipping non-listed class name {}",
                    source.display(),
                    lower
                );
                continue;
            };

            match &object.bndbox {
                VocBox::Present(bbox) => boxes.push(LabeledBox {
                    class_index,
                    bbox: *bbox,
                }),
                VocBox::Missing => {
                    log::debug!(
                        "{}: skipping '{}' object without <bndbox>",
                        source.display(),
                        lower
                    );
                }
                VocBox::Malformed(message) => {
                    log::warn!("{}: skipping '{}' object: {}", source.display(), lower, message);
                }
            }
        }

        boxes
    }
}

/// Reads and parses one VOC XML file.
///
/// I/O failures come back as [`VocprepError::Io`]; content problems as
/// [`VocprepError::VocXmlParse`].
/// Content that is not UTF-8 counts as a content problem.
pub fn read_voc_xml(path: &Path) -> Result<VocAnnotation, VocprepError> {
    let bytes = fs::read(path)?;
    parse_voc_xml_bytes(&bytes, path)
}

/// Parse VOC XML from bytes.
///
/// The input must be valid UTF-8. Primarily useful for fuzzing.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<VocAnnotation, VocprepError> {
    parse_voc_xml_bytes(bytes, Path::new("<memory>"))
}

fn parse_voc_xml_bytes(bytes: &[u8], path: &Path) -> Result<VocAnnotation, VocprepError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| VocprepError::VocXmlParse {
        path: path.to_path_buf(),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_voc_xml_str(xml, path)
}

pub fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<VocAnnotation, VocprepError> {
    let parse_error = |message: String| VocprepError::VocXmlParse {
        path: path.to_path_buf(),
        message,
    };

    let document =
        roxmltree::Document::parse(xml).map_err(|source| parse_error(source.to_string()))?;
    let root = document.root_element();

    let size = child_element(root, "size").ok_or_else(|| parse_error("missing <size>".into()))?;
    let width = parse_dimension(size, "width").map_err(parse_error)?;
    let height = parse_dimension(size, "height").map_err(parse_error)?;

    let objects = root
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
        .map(parse_object)
        .collect();

    Ok(VocAnnotation {
        width,
        height,
        objects,
    })
}

fn parse_object(object: Node<'_, '_>) -> VocObject {
    let difficult = optional_child_text(object, "difficult")
        .map(|raw| is_truthy(&raw))
        .unwrap_or(false);

    let bndbox = match child_element(object, "bndbox") {
        None => VocBox::Missing,
        Some(node) => match parse_bndbox(node) {
            Ok(bbox) => VocBox::Present(bbox),
            Err(message) => VocBox::Malformed(message),
        },
    };

    VocObject {
        name: optional_child_text(object, "name"),
        difficult,
        bndbox,
    }
}

fn parse_bndbox(node: Node<'_, '_>) -> Result<BBoxXYXY<Pixel>, String> {
    let coord = |tag: &str| -> Result<f64, String> {
        let raw = optional_child_text(node, tag)
            .ok_or_else(|| format!("missing <{tag}> in <bndbox>"))?;
        raw.parse::<f64>()
            .map_err(|_| format!("invalid <{tag}> value '{raw}' in <bndbox>; expected a number"))
    };

    Ok(BBoxXYXY::from_xyxy(
        coord("xmin")?,
        coord("ymin")?,
        coord("xmax")?,
        coord("ymax")?,
    ))
}

/// Integer dimension; `"480.0"` style values written by some tools are
/// truncated like integers.
fn parse_dimension(size: Node<'_, '_>, tag: &str) -> Result<i64, String> {
    let raw =
        optional_child_text(size, tag).ok_or_else(|| format!("missing <{tag}> in <size>"))?;

    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|value| value as i64))
        .map_err(|_| format!("invalid <{tag}> value '{raw}' in <size>; expected an integer"))
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// True for files ending in `.xml` (any case).
pub fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VOC_XML_EXTENSION))
        .unwrap_or(false)
}
