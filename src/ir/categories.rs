//! The ordered category list shared by the COCO and YOLO tools.

use std::fs;
use std::path::Path;

use super::model::Category;
use crate::error::VocprepError;

/// Ordered class names, one per line in a categories file.
///
/// The 0-based position is the YOLO class id; the COCO category id is
/// `position + 1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryList {
    names: Vec<String>,
}

impl CategoryList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads a categories file. Lines are trimmed and blank lines skipped.
    pub fn read(path: &Path) -> Result<Self, VocprepError> {
        if !path.is_file() {
            return Err(VocprepError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Position of `name` in the list. The comparison is exact; callers
    /// lowercase names read from XML before asking.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// COCO category records, using the name as its own supercategory.
    pub fn coco_categories(&self) -> Vec<Category> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| Category {
                id: ((index + 1) as u64).into(),
                name: name.clone(),
                supercategory: Some(name.clone()),
            })
            .collect()
    }
}
