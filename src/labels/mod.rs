//! Label map and label list generation from a category-per-directory layout.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::VocprepError;

pub const LABEL_MAP_FILE: &str = "label_map.txt";
pub const LABEL_LIST_FILE: &str = "label_list.txt";

/// Files written by [`write_label_files`].
#[derive(Clone, Debug)]
pub struct LabelFilesReport {
    pub categories: Vec<String>,
    pub label_map_path: PathBuf,
    pub label_list_path: PathBuf,
}

/// Names of the immediate subdirectories of `data_dir`, sorted.
pub fn discover_categories(data_dir: &Path) -> Result<Vec<String>, VocprepError> {
    if !data_dir.is_dir() {
        return Err(VocprepError::MissingDirectory {
            path: data_dir.to_path_buf(),
        });
    }

    let mut categories = Vec::new();
    for entry in WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| VocprepError::Io(err.into()))?;
        if entry.file_type().is_dir() {
            categories.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    Ok(categories)
}

/// One protobuf-text `item` block of a label map.
pub fn label_map_item(id: usize, name: &str) -> String {
    format!("item {{\n    id: {id}\n    name: '{name}'\n}}\n\n")
}

/// Writes `label_map.txt` and `label_list.txt` into `output_dir`.
pub fn write_label_files(
    data_dir: &Path,
    output_dir: &Path,
) -> Result<LabelFilesReport, VocprepError> {
    let categories = discover_categories(data_dir)?;

    if !output_dir.is_dir() {
        return Err(VocprepError::MissingDirectory {
            path: output_dir.to_path_buf(),
        });
    }

    let label_map_path = output_dir.join(LABEL_MAP_FILE);
    let label_list_path = output_dir.join(LABEL_LIST_FILE);

    let mut label_map = BufWriter::new(File::create(&label_map_path)?);
    let mut label_list = BufWriter::new(File::create(&label_list_path)?);

    for (index, name) in categories.iter().enumerate() {
        label_map.write_all(label_map_item(index + 1, name).as_bytes())?;
        writeln!(label_list, "{name}")?;
    }

    label_map.flush()?;
    label_list.flush()?;

    log::info!(
        "wrote {} categories to {} and {}",
        categories.len(),
        label_map_path.display(),
        label_list_path.display()
    );

    Ok(LabelFilesReport {
        categories,
        label_map_path,
        label_list_path,
    })
}
