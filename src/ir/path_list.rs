//! Newline-delimited path manifests.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::VocprepError;

/// Reads a path list, one path per line. Lines are trimmed; blank lines are
/// skipped.
pub fn read_path_list(path: &Path) -> Result<Vec<PathBuf>, VocprepError> {
    if !path.is_file() {
        return Err(VocprepError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    Ok(parse_path_list(&content))
}

/// Like [`read_path_list`], but blank lines are kept as empty paths.
pub fn read_path_lines(path: &Path) -> Result<Vec<PathBuf>, VocprepError> {
    if !path.is_file() {
        return Err(VocprepError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::trim).map(PathBuf::from).collect())
}

pub fn parse_path_list(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Writes one path per line, each terminated by `\n`.
pub fn write_path_list<'a, I>(path: &Path, items: I) -> Result<(), VocprepError>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        writeln!(writer, "{}", item.display())?;
    }
    writer.flush()?;
    Ok(())
}

/// Derives a sibling file name by inserting `suffix` between the stem and
/// the extension: `sets/val.txt` + `_yolo_12` gives `sets/val_yolo_12.txt`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut file_name = OsString::from(path.file_stem().unwrap_or_default());
    file_name.push(suffix);
    if let Some(ext) = path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    path.with_file_name(file_name)
}
