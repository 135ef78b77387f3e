//! File-list existence check.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::VocprepError;
use crate::ir::path_list::read_path_lines;

/// Result of checking every path in a list.
#[derive(Clone, Debug, Default)]
pub struct FileCheckReport {
    pub checked: usize,
    /// Paths that are not existing regular files, in list order.
    pub missing: Vec<PathBuf>,
}

impl FileCheckReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for FileCheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for path in &self.missing {
            writeln!(f, "{} does not exist", path.display())?;
        }

        if self.missing.is_empty() {
            writeln!(f, "all files are there")
        } else {
            writeln!(f, "there're {} files missing", self.missing.len())
        }
    }
}

/// Checks that every path listed in `list_path` is an existing file.
///
/// Missing entries are reported, not treated as errors; only an absent or
/// unreadable list file fails. Blank lines are checked as empty paths and
/// so always count as missing.
pub fn check_file_list(list_path: &Path) -> Result<FileCheckReport, VocprepError> {
    let paths = read_path_lines(list_path)?;

    let mut report = FileCheckReport {
        checked: paths.len(),
        missing: Vec::new(),
    };

    for path in paths {
        if !path.is_file() {
            log::debug!("missing: {}", path.display());
            report.missing.push(path);
        }
    }

    Ok(report)
}
