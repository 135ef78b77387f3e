use std::path::PathBuf;
use thiserror::Error;

/// The main error type for vocprep operations.
#[derive(Debug, Error)]
pub enum VocprepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} does not exist", path.display())]
    MissingFile { path: PathBuf },

    #[error("the directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid dataset layout at {path}: {message}")]
    LayoutInvalid { path: PathBuf, message: String },

    #[error("Failed to parse VOC XML from {path}: {message}")]
    VocXmlParse { path: PathBuf, message: String },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid id list {path} line {line}: {message}")]
    IdListParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot derive a numeric image id from {path}; expected a file stem ending in '_<int>'")]
    ImageIdParse { path: PathBuf },

    #[error("Category id {id} is not in the id table ({table_len} entries); the results file does not match the expected id space")]
    UnknownCategoryId { id: u64, table_len: usize },

    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Image id {id} is used by both {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateImageId {
        id: u64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Evaluation failed: {message}")]
    EvaluationFailed { message: String },
}
