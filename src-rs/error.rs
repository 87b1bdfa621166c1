use std::path::PathBuf;
use thiserror::Error;

/// Failures that can occur while annotating one JSON/image pair or while
/// preparing the output directory.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("input directory not found: {0}")]
    InputDirectory(PathBuf),

    #[error("output directory {output} resolves to the input directory")]
    OutputOverlapsInput { output: PathBuf },

    #[error("failed to prepare output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("companion image not found for {json}: {image}")]
    MissingCompanionImage { json: PathBuf, image: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed view hierarchy {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("view hierarchy {path} has no `{key}` key")]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("failed to open image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type AnnotateResult<T> = Result<T, AnnotateError>;
