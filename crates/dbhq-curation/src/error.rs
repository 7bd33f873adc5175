use std::path::PathBuf;

use thiserror::Error;

/// Archive I/O failures. Each carries the path it was working on.
#[derive(Debug, Error)]
pub enum CurationError {
    #[error("failed to create archive directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive entry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list archive directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unusable attachment file name: {0:?}")]
    InvalidName(String),
}
