use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read table {}: {source}", .path.display())]
    Table { path: PathBuf, source: csv::Error },

    #[error("unsupported table format for {}, expected .csv, .tsv or .tab", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("request to {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("dataset name {0:?} must be a single directory name")]
    InvalidName(String),

    #[error("unknown dataset '{name}', expected one of {known}")]
    UnknownDataset { name: String, known: String },

    #[error("split fractions must be non-negative and sum to 1, got {0:?}")]
    SplitFractions([f64; 3]),

    #[cfg(feature = "python")]
    #[error("python error: {0}")]
    Python(#[from] pyo3::PyErr),
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_owned(),
            source,
        }
    }

    pub fn table(path: impl AsRef<Path>, source: csv::Error) -> Self {
        Self::Table {
            path: path.as_ref().to_owned(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
