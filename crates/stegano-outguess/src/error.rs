//! Error types for detection runs.

use crate::jpeg::JpegError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Failures that abort a detection run.
///
/// Negative findings (undetermined quality, metadata mismatch, structural
/// mismatch) are reported as values and never show up here.
#[derive(Error)]
pub enum DetectError {
    /// An input file could not be opened or read.
    #[error("Cannot open {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The codec could not decode an input or encode its re-compression.
    #[error("{}: {source}", path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: JpegError,
    },

    /// The scratch file for re-compression could not be created or read back.
    #[error("Temporary file error: {source}")]
    TempFile {
        #[source]
        source: std::io::Error,
    },

    /// I/O error while comparing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectError {
    pub(crate) fn codec(path: impl Into<PathBuf>, source: JpegError) -> Self {
        DetectError::Codec {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Debug for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use Display for Debug so unwrap() shows user-friendly messages
        write!(f, "{self}")
    }
}
