//! Error types for the JPEG codec.

use std::fmt;
use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, JpegError>;

/// Fatal codec failures.
///
/// Every codec call reports failure through this type. Conditions a decoder
/// can recover from (extraneous bytes, a missing EOI, truncated entropy data)
/// are logged as warnings instead and never surface here.
#[derive(Error)]
pub enum JpegError {
    /// The data does not start with an SOI marker.
    #[error("Not a JPEG file: starts with 0x{0:02X} 0x{1:02X}")]
    NotAJpeg(u8, u8),

    /// A marker segment is truncated, inconsistent or out of place.
    #[error("Malformed JPEG: {reason}")]
    Malformed { reason: String },

    /// The file uses a JPEG process this codec does not handle.
    #[error("Unsupported JPEG process: {0}")]
    Unsupported(String),

    /// Entropy-coded data could not be decoded or encoded.
    #[error("Corrupt entropy-coded data: {reason}")]
    Entropy { reason: String },

    /// The encoder was driven out of order or fed coefficients it was not configured for.
    #[error("Encoder misuse: {0}")]
    Encoder(String),

    /// Underlying reader or writer failed.
    #[error("JPEG I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JpegError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        JpegError::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn entropy(reason: impl Into<String>) -> Self {
        JpegError::Entropy {
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for JpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use Display for Debug so unwrap() shows user-friendly messages
        write!(f, "{self}")
    }
}
