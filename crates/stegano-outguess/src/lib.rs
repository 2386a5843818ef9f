//! Outguess pair detection for JPEG images
//!
//! Outguess embeds a payload by flipping the least significant bit of selected
//! quantized DCT coefficients and writes the result through a standard
//! libjpeg compressor. Two consequences are testable without any payload key:
//!
//! - every output file is byte-identical to what the standard compressor
//!   writes for its own coefficients at its own quality, and
//! - two outputs of the same cover image have, block by block, the same
//!   histogram of coefficients shifted right by one bit.
//!
//! # Layer Responsibilities
//!
//! - [`jpeg`] reads and writes quantized coefficients of baseline JPEG files
//! - [`quality`] infers the encoder quality from the quantization tables
//! - [`metadata`] re-compresses a file and compares bytes
//! - [`invariant`] compares shifted histograms of two images
//! - [`detector`] runs both checks on a pair and renders the verdict
//!
//! # Example
//!
//! ```no_run
//! use stegano_outguess::{detect, DetectOptions};
//!
//! let verdict = detect("cover.jpg", "stego.jpg", &DetectOptions::default())?;
//! println!("{}", verdict);
//! # Ok::<(), stegano_outguess::DetectError>(())
//! ```

pub mod detector;
mod error;
pub mod image;
pub mod invariant;
pub mod jpeg;
pub mod metadata;
pub mod quality;

pub use detector::{detect, DetectOptions, MetadataFailure, Verdict};
pub use error::{DetectError, Result};
pub use image::Image;
pub use invariant::{
    check_invariant, compare_images, InvariantCheck, PreconditionFailure, ShiftedHistogram,
};
pub use metadata::{check_image_metadata, check_image_metadata_with, verify_image, MetadataCheck};
pub use quality::{detect_quality, detect_table_quality, QualityUndetermined};
