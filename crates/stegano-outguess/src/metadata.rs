//! Metadata fidelity check.
//!
//! A file passes when re-compressing its own coefficients with a standard
//! encoder at the file's quality gives back the very same bytes. Any extra
//! marker, different table layout or trailing data makes the files differ.

use crate::detector::DetectOptions;
use crate::error::{DetectError, Result};
use crate::image::Image;
use crate::jpeg::{ColorSpace, Encoder};
use crate::quality::QualityUndetermined;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use tempfile::NamedTempFile;

/// Outcome of the metadata check of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataCheck {
    /// The file is byte-identical to a standard encoder's output.
    Identical { quality: u8 },
    /// No quality could be inferred from the quantization tables.
    QualityUndetermined(QualityUndetermined),
    /// The component layout cannot come from a standard encoder fed RGB input.
    LayoutDiffers { quality: u8 },
    /// Re-compression differs from the file, starting at byte `offset`.
    Differs { quality: u8, offset: u64 },
}

impl MetadataCheck {
    pub fn is_identical(&self) -> bool {
        matches!(self, MetadataCheck::Identical { .. })
    }
}

impl fmt::Display for MetadataCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataCheck::Identical { quality } => {
                write!(f, "identical to standard encoder output at quality {}", quality)
            }
            MetadataCheck::QualityUndetermined(reason) => write!(f, "{}", reason),
            MetadataCheck::LayoutDiffers { quality } => write!(
                f,
                "component layout differs from standard encoder output at quality {}",
                quality
            ),
            MetadataCheck::Differs { quality, offset } => write!(
                f,
                "differs from standard encoder output at quality {} from byte {}",
                quality, offset
            ),
        }
    }
}

/// True iff the file at `path` is exactly what a standard encoder writes.
pub fn check_image_metadata(path: impl AsRef<Path>) -> Result<bool> {
    check_image_metadata_with(path, &DetectOptions::default())
}

/// [`check_image_metadata`] with explicit options.
pub fn check_image_metadata_with(path: impl AsRef<Path>, options: &DetectOptions) -> Result<bool> {
    let path = path.as_ref();
    let image = Image::open(path)?;
    Ok(verify_image(&image, path, options)?.is_identical())
}

/// Run the metadata check on an already decoded image read from `path`.
///
/// The re-compression goes to a scratch file that is removed on every
/// return path.
pub fn verify_image(image: &Image, path: &Path, options: &DetectOptions) -> Result<MetadataCheck> {
    let quality = match image.quality() {
        Ok(quality) => quality,
        Err(reason) => {
            log::info!("{}: {}", path.display(), reason);
            return Ok(MetadataCheck::QualityUndetermined(reason));
        }
    };

    let scratch = create_scratch_file(options)?;
    log::debug!(
        "{}: re-compressing at quality {} into {}",
        path.display(),
        quality,
        scratch.path().display()
    );

    let mut encoder = Encoder::new(BufWriter::new(scratch.as_file()));
    encoder
        .configure(image.width(), image.height(), ColorSpace::Rgb, quality)
        .map_err(|e| DetectError::codec(path, e))?;

    let expected = encoder.components().map_err(|e| DetectError::codec(path, e))?;
    if !image.coefficients().matches_layout(&expected) {
        log::info!(
            "{}: component layout does not match the standard 4:2:0 layout",
            path.display()
        );
        return Ok(MetadataCheck::LayoutDiffers { quality });
    }

    encoder
        .write_coefficients(image.coefficients())
        .map_err(|e| DetectError::codec(path, e))?;
    encoder.finish().map_err(|e| DetectError::codec(path, e))?;

    let original = File::open(path).map_err(|source| DetectError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let reencoded = scratch
        .reopen()
        .map_err(|source| DetectError::TempFile { source })?;

    let check = match first_difference(BufReader::new(original), BufReader::new(reencoded))? {
        None => MetadataCheck::Identical { quality },
        Some(offset) => MetadataCheck::Differs { quality, offset },
    };
    log::info!("{}: {}", path.display(), check);

    Ok(check)
}

fn create_scratch_file(options: &DetectOptions) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("outguess-").suffix(".jpg");

    match &options.temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|source| DetectError::TempFile { source })
}

/// Offset of the first byte where the two streams differ, `None` if equal.
///
/// A stream ending early differs at its length.
pub fn first_difference<A: Read, B: Read>(a: A, b: B) -> std::io::Result<Option<u64>> {
    let mut left = a.bytes();
    let mut right = b.bytes();
    let mut offset = 0u64;

    loop {
        match (left.next().transpose()?, right.next().transpose()?) {
            (None, None) => return Ok(None),
            (Some(x), Some(y)) if x == y => offset += 1,
            _ => return Ok(Some(offset)),
        }
    }
}
