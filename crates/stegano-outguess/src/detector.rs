//! Runs both checks on a pair of files and renders the verdict.

use crate::error::Result;
use crate::image::Image;
use crate::invariant::{compare_images, InvariantCheck};
use crate::metadata::{verify_image, MetadataCheck};
use std::fmt;
use std::path::{Path, PathBuf};

/// Knobs of a detection run.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Directory for the re-compression scratch files, the system default if `None`.
    pub temp_dir: Option<PathBuf>,
}

/// An input that failed the metadata check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFailure {
    pub path: PathBuf,
    pub check: MetadataCheck,
}

/// Final answer for a pair of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// At least one file is not plain standard encoder output.
    MetadataMismatch(Vec<MetadataFailure>),
    /// Both files pass the metadata check but their blocks disagree.
    InvariantViolated {
        first: PathBuf,
        second: PathBuf,
        check: InvariantCheck,
    },
    /// Both checks pass.
    LikelyOutguess { first: PathBuf, second: PathBuf },
}

impl Verdict {
    pub fn is_likely(&self) -> bool {
        matches!(self, Verdict::LikelyOutguess { .. })
    }

    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> u8 {
        if self.is_likely() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::MetadataMismatch(failures) => {
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{} can't possibly have been generated by Outguess (metadata mismatch)",
                        failure.path.display()
                    )?;
                }
                Ok(())
            }
            Verdict::InvariantViolated { first, second, .. } => write!(
                f,
                "{} and {} can't possibly have been generated by Outguess from the same source image (invariant not respected)",
                first.display(),
                second.display()
            ),
            Verdict::LikelyOutguess { first, second } => write!(
                f,
                "It is likely that {} and {} have been produced by Outguess from the same source image",
                first.display(),
                second.display()
            ),
        }
    }
}

/// Decide whether `first` and `second` could be Outguess outputs of one cover image.
///
/// Each file is decoded once. Both metadata checks run, and the structural
/// comparison only runs when both pass. Unreadable or undecodable input
/// is an error, every other negative outcome is a [`Verdict`].
pub fn detect(
    first: impl AsRef<Path>,
    second: impl AsRef<Path>,
    options: &DetectOptions,
) -> Result<Verdict> {
    let first = first.as_ref();
    let second = second.as_ref();

    let first_image = Image::open(first)?;
    let second_image = Image::open(second)?;

    let mut failures = Vec::new();
    for (path, image) in [(first, &first_image), (second, &second_image)] {
        let check = verify_image(image, path, options)?;
        if !check.is_identical() {
            failures.push(MetadataFailure {
                path: path.to_path_buf(),
                check,
            });
        }
    }
    if !failures.is_empty() {
        return Ok(Verdict::MetadataMismatch(failures));
    }

    let check = compare_images(&first_image, &second_image);
    if !check.is_respected() {
        return Ok(Verdict::InvariantViolated {
            first: first.to_path_buf(),
            second: second.to_path_buf(),
            check,
        });
    }

    Ok(Verdict::LikelyOutguess {
        first: first.to_path_buf(),
        second: second.to_path_buf(),
    })
}
