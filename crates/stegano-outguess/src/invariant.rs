//! Structural invariant between two images.
//!
//! Outguess only flips coefficient LSBs, so shifting every coefficient right
//! by one bit yields the same per-block histogram for two outputs of one
//! cover image. Blocks are visited MCU by MCU over the chrominance grid of a
//! 4:2:0 YCbCr frame.

use crate::error::Result;
use crate::image::Image;
use crate::jpeg::{Block, ComponentInfo};
use std::fmt;
use std::path::Path;

const BINS: usize = 256;
const BIN_OFFSET: i32 = 128;

/// Why two images were not compared block by block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionFailure {
    FirstNotYcbcr420,
    SecondNotYcbcr420,
    BlockGridsDiffer { component: usize },
    SamplingDiffers { component: usize },
}

impl fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionFailure::FirstNotYcbcr420 => {
                write!(f, "first image is not 4:2:0 subsampled YCbCr")
            }
            PreconditionFailure::SecondNotYcbcr420 => {
                write!(f, "second image is not 4:2:0 subsampled YCbCr")
            }
            PreconditionFailure::BlockGridsDiffer { component } => {
                write!(f, "block grids of component {} differ", component)
            }
            PreconditionFailure::SamplingDiffers { component } => {
                write!(f, "sampling factors of component {} differ", component)
            }
        }
    }
}

/// Outcome of the structural comparison of two images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    /// Every block pair has the same shifted histogram.
    Respected,
    /// The images do not have the shape the comparison needs.
    Precondition(PreconditionFailure),
    /// First block pair, in visiting order, whose histograms differ.
    Mismatch {
        component: usize,
        row: usize,
        col: usize,
    },
}

impl InvariantCheck {
    pub fn is_respected(&self) -> bool {
        matches!(self, InvariantCheck::Respected)
    }
}

impl fmt::Display for InvariantCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantCheck::Respected => write!(f, "shifted histograms match in every block"),
            InvariantCheck::Precondition(reason) => write!(f, "{}", reason),
            InvariantCheck::Mismatch {
                component,
                row,
                col,
            } => write!(
                f,
                "shifted histograms differ in component {} block ({}, {})",
                component, row, col
            ),
        }
    }
}

/// Histogram of `coefficient >> 1` over one block.
///
/// Shifted values outside the 256 bins are kept as a sorted list so that
/// out-of-range coefficients still take part in the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftedHistogram {
    bins: [u8; BINS],
    overflow: Vec<i16>,
}

impl ShiftedHistogram {
    pub fn of_block(block: &Block) -> Self {
        let mut bins = [0u8; BINS];
        let mut overflow = Vec::new();

        for &coefficient in block.iter() {
            let shifted = coefficient >> 1;
            let bin = BIN_OFFSET + i32::from(shifted);
            if (0..BINS as i32).contains(&bin) {
                bins[bin as usize] += 1;
            } else {
                overflow.push(shifted);
            }
        }
        overflow.sort_unstable();

        ShiftedHistogram { bins, overflow }
    }

    /// Count in the bin of shifted value `shifted`, if it has one.
    pub fn count(&self, shifted: i16) -> Option<u8> {
        let bin = BIN_OFFSET + i32::from(shifted);
        usize::try_from(bin).ok().and_then(|b| self.bins.get(b)).copied()
    }

    pub fn overflow(&self) -> &[i16] {
        &self.overflow
    }
}

fn check_shape(first: &Image, second: &Image) -> Option<PreconditionFailure> {
    if !first.is_ycbcr_420() {
        return Some(PreconditionFailure::FirstNotYcbcr420);
    }
    if !second.is_ycbcr_420() {
        return Some(PreconditionFailure::SecondNotYcbcr420);
    }

    for (component, (a, b)) in first.components().iter().zip(second.components()).enumerate() {
        if (a.width_in_blocks, a.height_in_blocks) != (b.width_in_blocks, b.height_in_blocks) {
            return Some(PreconditionFailure::BlockGridsDiffer { component });
        }
        if (a.h_sampling, a.v_sampling) != (b.h_sampling, b.v_sampling) {
            return Some(PreconditionFailure::SamplingDiffers { component });
        }
    }

    None
}

/// Blocks of `info` that fall into the MCU at chroma position (`by`, `bx`),
/// clipped to the component's block grid.
fn blocks_in_mcu(
    info: &ComponentInfo,
    by: usize,
    bx: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let v = info.v_sampling as usize;
    let h = info.h_sampling as usize;
    let rows = v * by..(v * (by + 1)).min(info.height_in_blocks);
    let cols = h * bx..(h * (bx + 1)).min(info.width_in_blocks);

    rows.flat_map(move |row| cols.clone().map(move |col| (row, col)))
}

/// Compare the shifted histograms of every block pair of two images.
pub fn compare_images(first: &Image, second: &Image) -> InvariantCheck {
    if let Some(reason) = check_shape(first, second) {
        log::info!("invariant not checked: {}", reason);
        return InvariantCheck::Precondition(reason);
    }

    let components = first.components();
    let chroma = &components[1];

    for by in 0..chroma.height_in_blocks {
        for bx in 0..chroma.width_in_blocks {
            for (component, info) in components.iter().enumerate() {
                for (row, col) in blocks_in_mcu(info, by, bx) {
                    let (Some(a), Some(b)) = (
                        first.block(component, row, col),
                        second.block(component, row, col),
                    ) else {
                        log::warn!(
                            "block ({}, {}) of component {} is missing",
                            row,
                            col,
                            component
                        );
                        return InvariantCheck::Mismatch {
                            component,
                            row,
                            col,
                        };
                    };

                    if ShiftedHistogram::of_block(a) != ShiftedHistogram::of_block(b) {
                        log::info!(
                            "shifted histograms differ in component {} block ({}, {})",
                            component,
                            row,
                            col
                        );
                        return InvariantCheck::Mismatch {
                            component,
                            row,
                            col,
                        };
                    }
                }
            }
        }
    }

    log::info!("shifted histograms match in every block");
    InvariantCheck::Respected
}

/// True iff the two files pass the structural comparison.
pub fn check_invariant(first: impl AsRef<Path>, second: impl AsRef<Path>) -> Result<bool> {
    let first = Image::open(first)?;
    let second = Image::open(second)?;
    Ok(compare_images(&first, &second).is_respected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::{CoefficientStore, ColorSpace, Encoder};

    fn encode_with(
        width: u16,
        height: u16,
        color_space: ColorSpace,
        fill: impl Fn(usize, usize, &mut Block),
    ) -> Image {
        let mut encoder = Encoder::new(Vec::new());
        encoder.configure(width, height, color_space, 75).unwrap();
        let mut store = CoefficientStore::zeroed(&encoder.components().unwrap());
        for (c, component) in store.components.iter_mut().enumerate() {
            for (b, block) in component.blocks.iter_mut().enumerate() {
                fill(c, b, block);
            }
        }
        encoder.write_coefficients(&store).unwrap();
        Image::from_bytes(&encoder.finish().unwrap()).unwrap()
    }

    fn pattern(c: usize, b: usize, block: &mut Block) {
        for (i, value) in block.iter_mut().enumerate().take(20) {
            *value = ((b * 7 + i * 3 + c) % 23) as i16 - 11;
        }
    }

    #[test]
    fn test_histogram_merges_lsb_neighbours() {
        let mut a = [0i16; 64];
        let mut b = [0i16; 64];
        a[..4].copy_from_slice(&[4, 5, -3, -4]);
        b[..4].copy_from_slice(&[5, 4, -4, -3]);
        assert_eq!(ShiftedHistogram::of_block(&a), ShiftedHistogram::of_block(&b));

        let histogram = ShiftedHistogram::of_block(&a);
        assert_eq!(histogram.count(2), Some(2));
        assert_eq!(histogram.count(-2), Some(2));
        assert_eq!(histogram.count(0), Some(60));

        b[0] = 6;
        assert_ne!(ShiftedHistogram::of_block(&a), ShiftedHistogram::of_block(&b));
    }

    #[test]
    fn test_histogram_keeps_out_of_range_values() {
        let mut a = [0i16; 64];
        a[0] = 1000;
        a[1] = -1000;
        a[2] = 254;
        let histogram = ShiftedHistogram::of_block(&a);
        assert_eq!(histogram.overflow(), &[-500, 500]);
        assert_eq!(histogram.count(127), Some(1));
        assert_eq!(histogram.count(500), None);

        let mut b = a;
        b[0] = 1002;
        assert_ne!(histogram, ShiftedHistogram::of_block(&b));
        b[0] = 1001;
        assert_eq!(histogram, ShiftedHistogram::of_block(&b));
    }

    #[test]
    fn test_image_matches_itself() {
        let image = encode_with(50, 34, ColorSpace::Rgb, pattern);
        assert_eq!(compare_images(&image, &image), InvariantCheck::Respected);
    }

    #[test]
    fn test_lsb_flips_and_permutations_are_respected() {
        let cover = encode_with(40, 24, ColorSpace::Rgb, pattern);
        let stego = encode_with(40, 24, ColorSpace::Rgb, |c, b, block| {
            pattern(c, b, block);
            for value in block.iter_mut().step_by(3) {
                *value ^= 1;
            }
            block.swap(1, 9);
        });
        assert!(compare_images(&cover, &stego).is_respected());
        assert!(compare_images(&stego, &cover).is_respected());
    }

    #[test]
    fn test_mismatch_reports_first_block_in_mcu_order() {
        let cover = encode_with(32, 32, ColorSpace::Rgb, pattern);
        // luminance block (1, 2) belongs to the MCU at chroma (0, 1)
        let changed = encode_with(32, 32, ColorSpace::Rgb, |c, b, block| {
            pattern(c, b, block);
            if c == 0 && b == 4 + 2 {
                block[63] = 40;
            }
        });
        let expected = InvariantCheck::Mismatch {
            component: 0,
            row: 1,
            col: 2,
        };
        assert_eq!(compare_images(&cover, &changed), expected);
        assert_eq!(compare_images(&changed, &cover), expected);
    }

    #[test]
    fn test_chroma_change_is_detected() {
        let cover = encode_with(16, 16, ColorSpace::Rgb, pattern);
        let changed = encode_with(16, 16, ColorSpace::Rgb, |c, b, block| {
            pattern(c, b, block);
            if c == 2 {
                block[0] += 2;
            }
        });
        assert_eq!(
            compare_images(&cover, &changed),
            InvariantCheck::Mismatch {
                component: 2,
                row: 0,
                col: 0
            }
        );
    }

    #[test]
    fn test_preconditions() {
        let color = encode_with(16, 16, ColorSpace::Rgb, pattern);
        let gray = encode_with(16, 16, ColorSpace::Grayscale, pattern);
        let larger = encode_with(32, 16, ColorSpace::Rgb, pattern);

        assert_eq!(
            compare_images(&gray, &color),
            InvariantCheck::Precondition(PreconditionFailure::FirstNotYcbcr420)
        );
        assert_eq!(
            compare_images(&color, &gray),
            InvariantCheck::Precondition(PreconditionFailure::SecondNotYcbcr420)
        );
        assert_eq!(
            compare_images(&color, &larger),
            InvariantCheck::Precondition(PreconditionFailure::BlockGridsDiffer { component: 0 })
        );
    }

    #[test]
    fn test_blocks_in_mcu_are_clipped() {
        let mut luma = ComponentInfo::new(1, 2, 2, 0);
        luma.width_in_blocks = 3;
        luma.height_in_blocks = 3;

        let full: Vec<_> = blocks_in_mcu(&luma, 0, 0).collect();
        assert_eq!(full, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        let corner: Vec<_> = blocks_in_mcu(&luma, 1, 1).collect();
        assert_eq!(corner, vec![(2, 2)]);
    }
}
