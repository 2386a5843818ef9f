//! Quantized DCT coefficient storage.

use super::parser::ComponentInfo;

/// One 8x8 block of quantized coefficients in natural (row-major) order.
pub type Block = [i16; 64];

/// The block grid of a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCoefficients {
    /// Blocks per row.
    pub width_in_blocks: usize,
    /// Block rows.
    pub height_in_blocks: usize,
    /// Blocks in row-major order.
    pub blocks: Vec<Block>,
}

impl ComponentCoefficients {
    /// A grid of all-zero blocks.
    pub fn new(width_in_blocks: usize, height_in_blocks: usize) -> Self {
        ComponentCoefficients {
            width_in_blocks,
            height_in_blocks,
            blocks: vec![[0; 64]; width_in_blocks * height_in_blocks],
        }
    }

    #[inline]
    pub fn block(&self, row: usize, col: usize) -> Option<&Block> {
        if row < self.height_in_blocks && col < self.width_in_blocks {
            self.blocks.get(row * self.width_in_blocks + col)
        } else {
            None
        }
    }

    #[inline]
    pub fn block_mut(&mut self, row: usize, col: usize) -> Option<&mut Block> {
        if row < self.height_in_blocks && col < self.width_in_blocks {
            self.blocks.get_mut(row * self.width_in_blocks + col)
        } else {
            None
        }
    }
}

/// Coefficients of every component of an image, in frame order.
///
/// Each decoded image owns its own store; blocks are never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoefficientStore {
    pub components: Vec<ComponentCoefficients>,
}

impl CoefficientStore {
    /// An all-zero store matching the block grids of `components`.
    pub fn zeroed(components: &[ComponentInfo]) -> Self {
        CoefficientStore {
            components: components
                .iter()
                .map(|c| ComponentCoefficients::new(c.width_in_blocks, c.height_in_blocks))
                .collect(),
        }
    }

    /// Block at `(row, col)` of component `component`, `None` if out of range.
    #[inline]
    pub fn block(&self, component: usize, row: usize, col: usize) -> Option<&Block> {
        self.components.get(component)?.block(row, col)
    }

    #[inline]
    pub fn block_mut(&mut self, component: usize, row: usize, col: usize) -> Option<&mut Block> {
        self.components.get_mut(component)?.block_mut(row, col)
    }

    /// True if the block grids match `components` exactly.
    pub fn matches_layout(&self, components: &[ComponentInfo]) -> bool {
        self.components.len() == components.len()
            && self
                .components
                .iter()
                .zip(components)
                .all(|(coeffs, info)| {
                    coeffs.width_in_blocks == info.width_in_blocks
                        && coeffs.height_in_blocks == info.height_in_blocks
                        && coeffs.blocks.len() == info.width_in_blocks * info.height_in_blocks
                })
    }
}
