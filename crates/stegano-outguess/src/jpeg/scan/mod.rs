//! JPEG scan data encoding and decoding.
//!
//! Encodes and decodes entropy-coded scan data to/from quantized DCT
//! coefficients without performing dequantization or IDCT.
//!
//! # Module Structure
//!
//! - `baseline` - Sequential Huffman encode/decode, one scan at a time

mod baseline;

use super::coefficients::CoefficientStore;
use super::error::{JpegError, Result};
use super::parser::{FrameInfo, JpegSegments, ScanComponent};

pub use baseline::{decode_scan_baseline, encode_scan_baseline};

/// Largest coefficient store a frame may ask for, in 8x8 blocks over all
/// components (1 GiB of coefficients).
pub const MAX_BLOCKS: usize = 1 << 23;

/// Decode every scan of a parsed JPEG into a coefficient store.
///
/// Blocks that only pad edge MCUs are decoded and discarded.
pub fn decode_coefficients(segments: &JpegSegments) -> Result<CoefficientStore> {
    let frame = segments
        .frame
        .as_ref()
        .ok_or_else(|| JpegError::malformed("missing frame info (SOF)"))?;

    if frame.sof_type > 1 {
        return Err(JpegError::Unsupported(format!(
            "SOF{} frames",
            frame.sof_type
        )));
    }
    if segments.scans.is_empty() {
        return Err(JpegError::malformed("no scan (SOS) in file"));
    }

    let blocks: usize = frame
        .components
        .iter()
        .map(|c| c.width_in_blocks.saturating_mul(c.height_in_blocks))
        .fold(0, usize::saturating_add);
    if blocks > MAX_BLOCKS {
        return Err(JpegError::Unsupported(format!(
            "{}x{} frame needs {} blocks, at most {} are decoded",
            frame.width, frame.height, blocks, MAX_BLOCKS
        )));
    }

    let mut store = CoefficientStore::zeroed(&frame.components);
    let mut seen = vec![false; frame.components.len()];

    for (index, scan) in segments.scans.iter().enumerate() {
        log::debug!(
            "decoding scan {} ({} component(s), restart interval {})",
            index,
            scan.components.len(),
            scan.restart_interval
        );
        decode_scan_baseline(scan, frame, &mut store)?;
        for component in &scan.components {
            seen[component.index] = true;
        }
    }

    for (component, _) in frame.components.iter().zip(&seen).filter(|(_, &s)| !s) {
        log::warn!("Component {} is not part of any scan", component.id);
    }

    Ok(store)
}

/// Size of the MCU grid a scan walks, as `(columns, rows)`.
///
/// Interleaved scans use the frame's MCU grid, a single-component scan
/// walks the component's own block grid.
pub(crate) fn scan_grid(frame: &FrameInfo, components: &[ScanComponent]) -> (usize, usize) {
    match components {
        [single] => {
            let info = &frame.components[single.index];
            (info.width_in_blocks, info.height_in_blocks)
        }
        _ => frame.mcu_grid(),
    }
}

/// Block positions of one MCU in coding order as `(scan slot, row, col)`.
///
/// Positions may fall outside a component's block grid at the right and
/// bottom edges.
pub(crate) fn mcu_blocks(
    frame: &FrameInfo,
    components: &[ScanComponent],
    mcu_row: usize,
    mcu_col: usize,
    out: &mut Vec<(usize, usize, usize)>,
) {
    out.clear();

    if let [_] = components {
        out.push((0, mcu_row, mcu_col));
        return;
    }

    for (slot, component) in components.iter().enumerate() {
        let info = &frame.components[component.index];
        let h = info.h_sampling as usize;
        let v = info.v_sampling as usize;
        for y in 0..v {
            for x in 0..h {
                out.push((slot, mcu_row * v + y, mcu_col * h + x));
            }
        }
    }
}
