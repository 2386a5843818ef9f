//! JPEG quality estimation from quantization tables.
//!
//! A table is matched exactly against the standard IJG tables scaled to
//! every quality from 1 to 100, the way `jpeg_set_quality` with forced
//! baseline builds them. Anything not reachable that way is undetermined.

use crate::jpeg::{
    quality_scaling, scale_quant_table, QuantizationTable, STD_CHROMINANCE_QUANT_TABLE,
    STD_LUMINANCE_QUANT_TABLE,
};
use thiserror::Error;

/// Why no quality could be assigned to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QualityUndetermined {
    #[error("Luminance table missing.")]
    LuminanceMissing,

    #[error("Could not detect quality of the luminance table.")]
    LuminanceUnknown,

    #[error("Chrominance table missing.")]
    ChrominanceMissing,

    /// The chrominance table is not the one of the luminance quality.
    #[error("Could not detect quality of the chrominance table.")]
    ChrominanceMismatch {
        luminance: u8,
        chrominance: Option<u8>,
    },

    /// A table beyond luminance and chrominance is defined.
    #[error("Extra quantization table, can't detect the quality of these.")]
    ExtraTable(u8),
}

/// Smallest quality whose scaled `base` table equals `table`.
///
/// `table` and `base` are in natural order.
pub fn detect_table_quality(table: &[u16; 64], base: &[u16; 64]) -> Option<u8> {
    (1..=100u8).find(|&quality| scale_quant_table(base, quality_scaling(quality), true) == *table)
}

/// Quality of an image from its quantization tables, indexed by table ID.
///
/// Table 0 must be a scaled standard luminance table, table 1 the standard
/// chrominance table at the same quality, and no other table may exist.
///
/// The chrominance tables of qualities 1 to 3 are identical, so images
/// encoded at quality 2 or 3 come out undetermined.
pub fn detect_quality(tables: &[Option<QuantizationTable>; 4]) -> Result<u8, QualityUndetermined> {
    let luminance = tables[0]
        .as_ref()
        .ok_or(QualityUndetermined::LuminanceMissing)?;
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("luminance table:\n{}", luminance.to_ascii_table());
    }
    let quality = detect_table_quality(&luminance.values, &STD_LUMINANCE_QUANT_TABLE)
        .ok_or(QualityUndetermined::LuminanceUnknown)?;

    let chrominance = tables[1]
        .as_ref()
        .ok_or(QualityUndetermined::ChrominanceMissing)?;
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("chrominance table:\n{}", chrominance.to_ascii_table());
    }
    let chrominance_quality =
        detect_table_quality(&chrominance.values, &STD_CHROMINANCE_QUANT_TABLE);
    if chrominance_quality != Some(quality) {
        return Err(QualityUndetermined::ChrominanceMismatch {
            luminance: quality,
            chrominance: chrominance_quality,
        });
    }

    if let Some(extra) = tables[2..].iter().flatten().next() {
        return Err(QualityUndetermined::ExtraTable(extra.id));
    }

    log::debug!("detected quality {}", quality);
    Ok(quality)
}
