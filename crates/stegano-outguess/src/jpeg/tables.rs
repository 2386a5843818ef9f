//! Standard tables of the IJG reference encoder.
//!
//! The quantization tables are the ones from ITU T.81 Annex K.1, scaled by the
//! IJG quality formula. The Huffman tables are the Annex K.3 defaults that an
//! encoder uses when it does not optimize its entropy coding.

use super::parser::HuffmanTable;

/// Zigzag order to natural (row-major) order mapping.
pub const ZIGZAG_TO_NATURAL: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Natural (row-major) order to zigzag order mapping.
pub const NATURAL_TO_ZIGZAG: [usize; 64] = [
    0, 1, 5, 6, 14, 15, 27, 28, 2, 4, 7, 13, 16, 26, 29, 42, 3, 8, 12, 17, 25, 30, 41, 43, 9, 11,
    18, 24, 31, 40, 44, 53, 10, 19, 23, 32, 39, 45, 52, 54, 20, 22, 33, 38, 46, 51, 55, 60, 21, 34,
    37, 47, 50, 56, 59, 61, 35, 36, 48, 49, 57, 58, 62, 63,
];

/// Annex K.1 luminance quantization table, natural order.
#[rustfmt::skip]
pub const STD_LUMINANCE_QUANT_TABLE: [u16; 64] = [
    16,  11,  10,  16,  24,  40,  51,  61,
    12,  12,  14,  19,  26,  58,  60,  55,
    14,  13,  16,  24,  40,  57,  69,  56,
    14,  17,  22,  29,  51,  87,  80,  62,
    18,  22,  37,  56,  68, 109, 103,  77,
    24,  35,  55,  64,  81, 104, 113,  92,
    49,  64,  78,  87, 103, 121, 120, 101,
    72,  92,  95,  98, 112, 100, 103,  99,
];

/// Annex K.1 chrominance quantization table, natural order.
#[rustfmt::skip]
pub const STD_CHROMINANCE_QUANT_TABLE: [u16; 64] = [
    17,  18,  24,  47,  99,  99,  99,  99,
    18,  21,  26,  66,  99,  99,  99,  99,
    24,  26,  56,  99,  99,  99,  99,  99,
    47,  66,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
];

/// Convert a quality rating (1-100) into a percentage scaling factor.
///
/// Qualities outside 1..=100 are clamped first. Below 50 the factor is
/// `5000 / quality`, otherwise `200 - 2 * quality`.
pub fn quality_scaling(quality: u8) -> u32 {
    let quality = u32::from(quality.clamp(1, 100));
    if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    }
}

/// Scale a base table by a percentage, rounding half up.
///
/// Values are kept within 1..=32767, or within 1..=255 when `force_baseline`
/// is set so the table can be stored with 8-bit precision.
pub fn scale_quant_table(base: &[u16; 64], scale_percent: u32, force_baseline: bool) -> [u16; 64] {
    let max = if force_baseline { 255 } else { 32767 };
    let mut scaled = [0u16; 64];
    for (out, &value) in scaled.iter_mut().zip(base.iter()) {
        let temp = (u32::from(value) * scale_percent + 50) / 100;
        *out = temp.clamp(1, max) as u16;
    }
    scaled
}

/// DC luminance code length counts (lengths 1-16).
const DC_LUMINANCE_BITS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
const DC_LUMINANCE_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

const DC_CHROMINANCE_BITS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
const DC_CHROMINANCE_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

const AC_LUMINANCE_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7d];
#[rustfmt::skip]
const AC_LUMINANCE_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08, 0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

const AC_CHROMINANCE_BITS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
#[rustfmt::skip]
const AC_CHROMINANCE_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34, 0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// The four Annex K.3 Huffman tables: `(dc_tables, ac_tables)`, ids 0 and 1.
pub fn std_huffman_tables() -> ([Option<HuffmanTable>; 4], [Option<HuffmanTable>; 4]) {
    let table = |class: u8, id: u8, bits: &[u8; 16], values: &[u8]| {
        Some(HuffmanTable {
            class,
            id,
            code_lengths: *bits,
            values: values.to_vec(),
        })
    };

    let dc = [
        table(0, 0, &DC_LUMINANCE_BITS, &DC_LUMINANCE_VALUES),
        table(0, 1, &DC_CHROMINANCE_BITS, &DC_CHROMINANCE_VALUES),
        None,
        None,
    ];
    let ac = [
        table(1, 0, &AC_LUMINANCE_BITS, &AC_LUMINANCE_VALUES),
        table(1, 1, &AC_CHROMINANCE_BITS, &AC_CHROMINANCE_VALUES),
        None,
        None,
    ];
    (dc, ac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_mapping_is_inverse() {
        assert_eq!(ZIGZAG_TO_NATURAL[0], 0);
        for i in 0..64 {
            assert_eq!(NATURAL_TO_ZIGZAG[ZIGZAG_TO_NATURAL[i]], i);
        }
    }

    #[test]
    fn test_quality_scaling_breakpoints() {
        assert_eq!(quality_scaling(0), 5000);
        assert_eq!(quality_scaling(1), 5000);
        assert_eq!(quality_scaling(3), 1666);
        assert_eq!(quality_scaling(49), 102);
        assert_eq!(quality_scaling(50), 100);
        assert_eq!(quality_scaling(75), 50);
        assert_eq!(quality_scaling(100), 0);
        assert_eq!(quality_scaling(200), 0);
    }

    #[test]
    fn test_quality_50_is_the_base_table() {
        let scaled = scale_quant_table(&STD_LUMINANCE_QUANT_TABLE, quality_scaling(50), true);
        assert_eq!(scaled, STD_LUMINANCE_QUANT_TABLE);
    }

    #[test]
    fn test_scaling_clamps_to_baseline_range() {
        let lowest = scale_quant_table(&STD_LUMINANCE_QUANT_TABLE, quality_scaling(1), true);
        assert!(lowest.iter().all(|&v| v == 255));

        let extended = scale_quant_table(&STD_LUMINANCE_QUANT_TABLE, quality_scaling(1), false);
        assert_eq!(extended[0], 800);

        let highest = scale_quant_table(&STD_CHROMINANCE_QUANT_TABLE, quality_scaling(100), true);
        assert!(highest.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_quality_75_luminance_dc() {
        // (16 * 50 + 50) / 100 = 8
        let scaled = scale_quant_table(&STD_LUMINANCE_QUANT_TABLE, quality_scaling(75), true);
        assert_eq!(scaled[0], 8);
        assert_eq!(scaled[63], 50);
    }

    #[test]
    fn test_huffman_tables_symbol_counts() {
        let (dc, ac) = std_huffman_tables();
        for table in dc.iter().chain(ac.iter()).flatten() {
            let total: usize = table.code_lengths.iter().map(|&n| n as usize).sum();
            assert_eq!(total, table.values.len());
        }
        assert_eq!(ac[0].as_ref().unwrap().values.len(), 162);
        assert!(dc[2].is_none());
    }
}
