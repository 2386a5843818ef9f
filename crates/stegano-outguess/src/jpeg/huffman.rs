//! Huffman coding for JPEG entropy coding.
//!
//! Implements Huffman encoding and decoding for JPEG scan data.
//!
//! Adapted from:
//! - [jpeg-decoder](https://github.com/image-rs/jpeg-decoder) - decoding
//! - [jpeg-encoder](https://github.com/vstroebel/jpeg-encoder) - encoding

use super::error::{JpegError, Result};
use super::parser::HuffmanTable;

/// Lookup table size (8-bit fast path).
const LUT_BITS: usize = 8;
const LUT_SIZE: usize = 1 << LUT_BITS;

/// Longest Huffman code JPEG allows.
const MAX_CODE_BITS: usize = 16;

/// Compiled Huffman table for fast decoding.
///
/// Uses a two-level approach:
/// 1. Fast LUT for codes ≤ 8 bits
/// 2. Canonical max-code search for longer codes
#[derive(Debug, Clone)]
pub struct HuffmanLookup {
    /// Fast lookup table: (symbol, code_length) for codes ≤ 8 bits.
    /// Entry is (0, 0) if code is longer than 8 bits.
    lut: [(u8, u8); LUT_SIZE],

    /// Largest code of each length, -1 if there is none.
    maxcode: [i32; MAX_CODE_BITS + 1],

    /// Index of the first symbol of each length minus the first code of that length.
    valoffset: [i32; MAX_CODE_BITS + 1],

    /// Symbol values in code-length order.
    values: Vec<u8>,
}

impl HuffmanLookup {
    /// Build lookup tables from a parsed Huffman table.
    pub fn from_table(table: &HuffmanTable) -> Result<Self> {
        // Generate Huffman codes from code lengths (JPEG spec Figure C.1)
        let (code_sizes, codes) = derive_huffman_codes(&table.code_lengths)?;
        if table.values.len() < codes.len() {
            return Err(JpegError::entropy("Huffman table has fewer symbols than codes"));
        }

        let mut lookup = HuffmanLookup {
            lut: [(0, 0); LUT_SIZE],
            maxcode: [-1; MAX_CODE_BITS + 1],
            valoffset: [0; MAX_CODE_BITS + 1],
            values: table.values.clone(),
        };

        let mut first = 0usize;
        for (len, &count) in table.code_lengths.iter().enumerate() {
            let count = count as usize;
            if count > 0 {
                lookup.valoffset[len + 1] = first as i32 - codes[first] as i32;
                lookup.maxcode[len + 1] = codes[first + count - 1] as i32;
            }
            first += count;
        }

        // Build fast LUT for codes ≤ 8 bits
        for (idx, (&code, &len)) in codes.iter().zip(code_sizes.iter()).enumerate() {
            if len as usize <= LUT_BITS {
                let symbol = lookup.values[idx];
                // Fill all LUT entries that match this code
                let shift = LUT_BITS - len as usize;
                let base = (code as usize) << shift;
                for k in 0..(1 << shift) {
                    lookup.lut[base + k] = (symbol, len);
                }
            }
        }

        Ok(lookup)
    }

    /// Get the symbol values slice.
    #[inline]
    pub fn values(&self) -> &[u8] {
        &self.values
    }
}

/// Compiled Huffman table for fast encoding.
///
/// Maps symbols to (code, length) pairs for O(1) encoding lookup.
#[derive(Debug, Clone)]
pub struct HuffmanEncoder {
    /// Encode lookup: symbol → (code, code_length).
    /// None if symbol is not in table.
    encode_map: [Option<(u16, u8)>; 256],
}

impl HuffmanEncoder {
    /// Build encoder lookup from a parsed Huffman table.
    pub fn from_table(table: &HuffmanTable) -> Result<Self> {
        let (code_sizes, codes) = derive_huffman_codes(&table.code_lengths)?;

        let mut encode_map = [None; 256];
        for (idx, (&code, &len)) in codes.iter().zip(code_sizes.iter()).enumerate() {
            let symbol = *table
                .values
                .get(idx)
                .ok_or_else(|| JpegError::entropy("Huffman table has fewer symbols than codes"))?;
            encode_map[symbol as usize] = Some((code, len));
        }

        Ok(HuffmanEncoder { encode_map })
    }

    /// Get code and length for a symbol.
    #[inline]
    pub fn encode(&self, symbol: u8) -> Option<(u16, u8)> {
        self.encode_map[symbol as usize]
    }
}

/// Derive Huffman codes from code length counts.
///
/// Implements JPEG specification Figure C.1 and C.2.
fn derive_huffman_codes(code_lengths: &[u8; 16]) -> Result<(Vec<u8>, Vec<u16>)> {
    let total: usize = code_lengths.iter().map(|&n| n as usize).sum();
    if total > 256 {
        return Err(JpegError::entropy("Huffman table has more than 256 symbols"));
    }

    // HUFFSIZE: list of code lengths
    let mut huffsize = Vec::with_capacity(total);
    for (len, &count) in code_lengths.iter().enumerate() {
        for _ in 0..count {
            huffsize.push((len + 1) as u8);
        }
    }

    // HUFFCODE: Huffman codes for each symbol
    let mut huffcode = Vec::with_capacity(total);
    let mut code: u32 = 0;
    let mut si = huffsize.first().copied().unwrap_or(0);

    for &size in &huffsize {
        while si < size {
            code <<= 1;
            si += 1;
        }
        if code >= (1u32 << size) {
            return Err(JpegError::entropy("invalid Huffman code (overflow)"));
        }
        huffcode.push(code as u16);
        code += 1;
    }

    Ok((huffsize, huffcode))
}

/// Bit reader for entropy-coded data.
///
/// Handles:
/// - Bit-level reading from byte stream
/// - Byte stuffing (0xFF00 → 0xFF)
/// - Restart markers (0xFFD0-0xFFD7), which stop the reader until
///   [`BitReader::restart`] is called
///
/// Reading past a marker or the end of data yields zero bits and logs a
/// single warning.
pub struct BitReader<'a> {
    /// Source data.
    data: &'a [u8],
    /// Current byte position.
    pos: usize,
    /// Bit buffer.
    bits: u64,
    /// Number of valid bits in buffer.
    num_bits: u8,
    /// A marker or the end of data was reached; no more bytes are loaded.
    at_marker: bool,
    /// Bits past the end of the segment were consumed.
    overrun: bool,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader.
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            pos: 0,
            bits: 0,
            num_bits: 0,
            at_marker: false,
            overrun: false,
        }
    }

    /// Get current byte position (for debugging).
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once bits past the end of the current segment were consumed.
    #[inline]
    pub fn is_overrun(&self) -> bool {
        self.overrun
    }

    /// Fill bit buffer with more bytes, stopping at any marker.
    fn fill_bits(&mut self) {
        while self.num_bits <= 56 && !self.at_marker {
            let Some(&byte) = self.data.get(self.pos) else {
                self.at_marker = true;
                break;
            };

            if byte == 0xFF {
                if self.data.get(self.pos + 1) == Some(&0x00) {
                    self.pos += 2;
                } else {
                    self.at_marker = true;
                    break;
                }
            } else {
                self.pos += 1;
            }

            self.bits = (self.bits << 8) | byte as u64;
            self.num_bits += 8;
        }
    }

    /// Peek at the next `count` bits (at most 16) without consuming them.
    ///
    /// Missing bits past a marker read as zeros.
    #[inline]
    pub fn peek_bits(&mut self, count: u8) -> u16 {
        debug_assert!(count <= 16);
        if self.num_bits < count {
            self.fill_bits();
        }

        let value = if self.num_bits >= count {
            self.bits >> (self.num_bits - count)
        } else {
            self.bits << (count - self.num_bits)
        };
        (value & ((1u64 << count) - 1)) as u16
    }

    /// Consume `count` bits from the buffer.
    #[inline]
    pub fn consume_bits(&mut self, count: u8) {
        if count > self.num_bits {
            if !self.overrun {
                log::warn!("Corrupt JPEG data: premature end of data segment");
                self.overrun = true;
            }
            self.num_bits = 0;
        } else {
            self.num_bits -= count;
        }
    }

    /// Read `count` bits and return as u16.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> u16 {
        let value = self.peek_bits(count);
        self.consume_bits(count);
        value
    }

    /// Decode one Huffman symbol.
    pub fn decode_huffman(&mut self, table: &HuffmanLookup) -> Result<u8> {
        let peek = self.peek_bits(MAX_CODE_BITS as u8);

        let (symbol, len) = table.lut[(peek >> (MAX_CODE_BITS - LUT_BITS)) as usize];
        if len > 0 {
            self.consume_bits(len);
            return Ok(symbol);
        }

        // Slow path: codes longer than 8 bits
        for len in (LUT_BITS + 1)..=MAX_CODE_BITS {
            let code = (peek >> (MAX_CODE_BITS - len)) as i32;
            if code <= table.maxcode[len] {
                self.consume_bits(len as u8);
                let index = (code + table.valoffset[len]) as usize;
                return table
                    .values
                    .get(index)
                    .copied()
                    .ok_or_else(|| JpegError::entropy("Huffman symbol index out of range"));
            }
        }

        Err(JpegError::entropy(format!(
            "bad Huffman code near byte {}",
            self.pos
        )))
    }

    /// Read and sign-extend a value.
    ///
    /// JPEG uses a sign-magnitude representation where the first bit
    /// indicates sign (0 = negative, 1 = positive).
    pub fn receive_extend(&mut self, size: u8) -> i32 {
        if size == 0 {
            return 0;
        }

        let value = self.read_bits(size) as i32;

        // Sign extension (JPEG spec Figure F.12)
        if value < 1 << (size - 1) {
            value - (1 << size) + 1
        } else {
            value
        }
    }

    /// Process a restart marker.
    ///
    /// Discards the buffered bits and consumes the next RSTn marker. A marker
    /// with the wrong number, or garbage in front of it, is tolerated with a
    /// warning.
    pub fn restart(&mut self, expected: u8) {
        self.bits = 0;
        self.num_bits = 0;

        let mut skipped = 0usize;
        while self.pos < self.data.len() {
            if self.data[self.pos] == 0xFF {
                if let Some(&code @ 0xD0..=0xD7) = self.data.get(self.pos + 1) {
                    if skipped > 0 {
                        log::warn!(
                            "Corrupt JPEG data: {} extraneous bytes before RST marker",
                            skipped
                        );
                    }
                    if code != 0xD0 + expected {
                        log::warn!(
                            "Corrupt JPEG data: found RST{} instead of RST{}",
                            code - 0xD0,
                            expected
                        );
                    }
                    self.pos += 2;
                    self.at_marker = false;
                    self.overrun = false;
                    return;
                }
            }
            self.pos += 1;
            skipped += 1;
        }

        log::warn!(
            "Corrupt JPEG data: premature end of data segment, RST{} missing",
            expected
        );
    }
}

/// Bit writer for entropy-coded data.
///
/// Handles:
/// - Bit-level writing to byte stream
/// - Byte stuffing (0xFF → 0xFF 0x00)
/// - Padding to byte boundary
/// - Restart markers
///
/// Adapted from [jpeg-encoder](https://github.com/vstroebel/jpeg-encoder).
pub struct BitWriter {
    /// Output buffer.
    data: Vec<u8>,
    /// Bit accumulator (holds up to 32 bits).
    bits: u32,
    /// Number of valid bits in accumulator.
    num_bits: u8,
}

impl BitWriter {
    /// Create a new bit writer.
    pub fn new() -> Self {
        BitWriter {
            data: Vec::new(),
            bits: 0,
            num_bits: 0,
        }
    }

    /// Create a new bit writer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        BitWriter {
            data: Vec::with_capacity(capacity),
            bits: 0,
            num_bits: 0,
        }
    }

    /// Write `count` bits from `value`.
    ///
    /// Bits are written from MSB. For example, write_bits(0b101, 3)
    /// writes bits 1, 0, 1 in order.
    #[inline]
    pub fn write_bits(&mut self, value: u16, count: u8) {
        debug_assert!(count <= 16);

        self.bits = (self.bits << count) | (value as u32 & ((1u32 << count) - 1));
        self.num_bits += count;

        while self.num_bits >= 8 {
            self.num_bits -= 8;
            let byte = (self.bits >> self.num_bits) as u8;
            self.write_byte(byte);
        }

        self.bits &= (1u32 << self.num_bits) - 1;
    }

    /// Write a Huffman-encoded symbol.
    #[inline]
    pub fn write_huffman(&mut self, symbol: u8, table: &HuffmanEncoder) -> Result<()> {
        let (code, len) = table
            .encode(symbol)
            .ok_or_else(|| JpegError::entropy(format!("symbol {} not in Huffman table", symbol)))?;
        self.write_bits(code, len);
        Ok(())
    }

    /// Write a single byte with byte stuffing.
    fn write_byte(&mut self, byte: u8) {
        self.data.push(byte);
        if byte == 0xFF {
            self.data.push(0x00);
        }
    }

    /// Pad to byte boundary with 1 bits and flush.
    pub fn flush(&mut self) {
        if self.num_bits > 0 {
            let padding = 8 - self.num_bits;
            let value = (self.bits << padding) | ((1u32 << padding) - 1);
            self.write_byte(value as u8);
            self.num_bits = 0;
            self.bits = 0;
        }
    }

    /// Flush pending bits and emit restart marker RSTn.
    pub fn write_restart(&mut self, n: u8) {
        self.flush();
        self.data.extend_from_slice(&[0xFF, 0xD0 + (n & 7)]);
    }

    /// Get the written data, consuming the writer.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.data
    }

    /// Get current length of written data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no data has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.num_bits == 0
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the bit size (category) and additional bits for a coefficient
/// or DC difference.
///
/// Returns (size, bits) where:
/// - size: number of bits needed
/// - bits: additional bits to write after Huffman code
///
/// For positive values, bits = value.
/// For negative values, bits = value + 2^size - 1 (the complement representation).
///
/// This is the inverse of receive_extend.
#[inline]
pub fn encode_coefficient(value: i32) -> (u8, u16) {
    if value == 0 {
        return (0, 0);
    }

    let abs_value = value.unsigned_abs();
    let size = (32 - abs_value.leading_zeros()) as u8;

    let bits = if value < 0 {
        ((1u32 << size) - 1) - abs_value
    } else {
        abs_value
    };

    (size, bits as u16)
}
