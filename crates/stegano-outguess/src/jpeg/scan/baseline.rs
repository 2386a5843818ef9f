//! Sequential Huffman scan encoding and decoding.
//!
//! Handles SOF0/SOF1 scans with full spectral range, interleaved or not,
//! with or without restart intervals.

use super::{mcu_blocks, scan_grid};
use crate::jpeg::coefficients::{Block, CoefficientStore};
use crate::jpeg::error::{JpegError, Result};
use crate::jpeg::huffman::{encode_coefficient, BitReader, BitWriter, HuffmanEncoder, HuffmanLookup};
use crate::jpeg::parser::{FrameInfo, HuffmanTable, Scan, ScanComponent};
use crate::jpeg::tables::ZIGZAG_TO_NATURAL;

/// Compile the tables referenced by a scan, one slot per scan component.
fn compile_tables<T>(
    components: &[ScanComponent],
    tables: &[Option<HuffmanTable>; 4],
    select: impl Fn(&ScanComponent) -> u8,
    kind: &str,
    compile: impl Fn(&HuffmanTable) -> Result<T>,
) -> Result<Vec<T>> {
    components
        .iter()
        .map(|component| {
            let id = select(component);
            let table = tables[id as usize].as_ref().ok_or_else(|| {
                JpegError::malformed(format!("missing {} Huffman table {}", kind, id))
            })?;
            compile(table)
        })
        .collect()
}

/// Decode one scan into `store`.
///
/// Blocks outside a component's block grid are decoded and dropped.
pub fn decode_scan_baseline(
    scan: &Scan,
    frame: &FrameInfo,
    store: &mut CoefficientStore,
) -> Result<()> {
    let dc_tables = compile_tables(
        &scan.components,
        &scan.dc_tables,
        |c| c.dc_table_id,
        "DC",
        HuffmanLookup::from_table,
    )?;
    let ac_tables = compile_tables(
        &scan.components,
        &scan.ac_tables,
        |c| c.ac_table_id,
        "AC",
        HuffmanLookup::from_table,
    )?;

    let (mcu_cols, mcu_rows) = scan_grid(frame, &scan.components);
    let restart_interval = scan.restart_interval as usize;

    let mut reader = BitReader::new(&scan.data);
    let mut dc_predictors = vec![0i32; scan.components.len()];
    let mut positions = Vec::new();
    let mut next_restart = 0u8;
    let mut block: Block = [0; 64];

    for mcu in 0..mcu_cols * mcu_rows {
        if restart_interval > 0 && mcu > 0 && mcu % restart_interval == 0 {
            reader.restart(next_restart);
            next_restart = (next_restart + 1) & 0x07;
            dc_predictors.fill(0);
        }

        mcu_blocks(frame, &scan.components, mcu / mcu_cols, mcu % mcu_cols, &mut positions);
        for &(slot, row, col) in &positions {
            decode_block(
                &mut reader,
                &mut block,
                &dc_tables[slot],
                &ac_tables[slot],
                &mut dc_predictors[slot],
            )?;

            if let Some(dst) = store.block_mut(scan.components[slot].index, row, col) {
                *dst = block;
            }
        }
    }

    log::trace!(
        "scan decoded: {} MCUs, {} of {} bytes consumed",
        mcu_cols * mcu_rows,
        reader.position(),
        scan.data.len()
    );

    Ok(())
}

/// Encode the blocks of `store` as one scan over `components`.
///
/// Edge MCUs are completed with dummy blocks whose AC coefficients are zero
/// and whose DC repeats the previous block of the MCU.
pub fn encode_scan_baseline(
    store: &CoefficientStore,
    frame: &FrameInfo,
    components: &[ScanComponent],
    dc_tables: &[Option<HuffmanTable>; 4],
    ac_tables: &[Option<HuffmanTable>; 4],
    restart_interval: u16,
) -> Result<Vec<u8>> {
    let dc_encoders = compile_tables(
        components,
        dc_tables,
        |c| c.dc_table_id,
        "DC",
        HuffmanEncoder::from_table,
    )?;
    let ac_encoders = compile_tables(
        components,
        ac_tables,
        |c| c.ac_table_id,
        "AC",
        HuffmanEncoder::from_table,
    )?;

    let (mcu_cols, mcu_rows) = scan_grid(frame, components);
    let restart_interval = restart_interval as usize;

    let capacity: usize = store.components.iter().map(|c| c.blocks.len() * 16).sum();
    let mut writer = BitWriter::with_capacity(capacity);
    let mut dc_predictors = vec![0i32; components.len()];
    let mut positions = Vec::new();
    let mut next_restart = 0u8;
    let mut dummy_blocks = 0usize;

    for mcu in 0..mcu_cols * mcu_rows {
        if restart_interval > 0 && mcu > 0 && mcu % restart_interval == 0 {
            writer.write_restart(next_restart);
            next_restart = (next_restart + 1) & 0x07;
            dc_predictors.fill(0);
        }

        mcu_blocks(frame, components, mcu / mcu_cols, mcu % mcu_cols, &mut positions);
        let mut previous_dc = 0i16;
        for &(slot, row, col) in &positions {
            let block = match store.block(components[slot].index, row, col) {
                Some(block) => *block,
                None => {
                    dummy_blocks += 1;
                    let mut dummy = [0i16; 64];
                    dummy[0] = previous_dc;
                    dummy
                }
            };
            previous_dc = block[0];

            encode_block(
                &mut writer,
                &block,
                &dc_encoders[slot],
                &ac_encoders[slot],
                &mut dc_predictors[slot],
            )?;
        }
    }

    let data = writer.into_bytes();
    log::debug!(
        "scan encoded: {} MCUs, {} dummy blocks, {} bytes",
        mcu_cols * mcu_rows,
        dummy_blocks,
        data.len()
    );
    Ok(data)
}

/// Encode a single 8x8 block of DCT coefficients.
fn encode_block(
    writer: &mut BitWriter,
    block: &Block,
    dc_encoder: &HuffmanEncoder,
    ac_encoder: &HuffmanEncoder,
    dc_predictor: &mut i32,
) -> Result<()> {
    // DC coefficient (delta from previous block)
    let dc_value = block[0] as i32;
    let dc_diff = dc_value - *dc_predictor;
    *dc_predictor = dc_value;

    let (dc_size, dc_bits) = encode_coefficient(dc_diff);
    if dc_size > 11 {
        return Err(JpegError::entropy(format!(
            "DC difference {} out of range",
            dc_diff
        )));
    }
    writer.write_huffman(dc_size, dc_encoder)?;
    if dc_size > 0 {
        writer.write_bits(dc_bits, dc_size);
    }

    // AC coefficients with run-length encoding
    let mut zero_run = 0u8;

    for &natural in &ZIGZAG_TO_NATURAL[1..] {
        let coeff = block[natural];

        if coeff == 0 {
            zero_run += 1;
            continue;
        }

        // ZRL codes for runs of 16+ zeros
        while zero_run >= 16 {
            writer.write_huffman(0xF0, ac_encoder)?;
            zero_run -= 16;
        }

        let (size, bits) = encode_coefficient(coeff as i32);
        if size > 10 {
            return Err(JpegError::entropy(format!(
                "AC coefficient {} out of range",
                coeff
            )));
        }
        writer.write_huffman((zero_run << 4) | size, ac_encoder)?;
        writer.write_bits(bits, size);
        zero_run = 0;
    }

    // EOB if the block ends in zeros
    if zero_run > 0 {
        writer.write_huffman(0x00, ac_encoder)?;
    }

    Ok(())
}

/// Decode a single 8x8 block of DCT coefficients in natural order.
fn decode_block(
    reader: &mut BitReader,
    block: &mut Block,
    dc_table: &HuffmanLookup,
    ac_table: &HuffmanLookup,
    dc_predictor: &mut i32,
) -> Result<()> {
    block.fill(0);

    let dc_size = reader.decode_huffman(dc_table)?;
    if dc_size > 11 {
        return Err(JpegError::entropy(format!(
            "invalid DC coefficient size: {}",
            dc_size
        )));
    }

    *dc_predictor += reader.receive_extend(dc_size);
    block[0] = *dc_predictor as i16;

    let mut k = 1;
    while k < 64 {
        let symbol = reader.decode_huffman(ac_table)?;
        let run = (symbol >> 4) as usize;
        let size = symbol & 0x0F;

        if size == 0 {
            if run != 0x0F {
                // EOB
                break;
            }
            // ZRL
            k += 16;
            continue;
        }

        if size > 10 {
            return Err(JpegError::entropy(format!(
                "invalid AC coefficient size: {}",
                size
            )));
        }

        k += run;
        if k >= 64 {
            return Err(JpegError::entropy("AC coefficient index out of bounds"));
        }

        block[ZIGZAG_TO_NATURAL[k]] = reader.receive_extend(size) as i16;
        k += 1;
    }

    Ok(())
}
