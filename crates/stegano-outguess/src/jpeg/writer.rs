//! JPEG marker segment writer.
//!
//! Emits the segments of an interchange-format JPEG in the layout a
//! libjpeg-6b compressor produces.
//!
//! Adapted from [jpeg-encoder](https://github.com/vstroebel/jpeg-encoder).

use super::error::{JpegError, Result};
use super::marker::Marker;
use super::parser::{FrameInfo, HuffmanTable, QuantizationTable, ScanComponent};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

/// Contents of a JFIF APP0 marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JfifHeader {
    pub major_version: u8,
    pub minor_version: u8,
    /// 0 = aspect ratio only, 1 = dots per inch, 2 = dots per cm.
    pub density_unit: u8,
    pub x_density: u16,
    pub y_density: u16,
}

impl Default for JfifHeader {
    fn default() -> Self {
        JfifHeader {
            major_version: 1,
            minor_version: 1,
            density_unit: 0,
            x_density: 1,
            y_density: 1,
        }
    }
}

/// Write a marker to the output.
pub fn write_marker<W: Write>(w: &mut W, marker: Marker) -> Result<()> {
    w.write_all(&[0xFF, marker.to_u8()])?;
    Ok(())
}

/// Write the marker and the length field of a segment with `payload` body bytes.
fn write_segment_start<W: Write>(w: &mut W, marker: Marker, payload: usize) -> Result<()> {
    let length = u16::try_from(payload + 2)
        .map_err(|_| JpegError::Encoder(format!("{:?} segment too long", marker)))?;
    write_marker(w, marker)?;
    w.write_u16::<BigEndian>(length)?;
    Ok(())
}

/// Write a JFIF APP0 segment without thumbnail.
pub fn write_jfif<W: Write>(w: &mut W, header: &JfifHeader) -> Result<()> {
    write_segment_start(w, Marker::APP(0), 14)?;
    w.write_all(b"JFIF\0")?;
    w.write_u8(header.major_version)?;
    w.write_u8(header.minor_version)?;
    w.write_u8(header.density_unit)?;
    w.write_u16::<BigEndian>(header.x_density)?;
    w.write_u16::<BigEndian>(header.y_density)?;
    // no thumbnail
    w.write_all(&[0, 0])?;
    Ok(())
}

/// Write an Adobe APP14 segment carrying the colour transform flag.
pub fn write_adobe<W: Write>(w: &mut W, transform: u8) -> Result<()> {
    write_segment_start(w, Marker::APP(14), 12)?;
    w.write_all(b"Adobe")?;
    w.write_u16::<BigEndian>(100)?;
    w.write_u16::<BigEndian>(0)?;
    w.write_u16::<BigEndian>(0)?;
    w.write_u8(transform)?;
    Ok(())
}

/// Write one quantization table as its own DQT segment, values in zigzag order.
///
/// Returns true if the table needed 16-bit precision.
pub fn write_dqt<W: Write>(w: &mut W, table: &QuantizationTable) -> Result<bool> {
    let wide = table.values.iter().any(|&v| v > 255);

    write_segment_start(w, Marker::DQT, 1 + if wide { 128 } else { 64 })?;
    w.write_u8(((wide as u8) << 4) | table.id)?;
    for zigzag in 0..64 {
        let value = table.get_zigzag(zigzag);
        if wide {
            w.write_u16::<BigEndian>(value)?;
        } else {
            w.write_u8(value as u8)?;
        }
    }

    Ok(wide)
}

/// Write the SOF segment of `frame`.
pub fn write_sof<W: Write>(w: &mut W, frame: &FrameInfo) -> Result<()> {
    write_segment_start(w, Marker::SOF(frame.sof_type), 6 + 3 * frame.components.len())?;
    w.write_u8(frame.precision)?;
    w.write_u16::<BigEndian>(frame.height)?;
    w.write_u16::<BigEndian>(frame.width)?;
    w.write_u8(frame.components.len() as u8)?;
    for component in &frame.components {
        w.write_u8(component.id)?;
        w.write_u8((component.h_sampling << 4) | component.v_sampling)?;
        w.write_u8(component.quant_table_id)?;
    }
    Ok(())
}

/// Write one Huffman table as its own DHT segment.
pub fn write_dht<W: Write>(w: &mut W, table: &HuffmanTable) -> Result<()> {
    write_segment_start(w, Marker::DHT, 1 + 16 + table.values.len())?;
    w.write_u8((table.class << 4) | table.id)?;
    w.write_all(&table.code_lengths)?;
    w.write_all(&table.values)?;
    Ok(())
}

/// Write a DRI segment.
pub fn write_dri<W: Write>(w: &mut W, restart_interval: u16) -> Result<()> {
    write_segment_start(w, Marker::DRI, 2)?;
    w.write_u16::<BigEndian>(restart_interval)?;
    Ok(())
}

/// Write the SOS header of a sequential scan.
pub fn write_sos<W: Write>(
    w: &mut W,
    frame: &FrameInfo,
    components: &[ScanComponent],
) -> Result<()> {
    write_segment_start(w, Marker::SOS, 1 + 2 * components.len() + 3)?;
    w.write_u8(components.len() as u8)?;
    for component in components {
        let info = frame.components.get(component.index).ok_or_else(|| {
            JpegError::Encoder(format!("scan refers to component {}", component.index))
        })?;
        w.write_u8(info.id)?;
        w.write_u8((component.dc_table_id << 4) | component.ac_table_id)?;
    }
    // Ss, Se, Ah/Al of a sequential scan
    w.write_all(&[0, 63, 0])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::parser::{layout_components, parse_jpeg, ComponentInfo};
    use crate::jpeg::tables::{scale_quant_table, std_huffman_tables, STD_LUMINANCE_QUANT_TABLE};

    fn frame_420(width: u16, height: u16) -> FrameInfo {
        let mut components = vec![
            ComponentInfo::new(1, 2, 2, 0),
            ComponentInfo::new(2, 1, 1, 1),
            ComponentInfo::new(3, 1, 1, 1),
        ];
        layout_components(width, height, &mut components);
        FrameInfo {
            sof_type: 0,
            precision: 8,
            height,
            width,
            components,
        }
    }

    #[test]
    fn test_jfif_bytes() {
        let mut out = Vec::new();
        write_jfif(&mut out, &JfifHeader::default()).unwrap();
        assert_eq!(
            out,
            vec![
                0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
                0x01, 0x00, 0x01, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_adobe_bytes() {
        let mut out = Vec::new();
        write_adobe(&mut out, 2).unwrap();
        assert_eq!(&out[..4], &[0xFF, 0xEE, 0x00, 0x0E]);
        assert_eq!(&out[4..9], b"Adobe");
        assert_eq!(out.len(), 16);
        assert_eq!(out[15], 2);
    }

    #[test]
    fn test_dqt_precision_follows_values() {
        let table = QuantizationTable {
            id: 1,
            precision: 0,
            values: scale_quant_table(&STD_LUMINANCE_QUANT_TABLE, 50, true),
        };
        let mut out = Vec::new();
        assert!(!write_dqt(&mut out, &table).unwrap());
        assert_eq!(&out[..5], &[0xFF, 0xDB, 0x00, 67, 0x01]);
        assert_eq!(out.len(), 4 + 65);
        // first zigzag entries: (0,0)=16, (0,1)=11, (1,0)=12 at 50%
        assert_eq!(&out[5..8], &[8, 6, 6]);

        let wide = QuantizationTable {
            id: 0,
            precision: 1,
            values: scale_quant_table(&STD_LUMINANCE_QUANT_TABLE, 5000, false),
        };
        let mut out = Vec::new();
        assert!(write_dqt(&mut out, &wide).unwrap());
        assert_eq!(&out[..5], &[0xFF, 0xDB, 0x00, 131, 0x10]);
    }

    #[test]
    fn test_header_segments_parse_back() {
        let frame = frame_420(33, 17);
        let (dc, ac) = std_huffman_tables();
        let scan = [
            ScanComponent { index: 0, dc_table_id: 0, ac_table_id: 0 },
            ScanComponent { index: 1, dc_table_id: 1, ac_table_id: 1 },
            ScanComponent { index: 2, dc_table_id: 1, ac_table_id: 1 },
        ];

        let mut out = Vec::new();
        write_marker(&mut out, Marker::SOI).unwrap();
        write_jfif(&mut out, &JfifHeader::default()).unwrap();
        write_sof(&mut out, &frame).unwrap();
        for table in dc.iter().chain(ac.iter()).flatten() {
            write_dht(&mut out, table).unwrap();
        }
        write_dri(&mut out, 4).unwrap();
        write_sos(&mut out, &frame, &scan).unwrap();
        write_marker(&mut out, Marker::EOI).unwrap();

        let segments = parse_jpeg(&out).unwrap();
        assert!(segments.jfif);
        assert_eq!(segments.frame.unwrap().components, frame.components);
        assert_eq!(segments.dc_huff_tables, dc);
        assert_eq!(segments.ac_huff_tables, ac);
        assert_eq!(segments.scans.len(), 1);
        assert_eq!(segments.scans[0].restart_interval, 4);
        assert_eq!(segments.scans[0].components, scan.to_vec());
    }

    #[test]
    fn test_dht_index_byte_marks_ac_tables() {
        let (_, ac) = std_huffman_tables();
        let mut out = Vec::new();
        write_dht(&mut out, ac[1].as_ref().unwrap()).unwrap();
        assert_eq!(out[4], 0x11);
        assert_eq!(u16::from_be_bytes([out[2], out[3]]) as usize, out.len() - 2);
    }
}
