//! JPEG container parsing.
//!
//! Walks the marker segments of a sequential JPEG and collects what the
//! coefficient decoder needs:
//! - Quantization tables (DQT)
//! - Huffman tables (DHT), latched per scan
//! - Frame info and per-component block grids (SOF)
//! - Restart interval (DRI), latched per scan
//! - JFIF / Adobe markers for colour-space inference
//! - Entropy-coded data of every scan (SOS)

use super::error::{JpegError, Result};
use super::marker::Marker;
use super::tables::ZIGZAG_TO_NATURAL;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// A JPEG quantization table (8x8 = 64 values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    /// Table ID (0-3).
    pub id: u8,
    /// Precision: 0 = 8-bit, 1 = 16-bit.
    pub precision: u8,
    /// Table values in natural (row-major) order.
    pub values: [u16; 64],
}

impl QuantizationTable {
    /// Get value at natural (row, col) position.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u16 {
        self.values[row * 8 + col]
    }

    /// Get value at zigzag index, the order the table is stored in a DQT segment.
    #[inline]
    pub fn get_zigzag(&self, index: usize) -> u16 {
        self.values[ZIGZAG_TO_NATURAL[index]]
    }

    /// Format table as ASCII art for display.
    pub fn to_ascii_table(&self) -> String {
        let mut out = String::new();

        out.push_str("|    |");
        for x in 0..8 {
            out.push_str(&format!("   x{} |", x));
        }
        out.push('\n');

        out.push_str("|----|");
        for _ in 0..8 {
            out.push_str("------|");
        }
        out.push('\n');

        for y in 0..8 {
            out.push_str(&format!("| y{} ", y));
            for x in 0..8 {
                out.push_str(&format!("| {:4} ", self.get(y, x)));
            }
            out.push_str("|\n");
        }

        out
    }
}

/// Huffman table as stored in a DHT segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    /// Table class: 0 = DC, 1 = AC.
    pub class: u8,
    /// Table ID (0-3).
    pub id: u8,
    /// Number of codes of each length (1-16 bits).
    pub code_lengths: [u8; 16],
    /// Symbol values (up to 256).
    pub values: Vec<u8>,
}

/// Per-component frame parameters and block grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Component ID as written in SOF and SOS.
    pub id: u8,
    /// Horizontal sampling factor.
    pub h_sampling: u8,
    /// Vertical sampling factor.
    pub v_sampling: u8,
    /// Quantization table ID to use.
    pub quant_table_id: u8,
    /// Number of 8x8 blocks per row that carry image data.
    pub width_in_blocks: usize,
    /// Number of 8x8 block rows that carry image data.
    pub height_in_blocks: usize,
}

impl ComponentInfo {
    pub fn new(id: u8, h_sampling: u8, v_sampling: u8, quant_table_id: u8) -> Self {
        ComponentInfo {
            id,
            h_sampling,
            v_sampling,
            quant_table_id,
            width_in_blocks: 0,
            height_in_blocks: 0,
        }
    }
}

/// Derive every component's block grid from the image size and sampling factors.
pub fn layout_components(width: u16, height: u16, components: &mut [ComponentInfo]) {
    let h_max = components.iter().map(|c| c.h_sampling as usize).max().unwrap_or(1);
    let v_max = components.iter().map(|c| c.v_sampling as usize).max().unwrap_or(1);

    for component in components.iter_mut() {
        component.width_in_blocks =
            (width as usize * component.h_sampling as usize).div_ceil(h_max * 8);
        component.height_in_blocks =
            (height as usize * component.v_sampling as usize).div_ceil(v_max * 8);
    }
}

/// Frame information from the SOF marker.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// SOF process number (0 = baseline, 1 = extended sequential, ...).
    pub sof_type: u8,
    /// Sample precision (8 bits).
    pub precision: u8,
    /// Image height in pixels.
    pub height: u16,
    /// Image width in pixels.
    pub width: u16,
    /// Components in frame order (Y, Cb, Cr for colour JPEG).
    pub components: Vec<ComponentInfo>,
}

impl FrameInfo {
    pub fn max_h_sampling(&self) -> usize {
        self.components.iter().map(|c| c.h_sampling as usize).max().unwrap_or(1)
    }

    pub fn max_v_sampling(&self) -> usize {
        self.components.iter().map(|c| c.v_sampling as usize).max().unwrap_or(1)
    }

    /// Size of the interleaved MCU grid as `(columns, rows)`.
    pub fn mcu_grid(&self) -> (usize, usize) {
        let cols = (self.width as usize).div_ceil(self.max_h_sampling() * 8);
        let rows = (self.height as usize).div_ceil(self.max_v_sampling() * 8);
        (cols, rows)
    }
}

/// Colour space of the coded components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Unknown,
    Grayscale,
    Rgb,
    YCbCr,
    Cmyk,
    Ycck,
}

/// A component taking part in a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponent {
    /// Index into [`FrameInfo::components`].
    pub index: usize,
    /// DC Huffman table ID.
    pub dc_table_id: u8,
    /// AC Huffman table ID.
    pub ac_table_id: u8,
}

/// One sequential scan with the tables that were in effect at its SOS.
#[derive(Debug, Clone)]
pub struct Scan {
    pub components: Vec<ScanComponent>,
    /// Restart interval in MCUs (0 if not set).
    pub restart_interval: u16,
    pub dc_tables: [Option<HuffmanTable>; 4],
    pub ac_tables: [Option<HuffmanTable>; 4],
    /// Entropy-coded data, byte stuffing and RST markers preserved.
    pub data: Vec<u8>,
}

/// Parsed JPEG structure.
#[derive(Debug, Clone, Default)]
pub struct JpegSegments {
    /// Quantization tables (indexed by ID).
    pub quant_tables: [Option<QuantizationTable>; 4],
    /// DC Huffman tables currently defined (indexed by ID).
    pub dc_huff_tables: [Option<HuffmanTable>; 4],
    /// AC Huffman tables currently defined (indexed by ID).
    pub ac_huff_tables: [Option<HuffmanTable>; 4],
    /// Frame info from SOF marker.
    pub frame: Option<FrameInfo>,
    /// Restart interval currently defined (0 if not set).
    pub restart_interval: u16,
    /// An APP0 JFIF marker was seen.
    pub jfif: bool,
    /// Transform flag of an APP14 Adobe marker, if one was seen.
    pub adobe_transform: Option<u8>,
    /// All scans in file order.
    pub scans: Vec<Scan>,
}

impl JpegSegments {
    /// Infer the colour space the way the IJG decoder does.
    pub fn color_space(&self) -> ColorSpace {
        let Some(frame) = &self.frame else {
            return ColorSpace::Unknown;
        };

        match frame.components.len() {
            1 => ColorSpace::Grayscale,
            3 => {
                if self.jfif {
                    ColorSpace::YCbCr
                } else if let Some(transform) = self.adobe_transform {
                    if transform == 0 {
                        ColorSpace::Rgb
                    } else {
                        ColorSpace::YCbCr
                    }
                } else {
                    let ids: Vec<u8> = frame.components.iter().map(|c| c.id).collect();
                    if ids == [b'R', b'G', b'B'] {
                        ColorSpace::Rgb
                    } else {
                        ColorSpace::YCbCr
                    }
                }
            }
            4 => match self.adobe_transform {
                Some(2) => ColorSpace::Ycck,
                _ => ColorSpace::Cmyk,
            },
            _ => ColorSpace::Unknown,
        }
    }
}

/// Parse a JPEG file into its constituent segments.
pub fn parse_jpeg(data: &[u8]) -> Result<JpegSegments> {
    let mut cursor = Cursor::new(data);
    parse_jpeg_reader(&mut cursor)
}

/// Parse a JPEG from a reader.
pub fn parse_jpeg_reader<R: Read + Seek>(reader: &mut R) -> Result<JpegSegments> {
    let mut segments = JpegSegments::default();

    let first = read_byte(reader)?.unwrap_or(0);
    let second = read_byte(reader)?.unwrap_or(0);
    if [first, second] != [0xFF, Marker::SOI.to_u8()] {
        return Err(JpegError::NotAJpeg(first, second));
    }

    loop {
        let Some(marker) = read_marker(reader)? else {
            log::warn!("Premature end of JPEG file");
            break;
        };

        match marker {
            Marker::EOI => break,

            Marker::SOI => return Err(JpegError::malformed("SOI marker inside the image")),

            Marker::SOS => {
                let header = read_segment(reader)?;
                let frame = segments
                    .frame
                    .as_ref()
                    .ok_or_else(|| JpegError::malformed("SOS before SOF"))?;
                let components = parse_sos_header(&header, frame)?;
                let data = read_scan_data(reader)?;
                log::trace!(
                    "scan {} with {} component(s), {} bytes of entropy-coded data",
                    segments.scans.len(),
                    components.len(),
                    data.len()
                );

                segments.scans.push(Scan {
                    components,
                    restart_interval: segments.restart_interval,
                    dc_tables: segments.dc_huff_tables.clone(),
                    ac_tables: segments.ac_huff_tables.clone(),
                    data,
                });
            }

            Marker::DQT => {
                let data = read_segment(reader)?;
                parse_dqt(&data, &mut segments)?;
            }

            Marker::DHT => {
                let data = read_segment(reader)?;
                parse_dht(&data, &mut segments)?;
            }

            Marker::SOF(n) => {
                let data = read_segment(reader)?;
                if segments.frame.is_some() {
                    return Err(JpegError::malformed("more than one SOF marker"));
                }
                check_sof_type(n)?;
                segments.frame = Some(parse_sof(n, &data)?);
            }

            Marker::DRI => {
                let data = read_segment(reader)?;
                if data.len() < 2 {
                    return Err(JpegError::malformed("DRI segment too short"));
                }
                segments.restart_interval = u16::from_be_bytes([data[0], data[1]]);
            }

            Marker::APP(0) => {
                let data = read_segment(reader)?;
                if data.starts_with(b"JFIF\0") {
                    segments.jfif = true;
                }
            }

            Marker::APP(14) => {
                let data = read_segment(reader)?;
                if data.len() >= 12 && data.starts_with(b"Adobe") {
                    segments.adobe_transform = Some(data[11]);
                }
            }

            Marker::RST(n) => {
                log::warn!("Stray RST{} marker outside of a scan", n);
            }

            _ if marker.has_length() => {
                let data = read_segment(reader)?;
                log::trace!("skipping {:?} segment of {} bytes", marker, data.len());
            }

            _ => {}
        }
    }

    Ok(segments)
}

/// Read a single byte, `None` at end of input.
fn read_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    match reader.read_u8() {
        Ok(byte) => Ok(Some(byte)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read the next marker, skipping fill bytes and extraneous data.
fn read_marker<R: Read>(reader: &mut R) -> Result<Option<Marker>> {
    let mut discarded = 0usize;

    loop {
        let Some(byte) = read_byte(reader)? else {
            return Ok(None);
        };
        if byte != 0xFF {
            discarded += 1;
            continue;
        }

        let mut next = read_byte(reader)?;
        while next == Some(0xFF) {
            next = read_byte(reader)?;
        }

        match next {
            None => return Ok(None),
            Some(code) => match Marker::from_u8(code) {
                Some(marker) => {
                    if discarded > 0 {
                        log::warn!(
                            "Corrupt JPEG data: {} extraneous bytes before marker 0x{:02X}",
                            discarded,
                            code
                        );
                    }
                    return Ok(Some(marker));
                }
                None => discarded += 2,
            },
        }
    }
}

/// Read a length-prefixed segment body (length field excluded).
fn read_segment<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let length = reader
        .read_u16::<BigEndian>()
        .map_err(|_| JpegError::malformed("segment length truncated"))? as usize;
    if length < 2 {
        return Err(JpegError::malformed("segment length too small"));
    }

    let mut data = vec![0u8; length - 2];
    reader
        .read_exact(&mut data)
        .map_err(|_| JpegError::malformed("segment truncated"))?;
    Ok(data)
}

/// Read entropy-coded scan data.
///
/// Keeps byte stuffing (0xFF 0x00) and RST markers; the bit reader handles
/// both. Fill bytes are dropped. Stops in front of any other marker so the
/// segment loop can pick it up.
fn read_scan_data<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>> {
    let mut data = Vec::new();

    loop {
        let Some(byte) = read_byte(reader)? else {
            log::warn!("Premature end of JPEG file inside entropy-coded data");
            break;
        };
        if byte != 0xFF {
            data.push(byte);
            continue;
        }

        let mut next = read_byte(reader)?;
        while next == Some(0xFF) {
            next = read_byte(reader)?;
        }

        match next {
            None => {
                log::warn!("Premature end of JPEG file inside entropy-coded data");
                break;
            }
            Some(0x00) => data.extend_from_slice(&[0xFF, 0x00]),
            Some(code @ 0xD0..=0xD7) => data.extend_from_slice(&[0xFF, code]),
            Some(_) => {
                reader.seek(SeekFrom::Current(-2))?;
                break;
            }
        }
    }

    Ok(data)
}

/// Parse DQT (Define Quantization Table) segment.
fn parse_dqt(data: &[u8], segments: &mut JpegSegments) -> Result<()> {
    let mut pos = 0;

    while pos < data.len() {
        let pq_tq = data[pos];
        let precision = pq_tq >> 4;
        let id = pq_tq & 0x0F;
        pos += 1;

        if id > 3 {
            return Err(JpegError::malformed(format!(
                "invalid quantization table ID: {}",
                id
            )));
        }

        let width = match precision {
            0 => 1,
            1 => 2,
            _ => {
                return Err(JpegError::malformed(format!(
                    "invalid quantization table precision: {}",
                    precision
                )))
            }
        };
        if pos + 64 * width > data.len() {
            return Err(JpegError::malformed("DQT segment too short"));
        }

        let mut values = [0u16; 64];
        for (zigzag, &natural) in ZIGZAG_TO_NATURAL.iter().enumerate() {
            let at = pos + zigzag * width;
            values[natural] = if width == 1 {
                data[at] as u16
            } else {
                u16::from_be_bytes([data[at], data[at + 1]])
            };
        }
        pos += 64 * width;

        segments.quant_tables[id as usize] = Some(QuantizationTable {
            id,
            precision,
            values,
        });
    }

    Ok(())
}

/// Parse DHT (Define Huffman Table) segment.
fn parse_dht(data: &[u8], segments: &mut JpegSegments) -> Result<()> {
    let mut pos = 0;

    while pos < data.len() {
        let tc_th = data[pos];
        let class = tc_th >> 4;
        let id = tc_th & 0x0F;
        pos += 1;

        if class > 1 || id > 3 {
            return Err(JpegError::malformed(format!(
                "invalid Huffman table: class={}, id={}",
                class, id
            )));
        }

        if pos + 16 > data.len() {
            return Err(JpegError::malformed("DHT segment too short for code lengths"));
        }
        let mut code_lengths = [0u8; 16];
        code_lengths.copy_from_slice(&data[pos..pos + 16]);
        pos += 16;

        let total_codes: usize = code_lengths.iter().map(|&n| n as usize).sum();
        if total_codes > 256 {
            return Err(JpegError::malformed("Huffman table has more than 256 symbols"));
        }
        if pos + total_codes > data.len() {
            return Err(JpegError::malformed("DHT segment too short for symbol values"));
        }
        let values = data[pos..pos + total_codes].to_vec();
        pos += total_codes;

        let table = HuffmanTable {
            class,
            id,
            code_lengths,
            values,
        };

        if class == 0 {
            segments.dc_huff_tables[id as usize] = Some(table);
        } else {
            segments.ac_huff_tables[id as usize] = Some(table);
        }
    }

    Ok(())
}

/// Reject every frame type that is not sequential Huffman DCT.
fn check_sof_type(sof_type: u8) -> Result<()> {
    match sof_type {
        0 | 1 => Ok(()),
        2 => Err(JpegError::Unsupported("progressive DCT (SOF2)".to_string())),
        3 => Err(JpegError::Unsupported("lossless (SOF3)".to_string())),
        5..=7 => Err(JpegError::Unsupported(format!(
            "hierarchical (SOF{})",
            sof_type
        ))),
        _ => Err(JpegError::Unsupported(format!(
            "arithmetic coding (SOF{})",
            sof_type
        ))),
    }
}

/// Parse SOF (Start of Frame) segment.
fn parse_sof(sof_type: u8, data: &[u8]) -> Result<FrameInfo> {
    if data.len() < 6 {
        return Err(JpegError::malformed("SOF segment too short"));
    }

    let precision = data[0];
    let height = u16::from_be_bytes([data[1], data[2]]);
    let width = u16::from_be_bytes([data[3], data[4]]);
    let num_components = data[5] as usize;

    if precision != 8 {
        return Err(JpegError::Unsupported(format!(
            "{}-bit sample precision",
            precision
        )));
    }
    if height == 0 {
        return Err(JpegError::Unsupported("height defined by DNL".to_string()));
    }
    if width == 0 {
        return Err(JpegError::malformed("image width is zero"));
    }
    if !(1..=4).contains(&num_components) {
        return Err(JpegError::Unsupported(format!(
            "{} components",
            num_components
        )));
    }
    if data.len() < 6 + num_components * 3 {
        return Err(JpegError::malformed("SOF segment too short for components"));
    }

    let mut components = Vec::with_capacity(num_components);
    for i in 0..num_components {
        let offset = 6 + i * 3;
        let id = data[offset];
        let sampling = data[offset + 1];
        let quant_table_id = data[offset + 2];

        let h_sampling = sampling >> 4;
        let v_sampling = sampling & 0x0F;
        if !(1..=4).contains(&h_sampling) || !(1..=4).contains(&v_sampling) {
            return Err(JpegError::malformed(format!(
                "invalid sampling factors {}x{} for component {}",
                h_sampling, v_sampling, id
            )));
        }
        if quant_table_id > 3 {
            return Err(JpegError::malformed(format!(
                "invalid quantization table ID {} for component {}",
                quant_table_id, id
            )));
        }

        components.push(ComponentInfo::new(id, h_sampling, v_sampling, quant_table_id));
    }
    layout_components(width, height, &mut components);

    Ok(FrameInfo {
        sof_type,
        precision,
        height,
        width,
        components,
    })
}

/// Parse SOS (Start of Scan) header into the scan's component list.
fn parse_sos_header(data: &[u8], frame: &FrameInfo) -> Result<Vec<ScanComponent>> {
    if data.is_empty() {
        return Err(JpegError::malformed("SOS header empty"));
    }

    let num_components = data[0] as usize;
    if num_components == 0 || num_components > 4 || num_components > frame.components.len() {
        return Err(JpegError::malformed(format!(
            "invalid number of components in scan: {}",
            num_components
        )));
    }
    if data.len() < 1 + num_components * 2 + 3 {
        return Err(JpegError::malformed("SOS header too short"));
    }

    let mut components: Vec<ScanComponent> = Vec::with_capacity(num_components);
    for i in 0..num_components {
        let offset = 1 + i * 2;
        let component_id = data[offset];
        let table_ids = data[offset + 1];

        let index = frame
            .components
            .iter()
            .position(|c| c.id == component_id)
            .ok_or_else(|| {
                JpegError::malformed(format!("unknown component ID in SOS: {}", component_id))
            })?;
        if components.iter().any(|c| c.index == index) {
            return Err(JpegError::malformed(format!(
                "component {} appears twice in a scan",
                component_id
            )));
        }

        let dc_table_id = table_ids >> 4;
        let ac_table_id = table_ids & 0x0F;
        if dc_table_id > 3 || ac_table_id > 3 {
            return Err(JpegError::malformed(format!(
                "invalid Huffman table selector 0x{:02X}",
                table_ids
            )));
        }

        components.push(ScanComponent {
            index,
            dc_table_id,
            ac_table_id,
        });
    }

    let params = &data[1 + num_components * 2..];
    let (ss, se, ah_al) = (params[0], params[1], params[2]);
    if ss != 0 || se != 63 || ah_al != 0 {
        return Err(JpegError::malformed(format!(
            "scan parameters Ss={} Se={} AhAl=0x{:02X} are not sequential",
            ss, se, ah_al
        )));
    }

    if num_components > 1 {
        let blocks_per_mcu: usize = components
            .iter()
            .map(|c| {
                let info = &frame.components[c.index];
                info.h_sampling as usize * info.v_sampling as usize
            })
            .sum();
        if blocks_per_mcu > 10 {
            return Err(JpegError::malformed(format!(
                "{} blocks per MCU exceeds the limit of 10",
                blocks_per_mcu
            )));
        }
    }

    Ok(components)
}
