//! Coefficient-level JPEG encoder.
//!
//! Writes already quantized coefficients with the defaults of a standard
//! libjpeg-6b compressor, so a file produced by such a compressor at a given
//! quality is reproduced byte for byte.

use super::coefficients::CoefficientStore;
use super::error::{JpegError, Result};
use super::marker::Marker;
use super::parser::{
    layout_components, ColorSpace, ComponentInfo, FrameInfo, HuffmanTable, QuantizationTable,
    ScanComponent,
};
use super::scan::encode_scan_baseline;
use super::tables::{
    quality_scaling, scale_quant_table, std_huffman_tables, STD_CHROMINANCE_QUANT_TABLE,
    STD_LUMINANCE_QUANT_TABLE,
};
use super::writer::{
    write_adobe, write_dht, write_dqt, write_dri, write_jfif, write_marker, write_sof, write_sos,
    JfifHeader,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Quality used before [`CompressSettings::set_quality`] is called.
pub const DEFAULT_QUALITY: u8 = 75;

/// Per-component compression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSettings {
    pub id: u8,
    pub h_sampling: u8,
    pub v_sampling: u8,
    pub quant_table_id: u8,
    pub dc_table_id: u8,
    pub ac_table_id: u8,
}

impl ComponentSettings {
    const fn new(id: u8, sampling: (u8, u8), quant_table_id: u8, table_id: u8) -> Self {
        ComponentSettings {
            id,
            h_sampling: sampling.0,
            v_sampling: sampling.1,
            quant_table_id,
            dc_table_id: table_id,
            ac_table_id: table_id,
        }
    }
}

/// Compression parameters.
#[derive(Debug, Clone)]
pub struct CompressSettings {
    pub width: u16,
    pub height: u16,
    /// Colour space of the nominal input samples.
    pub in_color_space: ColorSpace,
    /// Colour space written to the file.
    pub jpeg_color_space: ColorSpace,
    pub components: Vec<ComponentSettings>,
    pub quant_tables: [Option<QuantizationTable>; 4],
    pub dc_huff_tables: [Option<HuffmanTable>; 4],
    pub ac_huff_tables: [Option<HuffmanTable>; 4],
    /// Restart interval in MCUs, 0 for none.
    pub restart_interval: u16,
    /// JFIF APP0 marker to write, if any.
    pub jfif: Option<JfifHeader>,
    /// Write an Adobe APP14 marker.
    pub adobe_marker: bool,
}

impl CompressSettings {
    /// Standard defaults for an input in `in_color_space`.
    ///
    /// Picks the default output colour space (RGB input is stored as YCbCr),
    /// the Annex K Huffman tables and quality 75 quantization tables.
    pub fn defaults(width: u16, height: u16, in_color_space: ColorSpace) -> Result<Self> {
        let (dc_huff_tables, ac_huff_tables) = std_huffman_tables();
        let mut settings = CompressSettings {
            width,
            height,
            in_color_space,
            jpeg_color_space: ColorSpace::Unknown,
            components: Vec::new(),
            quant_tables: Default::default(),
            dc_huff_tables,
            ac_huff_tables,
            restart_interval: 0,
            jfif: None,
            adobe_marker: false,
        };

        settings.set_quality(DEFAULT_QUALITY, true);

        let jpeg_color_space = match in_color_space {
            ColorSpace::Grayscale => ColorSpace::Grayscale,
            ColorSpace::Rgb | ColorSpace::YCbCr => ColorSpace::YCbCr,
            ColorSpace::Cmyk => ColorSpace::Cmyk,
            ColorSpace::Ycck => ColorSpace::Ycck,
            ColorSpace::Unknown => {
                return Err(JpegError::Encoder(
                    "no default components for an unknown colour space".to_string(),
                ))
            }
        };
        settings.set_colorspace(jpeg_color_space);

        Ok(settings)
    }

    /// Select the output colour space and its standard component layout.
    pub fn set_colorspace(&mut self, color_space: ColorSpace) {
        self.jpeg_color_space = color_space;
        self.jfif = None;
        self.adobe_marker = false;

        self.components = match color_space {
            ColorSpace::Grayscale => {
                self.jfif = Some(JfifHeader::default());
                vec![ComponentSettings::new(1, (1, 1), 0, 0)]
            }
            ColorSpace::YCbCr => {
                self.jfif = Some(JfifHeader::default());
                vec![
                    ComponentSettings::new(1, (2, 2), 0, 0),
                    ComponentSettings::new(2, (1, 1), 1, 1),
                    ComponentSettings::new(3, (1, 1), 1, 1),
                ]
            }
            ColorSpace::Rgb => {
                self.adobe_marker = true;
                vec![
                    ComponentSettings::new(b'R', (1, 1), 0, 0),
                    ComponentSettings::new(b'G', (1, 1), 0, 0),
                    ComponentSettings::new(b'B', (1, 1), 0, 0),
                ]
            }
            ColorSpace::Cmyk => {
                self.adobe_marker = true;
                vec![
                    ComponentSettings::new(b'C', (1, 1), 0, 0),
                    ComponentSettings::new(b'M', (1, 1), 0, 0),
                    ComponentSettings::new(b'Y', (1, 1), 0, 0),
                    ComponentSettings::new(b'K', (1, 1), 0, 0),
                ]
            }
            ColorSpace::Ycck => {
                self.adobe_marker = true;
                vec![
                    ComponentSettings::new(1, (2, 2), 0, 0),
                    ComponentSettings::new(2, (1, 1), 1, 1),
                    ComponentSettings::new(3, (1, 1), 1, 1),
                    ComponentSettings::new(4, (2, 2), 0, 0),
                ]
            }
            ColorSpace::Unknown => Vec::new(),
        };
    }

    /// Install the standard luminance and chrominance tables scaled to `quality`.
    pub fn set_quality(&mut self, quality: u8, force_baseline: bool) {
        let scale = quality_scaling(quality);
        log::debug!("quality {} scales the standard tables by {}%", quality, scale);

        for (id, base) in [STD_LUMINANCE_QUANT_TABLE, STD_CHROMINANCE_QUANT_TABLE]
            .iter()
            .enumerate()
        {
            let values = scale_quant_table(base, scale, force_baseline);
            self.quant_tables[id] = Some(QuantizationTable {
                id: id as u8,
                precision: values.iter().any(|&v| v > 255) as u8,
                values,
            });
        }
    }

    /// Adobe transform flag matching the output colour space.
    fn adobe_transform(&self) -> u8 {
        match self.jpeg_color_space {
            ColorSpace::YCbCr => 1,
            ColorSpace::Ycck => 2,
            _ => 0,
        }
    }

    /// Components with the block grids derived from the image size.
    pub fn component_infos(&self) -> Vec<ComponentInfo> {
        let mut components: Vec<ComponentInfo> = self
            .components
            .iter()
            .map(|c| ComponentInfo::new(c.id, c.h_sampling, c.v_sampling, c.quant_table_id))
            .collect();
        layout_components(self.width, self.height, &mut components);
        components
    }

    fn scan_components(&self) -> Vec<ScanComponent> {
        self.components
            .iter()
            .enumerate()
            .map(|(index, c)| ScanComponent {
                index,
                dc_table_id: c.dc_table_id,
                ac_table_id: c.ac_table_id,
            })
            .collect()
    }
}

/// Encode handle writing one JPEG to `W`.
pub struct Encoder<W: Write> {
    writer: W,
    settings: Option<CompressSettings>,
    written: bool,
}

impl Encoder<BufWriter<File>> {
    /// Create (or truncate) the file at `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Encoder::new(BufWriter::new(file)))
    }
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Encoder {
            writer,
            settings: None,
            written: false,
        }
    }

    /// Apply the defaults for `in_color_space`, then the tables for `quality`.
    pub fn configure(
        &mut self,
        width: u16,
        height: u16,
        in_color_space: ColorSpace,
        quality: u8,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(JpegError::Encoder(format!(
                "empty image dimensions {}x{}",
                width, height
            )));
        }

        let mut settings = CompressSettings::defaults(width, height, in_color_space)?;
        settings.set_quality(quality, true);
        self.settings = Some(settings);
        Ok(())
    }

    pub fn settings(&self) -> Option<&CompressSettings> {
        self.settings.as_ref()
    }

    pub fn settings_mut(&mut self) -> Option<&mut CompressSettings> {
        self.settings.as_mut()
    }

    /// The component layout coefficient stores must follow.
    pub fn components(&self) -> Result<Vec<ComponentInfo>> {
        Ok(self.configured()?.component_infos())
    }

    fn configured(&self) -> Result<&CompressSettings> {
        self.settings
            .as_ref()
            .ok_or_else(|| JpegError::Encoder("encoder used before configure".to_string()))
    }

    /// Write headers and entropy-coded data for `store`.
    ///
    /// The store must have exactly the block grids of [`Encoder::components`].
    pub fn write_coefficients(&mut self, store: &CoefficientStore) -> Result<()> {
        if self.written {
            return Err(JpegError::Encoder(
                "coefficients were already written".to_string(),
            ));
        }
        let settings = self.configured()?;

        let components = settings.component_infos();
        if !store.matches_layout(&components) {
            return Err(JpegError::Encoder(format!(
                "coefficient layout {:?} does not match the configured components {:?}",
                store
                    .components
                    .iter()
                    .map(|c| (c.width_in_blocks, c.height_in_blocks))
                    .collect::<Vec<_>>(),
                components
                    .iter()
                    .map(|c| (c.width_in_blocks, c.height_in_blocks))
                    .collect::<Vec<_>>()
            )));
        }

        let mut out = Vec::new();
        write_marker(&mut out, Marker::SOI)?;
        if let Some(jfif) = &settings.jfif {
            write_jfif(&mut out, jfif)?;
        }
        if settings.adobe_marker {
            write_adobe(&mut out, settings.adobe_transform())?;
        }

        // one DQT per table in component order
        let mut sent_quant = [false; 4];
        let mut wide_tables = false;
        for component in &settings.components {
            let id = component.quant_table_id as usize;
            if sent_quant[id] {
                continue;
            }
            let table = settings.quant_tables[id].as_ref().ok_or_else(|| {
                JpegError::Encoder(format!("quantization table {} is not defined", id))
            })?;
            wide_tables |= write_dqt(&mut out, table)?;
            sent_quant[id] = true;
        }

        let baseline = !wide_tables
            && settings
                .components
                .iter()
                .all(|c| c.dc_table_id <= 1 && c.ac_table_id <= 1);
        let frame = FrameInfo {
            sof_type: if baseline { 0 } else { 1 },
            precision: 8,
            height: settings.height,
            width: settings.width,
            components,
        };
        write_sof(&mut out, &frame)?;

        // DC then AC table per component, each table once
        let scan = settings.scan_components();
        let mut sent_dc = [false; 4];
        let mut sent_ac = [false; 4];
        for component in &scan {
            for (sent, tables, id, kind) in [
                (&mut sent_dc, &settings.dc_huff_tables, component.dc_table_id, "DC"),
                (&mut sent_ac, &settings.ac_huff_tables, component.ac_table_id, "AC"),
            ] {
                let id = id as usize;
                if sent[id] {
                    continue;
                }
                let table = tables[id].as_ref().ok_or_else(|| {
                    JpegError::Encoder(format!("{} Huffman table {} is not defined", kind, id))
                })?;
                write_dht(&mut out, table)?;
                sent[id] = true;
            }
        }

        if settings.restart_interval > 0 {
            write_dri(&mut out, settings.restart_interval)?;
        }
        write_sos(&mut out, &frame, &scan)?;

        let data = encode_scan_baseline(
            store,
            &frame,
            &scan,
            &settings.dc_huff_tables,
            &settings.ac_huff_tables,
            settings.restart_interval,
        )?;
        out.extend_from_slice(&data);

        self.writer.write_all(&out)?;
        self.written = true;

        log::debug!(
            "wrote {}x{} SOF{} with {} bytes of entropy-coded data",
            frame.width,
            frame.height,
            frame.sof_type,
            data.len()
        );
        Ok(())
    }

    /// Write EOI, flush, and hand back the writer.
    pub fn finish(mut self) -> Result<W> {
        if !self.written {
            return Err(JpegError::Encoder(
                "finish called before write_coefficients".to_string(),
            ));
        }
        write_marker(&mut self.writer, Marker::EOI)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
