//! Coefficient-level JPEG decoder.

use super::coefficients::CoefficientStore;
use super::error::{JpegError, Result};
use super::parser::{
    parse_jpeg, ColorSpace, ComponentInfo, FrameInfo, JpegSegments, QuantizationTable,
};
use super::scan::decode_coefficients;
use std::path::Path;

/// Everything a coefficient read yields.
#[derive(Debug, Clone)]
pub struct DecodedJpeg {
    pub width: u16,
    pub height: u16,
    pub color_space: ColorSpace,
    /// Quantization tables indexed by table ID.
    pub quant_tables: [Option<QuantizationTable>; 4],
    /// Components in frame order.
    pub components: Vec<ComponentInfo>,
    pub store: CoefficientStore,
}

/// Decode handle over the bytes of one JPEG file.
///
/// ```ignore
/// let mut decoder = Decoder::open("image.jpg")?;
/// let (width, height) = decoder.read_header()?;
/// let decoded = decoder.read_coefficients()?;
/// ```
pub struct Decoder {
    data: Vec<u8>,
    segments: Option<JpegSegments>,
}

impl Decoder {
    /// Read a whole file into a new decoder.
    ///
    /// Only fails if the file cannot be read; nothing is parsed yet.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    pub fn new(data: Vec<u8>) -> Self {
        Decoder {
            data,
            segments: None,
        }
    }

    fn segments(&mut self) -> Result<&JpegSegments> {
        if self.segments.is_none() {
            let segments = parse_jpeg(&self.data)?;
            log::debug!(
                "parsed {} bytes: {} scan(s), {} quantization table(s)",
                self.data.len(),
                segments.scans.len(),
                segments.quant_tables.iter().flatten().count()
            );
            self.segments = Some(segments);
        }
        self.segments
            .as_ref()
            .ok_or_else(|| JpegError::malformed("segments unavailable"))
    }

    fn frame(segments: &JpegSegments) -> Result<&FrameInfo> {
        segments
            .frame
            .as_ref()
            .ok_or_else(|| JpegError::malformed("no image: SOF marker missing"))
    }

    /// Parse the container and return `(width, height)`.
    pub fn read_header(&mut self) -> Result<(u16, u16)> {
        let frame = Self::frame(self.segments()?)?;
        Ok((frame.width, frame.height))
    }

    /// Decode all quantized coefficients.
    pub fn read_coefficients(mut self) -> Result<DecodedJpeg> {
        self.segments()?;
        let segments = self
            .segments
            .take()
            .ok_or_else(|| JpegError::malformed("segments unavailable"))?;
        let frame = Self::frame(&segments)?;

        let store = decode_coefficients(&segments)?;

        Ok(DecodedJpeg {
            width: frame.width,
            height: frame.height,
            color_space: segments.color_space(),
            quant_tables: segments.quant_tables.clone(),
            components: frame.components.clone(),
            store,
        })
    }
}
