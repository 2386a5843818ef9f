//! A decoded JPEG as the checks see it.

use crate::error::{DetectError, Result};
use crate::jpeg::{
    self, Block, CoefficientStore, ColorSpace, ComponentInfo, Decoder, QuantizationTable,
};
use crate::quality::{detect_quality, QualityUndetermined};
use std::cell::OnceCell;
use std::path::Path;

/// Dimensions, tables, component layout and coefficients of one JPEG.
///
/// Everything is read once when the image is decoded and never changes;
/// the quality estimate is computed on first use.
#[derive(Debug)]
pub struct Image {
    width: u16,
    height: u16,
    color_space: ColorSpace,
    quant_tables: [Option<QuantizationTable>; 4],
    components: Vec<ComponentInfo>,
    store: CoefficientStore,
    quality: OnceCell<std::result::Result<u8, QualityUndetermined>>,
}

impl Image {
    /// Read and decode the JPEG at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoder = Decoder::open(path).map_err(|source| DetectError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let image = Self::decode(decoder).map_err(|e| DetectError::codec(path, e))?;
        log::debug!(
            "{}: {}x{} {:?}, {} component(s)",
            path.display(),
            image.width,
            image.height,
            image.color_space,
            image.components.len()
        );
        Ok(image)
    }

    /// Decode a JPEG held in memory.
    pub fn from_bytes(data: &[u8]) -> jpeg::Result<Self> {
        Self::decode(Decoder::new(data.to_vec()))
    }

    fn decode(mut decoder: Decoder) -> jpeg::Result<Self> {
        let (width, height) = decoder.read_header()?;
        let decoded = decoder.read_coefficients()?;

        Ok(Image {
            width,
            height,
            color_space: decoded.color_space,
            quant_tables: decoded.quant_tables,
            components: decoded.components,
            store: decoded.store,
            quality: OnceCell::new(),
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Quantization tables indexed by table ID.
    pub fn quant_tables(&self) -> &[Option<QuantizationTable>; 4] {
        &self.quant_tables
    }

    /// Components in frame order.
    pub fn components(&self) -> &[ComponentInfo] {
        &self.components
    }

    pub fn coefficients(&self) -> &CoefficientStore {
        &self.store
    }

    /// Coefficients of one block in natural order.
    pub fn block(&self, component: usize, row: usize, col: usize) -> Option<&Block> {
        self.store.block(component, row, col)
    }

    /// Encoder quality the tables were built with.
    pub fn quality(&self) -> std::result::Result<u8, QualityUndetermined> {
        *self
            .quality
            .get_or_init(|| detect_quality(&self.quant_tables))
    }

    /// Three YCbCr components with 2x2, 1x1, 1x1 sampling.
    pub fn is_ycbcr_420(&self) -> bool {
        self.color_space == ColorSpace::YCbCr
            && self
                .components
                .iter()
                .map(|c| (c.h_sampling, c.v_sampling))
                .eq([(2u8, 2u8), (1, 1), (1, 1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::Encoder;

    fn encode(width: u16, height: u16, color_space: ColorSpace, quality: u8) -> Vec<u8> {
        let mut encoder = Encoder::new(Vec::new());
        encoder
            .configure(width, height, color_space, quality)
            .expect("configure");
        let store = CoefficientStore::zeroed(&encoder.components().expect("components"));
        encoder.write_coefficients(&store).expect("write");
        encoder.finish().expect("finish")
    }

    #[test]
    fn test_image_from_encoder_output() {
        let image = Image::from_bytes(&encode(40, 30, ColorSpace::Rgb, 65)).unwrap();
        assert_eq!((image.width(), image.height()), (40, 30));
        assert_eq!(image.quality(), Ok(65));
        assert!(image.is_ycbcr_420());
        assert_eq!(image.components()[1].width_in_blocks, 3);
        assert!(image.block(0, 3, 4).is_some());
        assert!(image.block(0, 4, 0).is_none());
        assert_eq!(image.coefficients().components.len(), 3);
    }

    #[test]
    fn test_grayscale_is_not_420() {
        let image = Image::from_bytes(&encode(16, 16, ColorSpace::Grayscale, 75)).unwrap();
        assert_eq!(image.color_space(), ColorSpace::Grayscale);
        assert!(!image.is_ycbcr_420());
        // only the luminance table is written for a single component
        assert_eq!(image.quality(), Err(QualityUndetermined::ChrominanceMissing));
    }

    #[test]
    fn test_open_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.jpg");
        let err = Image::open(&path).unwrap_err();
        assert!(matches!(err, DetectError::FileOpen { .. }));
        assert!(err.to_string().starts_with("Cannot open "));
    }

    #[test]
    fn test_open_reports_codec_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not a jpeg at all").unwrap();
        let err = Image::open(file.path()).unwrap_err();
        assert!(matches!(err, DetectError::Codec { .. }));
    }
}
