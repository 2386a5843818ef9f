//! Coefficient-level JPEG codec.
//!
//! Gives access to the quantized DCT coefficients of sequential JPEG files
//! without dequantization or IDCT, and writes coefficients back the way a
//! standard libjpeg-6b compressor lays out its output.
//!
//! # Architecture
//!
//! ```text
//! JPEG → parse → huffman decode → CoefficientStore → huffman encode → JPEG
//! ```
//!
//! Code is adapted from:
//! - [jpeg-decoder](https://github.com/image-rs/jpeg-decoder) - parsing, Huffman decode
//! - [jpeg-encoder](https://github.com/vstroebel/jpeg-encoder) - Huffman encode, writing

pub mod coefficients;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod huffman;
pub mod marker;
pub mod parser;
pub mod scan;
pub mod tables;
pub mod writer;

pub use coefficients::{Block, CoefficientStore, ComponentCoefficients};
pub use decoder::{DecodedJpeg, Decoder};
pub use encoder::{CompressSettings, ComponentSettings, Encoder, DEFAULT_QUALITY};
pub use error::{JpegError, Result};
pub use huffman::{encode_coefficient, BitReader, BitWriter, HuffmanEncoder, HuffmanLookup};
pub use marker::Marker;
pub use parser::{
    layout_components, parse_jpeg, parse_jpeg_reader, ColorSpace, ComponentInfo,
    FrameInfo, HuffmanTable, JpegSegments, QuantizationTable, Scan, ScanComponent,
};
pub use scan::decode_coefficients;
pub use tables::{
    quality_scaling, scale_quant_table, NATURAL_TO_ZIGZAG, STD_CHROMINANCE_QUANT_TABLE,
    STD_LUMINANCE_QUANT_TABLE, ZIGZAG_TO_NATURAL,
};
