#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use stegano_outguess::jpeg::{Block, CoefficientStore, ColorSpace, CompressSettings, Encoder};
use tempfile::NamedTempFile;

/// Quantized coefficients of a cover image of `width`x`height` in the
/// standard 4:2:0 layout, drawn from a seeded generator.
pub fn cover_coefficients(width: u16, height: u16, seed: u64) -> CoefficientStore {
    let mut encoder = Encoder::new(Vec::new());
    encoder
        .configure(width, height, ColorSpace::Rgb, 75)
        .expect("configure");
    let mut store = CoefficientStore::zeroed(&encoder.components().expect("components"));

    let mut rng = fastrand::Rng::with_seed(seed);
    for component in store.components.iter_mut() {
        for block in component.blocks.iter_mut() {
            fill_block(&mut rng, block);
        }
    }
    store
}

fn fill_block(rng: &mut fastrand::Rng, block: &mut Block) {
    block[0] = rng.i16(-60..=60);
    for value in block.iter_mut().skip(1).take(24) {
        *value = match rng.u8(0..4) {
            0 => rng.i16(-12..=12),
            1 => rng.i16(-2..=2),
            _ => 0,
        };
    }
}

/// Flip the LSB of roughly one in `every` AC coefficients outside {0, 1},
/// the way Outguess embeds its payload.
pub fn embed_lsb_flips(store: &CoefficientStore, every: u32, seed: u64) -> CoefficientStore {
    let mut stego = store.clone();
    let mut rng = fastrand::Rng::with_seed(seed);
    for component in stego.components.iter_mut() {
        for block in component.blocks.iter_mut() {
            for value in block.iter_mut().skip(1) {
                if *value != 0 && *value != 1 && rng.u32(0..every) == 0 {
                    *value ^= 1;
                }
            }
        }
    }
    stego
}

/// Standard encoder output for `store` at `quality`.
pub fn encode(width: u16, height: u16, quality: u8, store: &CoefficientStore) -> Vec<u8> {
    encode_with(width, height, quality, store, |_| {})
}

/// Standard encoder output with the settings adjusted by `tweak`.
pub fn encode_with(
    width: u16,
    height: u16,
    quality: u8,
    store: &CoefficientStore,
    tweak: impl FnOnce(&mut CompressSettings),
) -> Vec<u8> {
    let mut encoder = Encoder::new(Vec::new());
    encoder
        .configure(width, height, ColorSpace::Rgb, quality)
        .expect("configure");
    tweak(encoder.settings_mut().expect("configured"));
    encoder.write_coefficients(store).expect("write coefficients");
    encoder.finish().expect("finish")
}

pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".jpg")
        .tempfile()
        .expect("temp file");
    file.write_all(data).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).expect("read file")
}

/// Path of a file under the workspace `resources/` directory.
pub fn resource(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../resources")
        .join(name)
}
