use criterion::{criterion_group, criterion_main, Criterion};
use stegano_outguess::jpeg::{CoefficientStore, ColorSpace, Encoder};
use stegano_outguess::{compare_images, Image};

fn synthetic_image(width: u16, height: u16, flip: bool) -> Image {
    let mut encoder = Encoder::new(Vec::new());
    encoder
        .configure(width, height, ColorSpace::Rgb, 75)
        .expect("configure");
    let mut store = CoefficientStore::zeroed(&encoder.components().expect("components"));

    let mut rng = fastrand::Rng::with_seed(42);
    for component in store.components.iter_mut() {
        for block in component.blocks.iter_mut() {
            for value in block.iter_mut().take(16) {
                *value = rng.i16(-20..=20);
                if flip && *value > 1 {
                    *value ^= 1;
                }
            }
        }
    }

    encoder.write_coefficients(&store).expect("write coefficients");
    Image::from_bytes(&encoder.finish().expect("finish")).expect("decode")
}

pub fn invariant_comparison(c: &mut Criterion) {
    c.bench_function("Invariant 512x512", |b| {
        let cover = synthetic_image(512, 512, false);
        let stego = synthetic_image(512, 512, true);

        b.iter(|| {
            assert!(compare_images(&cover, &stego).is_respected());
        })
    });
}

pub fn coefficient_decoding(c: &mut Criterion) {
    c.bench_function("Coefficient decoding 512x512", |b| {
        let mut encoder = Encoder::new(Vec::new());
        encoder
            .configure(512, 512, ColorSpace::Rgb, 90)
            .expect("configure");
        let store = CoefficientStore::zeroed(&encoder.components().expect("components"));
        encoder.write_coefficients(&store).expect("write coefficients");
        let data = encoder.finish().expect("finish");

        b.iter(|| Image::from_bytes(&data).expect("decode"))
    });
}

criterion_group!(benches, invariant_comparison, coefficient_decoding);
criterion_main!(benches);
