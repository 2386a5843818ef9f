mod common;

use common::{cover_coefficients, embed_lsb_flips, encode, encode_with, read, write_temp};
use itertools::Itertools;
use stegano_outguess::jpeg::{QuantizationTable, STD_CHROMINANCE_QUANT_TABLE};
use stegano_outguess::{
    check_image_metadata, check_invariant, compare_images, detect, DetectError, DetectOptions,
    Image, InvariantCheck, MetadataCheck, PreconditionFailure, QualityUndetermined, Verdict,
};

#[test]
fn standard_output_is_a_fixed_point() {
    let store = cover_coefficients(64, 48, 1);
    for quality in [1, 20, 50, 75, 95, 100] {
        let file = write_temp(&encode(64, 48, quality, &store));
        assert!(check_image_metadata(file.path()).unwrap(), "quality {}", quality);
        assert!(check_image_metadata(file.path()).unwrap(), "quality {}", quality);
    }
}

#[test]
fn metadata_check_leaves_the_input_untouched() {
    let file = write_temp(&encode(40, 40, 80, &cover_coefficients(40, 40, 2)));
    let before = read(file.path());
    check_image_metadata(file.path()).unwrap();
    assert_eq!(read(file.path()), before);
}

#[test]
fn lsb_embedding_is_likely_outguess() {
    let cover = cover_coefficients(96, 64, 3);
    let stego = embed_lsb_flips(&cover, 3, 4);
    assert_ne!(cover, stego);

    let first = write_temp(&encode(96, 64, 75, &cover));
    let second = write_temp(&encode(96, 64, 75, &stego));

    let verdict = detect(first.path(), second.path(), &DetectOptions::default()).unwrap();
    assert!(verdict.is_likely(), "{}", verdict);
    assert_eq!(verdict.exit_code(), 0);
    assert!(verdict.to_string().starts_with("It is likely that "));
    assert!(check_invariant(first.path(), second.path()).unwrap());
}

#[test]
fn odd_dimensions_keep_partial_mcus() {
    let cover = cover_coefficients(33, 17, 5);
    let stego = embed_lsb_flips(&cover, 2, 6);

    let first = write_temp(&encode(33, 17, 90, &cover));
    let second = write_temp(&encode(33, 17, 90, &stego));

    let image = Image::open(first.path()).unwrap();
    assert_eq!(image.components()[0].width_in_blocks, 5);
    assert_eq!(image.components()[0].height_in_blocks, 3);
    assert_eq!(image.components()[1].width_in_blocks, 3);
    assert_eq!(image.components()[1].height_in_blocks, 2);

    let verdict = detect(first.path(), second.path(), &DetectOptions::default()).unwrap();
    assert!(verdict.is_likely(), "{}", verdict);
}

#[test]
fn unrelated_images_violate_the_invariant() {
    let first = write_temp(&encode(64, 64, 70, &cover_coefficients(64, 64, 7)));
    let second = write_temp(&encode(64, 64, 85, &cover_coefficients(64, 64, 8)));

    let verdict = detect(first.path(), second.path(), &DetectOptions::default()).unwrap();
    match &verdict {
        Verdict::InvariantViolated { check, .. } => {
            assert!(matches!(check, InvariantCheck::Mismatch { .. }))
        }
        other => panic!("unexpected verdict {:?}", other),
    }
    assert_eq!(verdict.exit_code(), 1);
    assert!(verdict.to_string().ends_with("(invariant not respected)"));
}

#[test]
fn different_sizes_fail_the_precondition() {
    let first = write_temp(&encode(32, 32, 75, &cover_coefficients(32, 32, 9)));
    let second = write_temp(&encode(48, 32, 75, &cover_coefficients(48, 32, 9)));

    let verdict = detect(first.path(), second.path(), &DetectOptions::default()).unwrap();
    assert_eq!(
        verdict,
        Verdict::InvariantViolated {
            first: first.path().to_path_buf(),
            second: second.path().to_path_buf(),
            check: InvariantCheck::Precondition(PreconditionFailure::BlockGridsDiffer {
                component: 0
            }),
        }
    );
}

#[test]
fn comment_marker_is_a_metadata_mismatch() {
    let data = encode(32, 32, 75, &cover_coefficients(32, 32, 10));
    let mut tampered = data[..2].to_vec();
    tampered.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x07, b's', b'e', b'c', b'r', b't']);
    tampered.extend_from_slice(&data[2..]);

    let clean = write_temp(&data);
    let commented = write_temp(&tampered);

    let verdict = detect(clean.path(), commented.path(), &DetectOptions::default()).unwrap();
    match &verdict {
        Verdict::MetadataMismatch(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].path, commented.path());
            assert_eq!(
                failures[0].check,
                MetadataCheck::Differs {
                    quality: 75,
                    offset: 3
                }
            );
        }
        other => panic!("unexpected verdict {:?}", other),
    }
    assert_eq!(verdict.exit_code(), 1);
}

#[test]
fn every_failing_file_is_reported() {
    let mut data = encode(16, 16, 75, &cover_coefficients(16, 16, 11));
    data.extend_from_slice(b"trailer");
    let first = write_temp(&data);
    let second = write_temp(&data);

    match detect(first.path(), second.path(), &DetectOptions::default()).unwrap() {
        Verdict::MetadataMismatch(failures) => {
            let paths: Vec<_> = failures.iter().map(|f| f.path.clone()).collect();
            assert_eq!(paths, vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        }
        other => panic!("unexpected verdict {:?}", other),
    }
}

#[test]
fn extra_quantization_table_is_undetermined() {
    let store = cover_coefficients(32, 32, 12);
    let data = encode_with(32, 32, 75, &store, |settings| {
        let values = settings.quant_tables[1]
            .as_ref()
            .map(|t| t.values)
            .unwrap_or(STD_CHROMINANCE_QUANT_TABLE);
        settings.quant_tables[2] = Some(QuantizationTable {
            id: 2,
            precision: 0,
            values,
        });
        settings.components[2].quant_table_id = 2;
    });
    let extra = write_temp(&data);
    let clean = write_temp(&encode(32, 32, 75, &store));

    match detect(clean.path(), extra.path(), &DetectOptions::default()).unwrap() {
        Verdict::MetadataMismatch(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(
                failures[0].check,
                MetadataCheck::QualityUndetermined(QualityUndetermined::ExtraTable(2))
            );
        }
        other => panic!("unexpected verdict {:?}", other),
    }
}

#[test]
fn restart_markers_are_not_standard_output() {
    let store = cover_coefficients(48, 48, 13);
    let data = encode_with(48, 48, 75, &store, |settings| settings.restart_interval = 2);
    let file = write_temp(&data);

    assert!(!check_image_metadata(file.path()).unwrap());
    // the coefficients themselves are untouched
    let plain = write_temp(&encode(48, 48, 75, &store));
    assert!(check_invariant(file.path(), plain.path()).unwrap());
}

#[test]
fn low_qualities_collide_in_the_chrominance_table() {
    let store = cover_coefficients(16, 16, 14);
    let file = write_temp(&encode(16, 16, 2, &store));
    let image = Image::open(file.path()).unwrap();
    assert_eq!(
        image.quality(),
        Err(QualityUndetermined::ChrominanceMismatch {
            luminance: 2,
            chrominance: Some(1)
        })
    );
    assert!(!check_image_metadata(file.path()).unwrap());
}

#[test]
fn comparison_is_symmetric() {
    let cover = cover_coefficients(40, 32, 15);
    let files = [
        encode(40, 32, 75, &cover),
        encode(40, 32, 75, &embed_lsb_flips(&cover, 2, 16)),
        encode(40, 32, 60, &embed_lsb_flips(&cover, 5, 17)),
        encode(40, 32, 75, &cover_coefficients(40, 32, 18)),
        encode(56, 32, 75, &cover_coefficients(56, 32, 19)),
    ];
    let images: Vec<Image> = files
        .iter()
        .map(|data| Image::from_bytes(data).unwrap())
        .collect();

    for image in &images {
        assert!(compare_images(image, image).is_respected());
    }
    for (a, b) in images.iter().tuple_combinations() {
        assert_eq!(
            compare_images(a, b).is_respected(),
            compare_images(b, a).is_respected()
        );
    }
}

#[test]
fn non_jpeg_input_is_fatal() {
    let text = write_temp(b"this is not an image");
    let good = write_temp(&encode(16, 16, 75, &cover_coefficients(16, 16, 20)));

    let err = detect(good.path(), text.path(), &DetectOptions::default()).unwrap_err();
    assert!(matches!(err, DetectError::Codec { .. }), "{}", err);
}

#[test]
fn truncated_header_is_fatal() {
    let data = encode(16, 16, 75, &cover_coefficients(16, 16, 21));
    let truncated = write_temp(&data[..40]);

    assert!(matches!(
        check_image_metadata(truncated.path()),
        Err(DetectError::Codec { .. })
    ));
}

#[test]
fn missing_file_cannot_be_opened() {
    let dir = tempfile::TempDir::new().unwrap();
    let absent = dir.path().join("absent.jpg");
    let good = write_temp(&encode(16, 16, 75, &cover_coefficients(16, 16, 22)));

    let err = detect(&absent, good.path(), &DetectOptions::default()).unwrap_err();
    assert!(matches!(err, DetectError::FileOpen { .. }));
    assert_eq!(err.to_string(), format!("Cannot open {}", absent.display()));
}

#[test]
fn scratch_directory_is_honoured_and_cleaned() {
    let scratch = tempfile::TempDir::new().unwrap();
    let options = DetectOptions {
        temp_dir: Some(scratch.path().to_path_buf()),
    };
    let cover = cover_coefficients(24, 24, 23);
    let first = write_temp(&encode(24, 24, 75, &cover));
    let second = write_temp(&encode(24, 24, 75, &embed_lsb_flips(&cover, 2, 24)));

    assert!(detect(first.path(), second.path(), &options).unwrap().is_likely());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}
