use super::*;
use crate::image::format::{ColorFormat, DepthFormat};

fn fmt() -> PixelFormat {
    PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None)
}

/// 1-D image with the given active mask; active pixel i has color [i; 4].
fn masked(mask: &[bool]) -> SparseImage {
    let mut w = RunWriter::new(Vec::new());
    for (i, &on) in mask.iter().enumerate() {
        if on {
            w.add_active(&[i as u8; 4], 1);
        } else {
            w.add_inactive(1);
        }
    }
    SparseImage::from_runs(fmt(), mask.len(), 1, w.finish())
}

#[test]
fn buffer_size_accounts_for_worst_case_runs() {
    let f = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None);
    assert_eq!(sparse_buffer_size(f, 3, 1), 28 + 8 + 12 + 4 * 2);
    let f = PixelFormat::new(ColorFormat::RgbaFloat, DepthFormat::Float);
    assert_eq!(sparse_buffer_size(f, 3, 1), 28 + 8 + 60);
}

#[test]
fn new_image_is_one_inactive_run() {
    let img = SparseImage::new(fmt(), 4, 3);
    assert_eq!(img.runs().collect::<Vec<_>>(), vec![(12, 0)]);
    assert_eq!(img.compressed_buffer_size(), 28 + 8);
    img.validate_runs().unwrap();
}

#[test]
fn set_dimensions_clears_and_checks_capacity() {
    let mut img = masked(&[true, false, true, true]);
    img.set_dimensions(2, 2).unwrap();
    assert_eq!(img.runs().collect::<Vec<_>>(), vec![(4, 0)]);
    assert!(img.set_dimensions(5, 1).is_err());
}

#[test]
fn copy_sub_range_keeps_pixels() {
    let img = masked(&[false, true, true, false, false, true]);
    assert_eq!(img.num_active_pixels(), 3);
    let mut out = SparseImage::new(fmt(), 6, 1);
    copy_sparse_pixels(&img, 2, 3, &mut out).unwrap();
    assert_eq!((out.width(), out.height()), (3, 1));
    assert_eq!(out.runs().collect::<Vec<_>>(), vec![(0, 1), (2, 0)]);
    out.validate_runs().unwrap();

    assert!(copy_sparse_pixels(&img, 4, 3, &mut out).is_err());
}

#[test]
fn whole_copy_keeps_output_capacity() {
    let img = masked(&[true, false]);
    let mut out = SparseImage::with_capacity(fmt(), 1, 1, 16);
    copy_sparse_pixels(&img, 0, 2, &mut out).unwrap();
    assert_eq!(out.max_num_pixels(), 16);
    assert_eq!(out.data(), img.data());

    let mut small = SparseImage::new(fmt(), 1, 1);
    let err = copy_sparse_pixels(&img, 0, 2, &mut small).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidValue);
}

#[test]
fn package_round_trip_validates_runs() {
    let img = masked(&[true, true, false, true]);
    let bytes = img.package_for_send().unwrap();
    assert_eq!(bytes.len(), img.compressed_buffer_size());
    let back = SparseImage::unpackage_from_receive(&bytes).unwrap();
    assert_eq!(back.data(), img.data());

    let mut bad = bytes.clone();
    // Claim one more inactive pixel in the first run.
    bad[28] += 1;
    assert!(SparseImage::unpackage_from_receive(&bad).is_err());
    assert!(SparseImage::unpackage_from_receive(&bytes[..20]).is_err());
}

#[test]
fn format_mismatch_is_invalid_value() {
    let img = masked(&[true]);
    let mut out = SparseImage::new(PixelFormat::default(), 1, 1);
    let err = copy_sparse_pixels(&img, 0, 1, &mut out).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidValue);
}

#[test]
fn clear_drops_active_pixels_and_keeps_dimensions() {
    let mut img = masked(&[true, false, true, true, false]);
    assert_eq!(img.num_active_pixels(), 3);
    img.clear();
    assert_eq!(img.num_pixels(), 5);
    assert_eq!(img.runs().collect::<Vec<_>>(), vec![(5, 0)]);
    img.validate_runs().unwrap();
}
