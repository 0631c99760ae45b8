use super::*;
use crate::image::format::{ColorFormat, DepthFormat, PixelFormat};
use crate::image::runs::{RunWriter, read_run};

fn fmt() -> PixelFormat {
    PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None)
}

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

fn active_ids(img: &SparseImage) -> Vec<u8> {
    let data = img.data();
    let mut ids = Vec::new();
    let mut pos = 0;
    while let Some((_, active)) = read_run(data, pos) {
        pos += 8;
        for _ in 0..active {
            ids.push(data[pos]);
            pos += 4;
        }
    }
    ids
}

#[test]
fn pieces_are_reordered_by_bit_reversal() {
    let img = masked(&[true; 8]);
    let mut out = SparseImage::new(fmt(), 8, 1);
    interlace(&img, 4, &mut out).unwrap();
    assert_eq!(active_ids(&out), vec![0, 1, 4, 5, 2, 3, 6, 7]);
    assert_eq!(interlace_offset(1, 4, 8).unwrap(), 4);
    assert_eq!(interlace_offset(2, 4, 8).unwrap(), 2);
}

#[test]
fn remainder_pixels_follow_the_interlaced_index() {
    let img = masked(&[true; 10]);
    let mut out = SparseImage::new(fmt(), 10, 1);
    interlace(&img, 4, &mut out).unwrap();
    assert_eq!(active_ids(&out), vec![0, 1, 2, 5, 6, 7, 3, 4, 8, 9]);
    assert_eq!(interlace_offset(0, 4, 10).unwrap(), 0);
    assert_eq!(interlace_offset(1, 4, 10).unwrap(), 5);
    assert_eq!(interlace_offset(2, 4, 10).unwrap(), 3);
    assert_eq!(interlace_offset(3, 4, 10).unwrap(), 8);
}

#[test]
fn dimensions_and_activity_are_preserved() {
    let mask = [true, false, false, true, true, false, true, false, false, false, true, true];
    let img = SparseImage::from_runs(fmt(), 4, 3, masked(&mask).into_data());
    let mut out = SparseImage::new(fmt(), 4, 3);
    interlace(&img, 3, &mut out).unwrap();
    assert_eq!((out.width(), out.height()), (4, 3));
    assert_eq!(out.num_active_pixels(), 6);
    out.validate_runs().unwrap();
}

#[test]
fn fewer_than_two_partitions_copies() {
    let img = masked(&[true, false, true]);
    let mut out = SparseImage::new(fmt(), 3, 1);
    interlace(&img, 1, &mut out).unwrap();
    assert_eq!(out.data(), img.data());
}

#[test]
fn out_of_range_partition_is_invalid() {
    let err = interlace_offset(4, 4, 100).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidValue);
}
