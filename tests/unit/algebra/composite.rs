use super::*;
use crate::image::format::PixelFormat;
use crate::image::runs::RunWriter;

fn zfmt() -> PixelFormat {
    PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::Float)
}

/// 1-D depth image; `None` is inactive, `Some((id, depth))` is active.
fn zimage(pixels: &[Option<(u8, f32)>]) -> SparseImage {
    let mut w = RunWriter::new(Vec::new());
    for px in pixels {
        match px {
            Some((id, d)) => w.add_pixel(&[*id; 4], &d.to_le_bytes()),
            None => w.add_inactive(1),
        }
    }
    SparseImage::from_runs(zfmt(), pixels.len(), 1, w.finish())
}

#[test]
fn z_merge_keeps_nearest_and_inactive_gaps() {
    let front = zimage(&[Some((1, 0.5)), None, Some((2, 0.2)), None]);
    let back = zimage(&[None, Some((3, 0.3)), Some((4, 0.1)), None]);
    let mut dest = SparseImage::new(zfmt(), 4, 1);
    composite_sparse(&front, &back, CompositeMode::ZBuffer, &mut dest).unwrap();

    assert_eq!(dest.runs().collect::<Vec<_>>(), vec![(0, 3), (1, 0)]);
    dest.validate_runs().unwrap();
    let ids: Vec<u8> = dest.data()[8..8 + 3 * 8].chunks(8).map(|p| p[0]).collect();
    assert_eq!(ids, vec![1, 3, 4]);
}

#[test]
fn blend_puts_front_over_back() {
    let f = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None);
    let mut w = RunWriter::new(Vec::new());
    w.add_active(&[100, 0, 0, 128], 1);
    w.add_inactive(1);
    let front = SparseImage::from_runs(f, 2, 1, w.finish());
    let mut w = RunWriter::new(Vec::new());
    w.add_active(&[0, 200, 0, 255], 1);
    w.add_active(&[9, 9, 9, 255], 1);
    let back = SparseImage::from_runs(f, 2, 1, w.finish());

    let mut dest = SparseImage::new(f, 2, 1);
    composite_sparse(&front, &back, CompositeMode::Blend, &mut dest).unwrap();
    assert_eq!(dest.runs().collect::<Vec<_>>(), vec![(0, 2)]);
    assert_eq!(&dest.data()[8..], &[100, 99, 0, 255, 9, 9, 9, 255]);
}

#[test]
fn fully_inactive_inputs_stay_inactive() {
    let a = SparseImage::new(zfmt(), 3, 2);
    let b = SparseImage::new(zfmt(), 3, 2);
    let mut dest = SparseImage::new(zfmt(), 3, 2);
    composite_sparse(&a, &b, CompositeMode::ZBuffer, &mut dest).unwrap();
    assert_eq!(dest.runs().collect::<Vec<_>>(), vec![(6, 0)]);
    assert_eq!((dest.width(), dest.height()), (3, 2));
}

#[test]
fn same_image_on_both_sides_is_rejected() {
    let a = zimage(&[Some((1, 0.5))]);
    let mut dest = SparseImage::new(zfmt(), 1, 1);
    let err = composite_sparse(&a, &a, CompositeMode::ZBuffer, &mut dest).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::SanityCheck);
}

#[test]
fn mismatched_inputs_are_rejected() {
    let a = zimage(&[Some((1, 0.5)), None]);
    let b = zimage(&[None]);
    let mut dest = SparseImage::new(zfmt(), 2, 1);
    let err = composite_sparse(&a, &b, CompositeMode::ZBuffer, &mut dest).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::SanityCheck);

    let c = zimage(&[None, None]);
    let mut other = SparseImage::new(PixelFormat::new(ColorFormat::RgbaFloat, DepthFormat::Float), 2, 1);
    let err = composite_sparse(&a, &c, CompositeMode::ZBuffer, &mut other).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::SanityCheck);

    let err = composite_sparse(&a, &c, CompositeMode::Blend, &mut dest).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidValue);
}

#[test]
fn z_without_depth_is_invalid_operation() {
    let f = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None);
    let a = SparseImage::new(f, 2, 1);
    let b = SparseImage::new(f, 2, 1);
    let mut dest = SparseImage::new(f, 2, 1);
    let err = composite_sparse(&a, &b, CompositeMode::ZBuffer, &mut dest).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidOperation);
}
