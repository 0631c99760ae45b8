use super::*;
use crate::image::dense::OwnedImage;
use crate::image::format::PixelFormat;

#[test]
fn dense_z_composite() {
    let f = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::Float);
    let mut a = OwnedImage::new(f, 2, 1);
    let mut b = OwnedImage::new(f, 2, 1);
    {
        let (c, d) = a.planes_mut().unwrap();
        c.copy_from_slice(&[1, 1, 1, 1, 2, 2, 2, 2]);
        pixel::write_f32(d, 0, 0.2);
        pixel::write_f32(d, 1, 0.8);
    }
    {
        let (c, d) = b.planes_mut().unwrap();
        c.copy_from_slice(&[3, 3, 3, 3, 4, 4, 4, 4]);
        pixel::write_f32(d, 0, 0.5);
        pixel::write_f32(d, 1, 0.1);
    }
    composite_dense(&mut a, &b, CompositeMode::ZBuffer, true).unwrap();
    assert_eq!(a.color_bytes(), &[1, 1, 1, 1, 4, 4, 4, 4]);
    assert_eq!(a.depth_f32().unwrap(), vec![0.2, 0.1]);
}

#[test]
fn dense_blend_composite_and_size_check() {
    let f = PixelFormat::new(ColorFormat::RgbaFloat, DepthFormat::None);
    let mut dest = OwnedImage::new(f, 1, 1);
    dest.clear([0.0, 0.0, 0.5, 0.5]).unwrap();
    let mut src = OwnedImage::new(f, 1, 1);
    src.clear([0.5, 0.0, 0.0, 0.5]).unwrap();
    composite_dense(&mut dest, &src, CompositeMode::Blend, true).unwrap();
    assert_eq!(dest.color_rgba_f32().unwrap(), vec![[0.5, 0.0, 0.25, 0.75]]);

    let small = OwnedImage::new(f, 2, 1);
    assert!(composite_dense(&mut dest, &small, CompositeMode::Blend, true).is_err());
    assert!(composite_dense(&mut dest, &src, CompositeMode::ZBuffer, true).is_err());
}

#[test]
fn correction_only_when_needed() {
    let f = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None);
    let mut img = OwnedImage::new(f, 1, 1);
    img.clear([0.0, 0.0, 0.0, 0.0]).unwrap();
    let plain = Background::plain([1.0, 1.0, 1.0, 1.0]);
    assert!(!correct_background(&mut img, &plain).unwrap());
    assert_eq!(img.color_bytes(), &[0, 0, 0, 0]);

    let bg = Background::for_mode(CompositeMode::Blend, [1.0, 1.0, 1.0, 1.0], true);
    assert!(correct_background(&mut img, &bg).unwrap());
    assert_eq!(img.color_bytes(), &[255, 255, 255, 255]);
}
