use super::*;

#[test]
fn ubyte_blend_is_premultiplied_over() {
    let front = [100u8, 0, 0, 128];
    let back = [0u8, 200, 0, 255];
    let mut dest = [0u8; 4];
    blend(ColorFormat::RgbaUbyte, &front, &back, &mut dest);
    assert_eq!(dest, [100, 99, 0, 255]);
}

#[test]
fn opaque_front_hides_back() {
    let front: PixelBytes = encode_color(ColorFormat::RgbaFloat, [0.25, 0.5, 0.75, 1.0]);
    let mut back_dest: PixelBytes = encode_color(ColorFormat::RgbaFloat, [1.0, 1.0, 1.0, 1.0]);
    blend_over(ColorFormat::RgbaFloat, &front, &mut back_dest);
    assert_eq!(
        color_to_f32(ColorFormat::RgbaFloat, &back_dest),
        [0.25, 0.5, 0.75, 1.0]
    );
}

#[test]
fn under_keeps_front_when_transparent_back() {
    let mut front: PixelBytes = encode_color(ColorFormat::RgbaUbyte, [0.5, 0.0, 0.0, 0.5]);
    let before = front.clone();
    blend_under(ColorFormat::RgbaUbyte, &mut front, &[0, 0, 0, 0]);
    assert_eq!(front, before);
}

#[test]
fn background_encoding_carries_far_depth() {
    let fmt = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::Float);
    let px = encode_background(fmt, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(px.len(), 8);
    assert_eq!(&px[..4], &[255, 0, 0, 255]);
    assert_eq!(read_f32(&px[4..], 0), FAR_DEPTH);
    assert!(has_alpha(ColorFormat::RgbaUbyte, &px));
    assert_eq!(alpha(ColorFormat::RgbaUbyte, &px), 1.0);
}
