use super::*;

#[test]
fn pixel_sizes() {
    let f = PixelFormat::new(ColorFormat::RgbaFloat, DepthFormat::Float);
    assert_eq!(f.pixel_bytes(), 20);
    let f = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::None);
    assert_eq!(f.pixel_bytes(), 4);
    assert_eq!(PixelFormat::default().pixel_bytes(), 8);
}

#[test]
fn codes_round_trip_and_reject_unknown() {
    for c in [ColorFormat::None, ColorFormat::RgbaUbyte, ColorFormat::RgbaFloat] {
        assert_eq!(ColorFormat::from_code(c.code()).unwrap(), c);
    }
    assert_eq!(DepthFormat::from_code(0xD001).unwrap(), DepthFormat::Float);
    let err = ColorFormat::from_code(0xC0FF).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidEnum);
}

#[test]
fn names_parse() {
    assert_eq!("rgba_float".parse::<ColorFormat>().unwrap(), ColorFormat::RgbaFloat);
    assert_eq!("none".parse::<DepthFormat>().unwrap(), DepthFormat::None);
    assert!("rgb".parse::<ColorFormat>().is_err());
}
