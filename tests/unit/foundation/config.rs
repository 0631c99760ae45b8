use super::*;

#[test]
fn defaults_validate() {
    let cfg = CompositeConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.magic_k, 8);
    assert!(cfg.interlace_images);
    assert!(!cfg.telescope);
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let cfg = CompositeConfig::from_json_str(
        r#"{ "composite_mode": "blend", "depth_format": "none", "magic_k": 4 }"#,
    )
    .unwrap();
    assert_eq!(cfg.composite_mode, CompositeMode::Blend);
    assert_eq!(cfg.depth_format, DepthFormat::None);
    assert_eq!(cfg.magic_k, 4);
    assert_eq!(cfg.color_format, ColorFormat::RgbaUbyte);
}

#[test]
fn validation_rejects_bad_values() {
    let mut cfg = CompositeConfig {
        magic_k: 1,
        ..CompositeConfig::default()
    };
    assert!(cfg.validate().is_err());
    cfg.magic_k = 8;
    cfg.depth_format = DepthFormat::None;
    let err = cfg.validate().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidOperation);

    assert!(CompositeConfig::from_json_str(r#"{ "bogus": 1 }"#).is_err());
}

#[test]
fn bswap_forces_k_of_two() {
    let cfg = CompositeConfig {
        single_image_strategy: SingleImageStrategy::Bswap,
        ..CompositeConfig::default()
    };
    assert_eq!(cfg.effective_magic_k(), 2);
}

#[test]
fn blend_mode_composites_without_depth() {
    let cfg = CompositeConfig {
        composite_mode: CompositeMode::Blend,
        depth_format: DepthFormat::Float,
        ..CompositeConfig::default()
    };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.composited_depth(), DepthFormat::None);
    assert_eq!(cfg.pixel_format().depth_bytes(), 0);
    assert_eq!(CompositeConfig::default().pixel_format().depth, DepthFormat::Float);
}
