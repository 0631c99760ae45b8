use super::*;
use crate::comm::local::LocalCluster;
use crate::frame::draw::DrawRequest;
use crate::image::pixel;

const RED: [u8; 4] = [255, 0, 0, 255];

fn paint_red(request: &DrawRequest, image: &mut OwnedImage) -> CompositeResult<()> {
    let width = image.width();
    let vp = request.readback_viewport;
    let (color, depth) = image.planes_mut()?;
    for y in vp.y..vp.top() {
        for x in vp.x..vp.right() {
            let i = y as usize * width + x as usize;
            color[i * 4..i * 4 + 4].copy_from_slice(&RED);
            pixel::write_f32(depth, i, 0.5);
        }
    }
    Ok(())
}

#[test]
fn frame_without_draw_source_is_an_invalid_operation() {
    let kinds = LocalCluster::run(1, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        ctx.add_tile(0, 0, 4, 4, 0).unwrap();
        let err = ctx
            .draw_frame(&matrix::identity(), &matrix::identity(), [0.0; 4])
            .unwrap_err();
        (err.kind(), ctx.last_error(), ctx.frame_count())
    })
    .unwrap();
    assert_eq!(kinds[0], (ErrorKind::InvalidOperation, Some(ErrorKind::InvalidOperation), 0));
}

#[test]
fn frame_without_tiles_is_rejected() {
    let kinds = LocalCluster::run(1, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        ctx.set_draw_callback(paint_red);
        ctx.draw_frame(&matrix::identity(), &matrix::identity(), [0.0; 4])
            .unwrap_err()
            .kind()
    })
    .unwrap();
    assert_eq!(kinds[0], ErrorKind::InvalidOperation);
}

#[test]
fn single_rank_frame_returns_the_rendered_tile() {
    let outputs = LocalCluster::run(1, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        ctx.add_tile(0, 0, 4, 4, 0).unwrap();
        ctx.set_draw_callback(paint_red);
        let first = ctx
            .draw_frame(&matrix::identity(), &matrix::identity(), [0.0, 0.0, 0.0, 1.0])
            .unwrap();
        let second = ctx
            .draw_frame(&matrix::identity(), &matrix::identity(), [0.0, 0.0, 0.0, 1.0])
            .unwrap();
        (first, second.stats.frame, ctx.last_error())
    })
    .unwrap();
    let (first, second_frame, last_error) = &outputs[0];
    assert_eq!(first.image.color_rgba8().unwrap(), RED.repeat(16).as_slice());
    assert_eq!(first.valid_pixels.tile, Some(0));
    assert_eq!(first.valid_pixels.num_pixels, 16);
    assert_eq!(first.stats.frame, 1);
    assert_eq!(*second_frame, 2);
    assert_eq!(*last_error, None);
    assert_eq!(first.stats.bytes_sent, 0);
    assert_eq!(first.diagnostics.contained_tiles, vec![true]);
}

#[test]
fn prerendered_frame_keeps_only_the_valid_viewport() {
    let outputs = LocalCluster::run(1, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        ctx.add_tile(0, 0, 4, 4, 0).unwrap();
        let color = RED.repeat(16);
        let mut depth = vec![0u8; 16 * 4];
        for i in 0..16 {
            pixel::write_f32(&mut depth, i, 0.5);
        }
        ctx.composite_image(&color, &depth, Some(Viewport::new(0, 0, 2, 4)), None, None, [0.0, 1.0, 0.0, 1.0])
            .unwrap()
    })
    .unwrap();
    let rgba = outputs[0].image.color_rgba8().unwrap();
    for y in 0..4 {
        for x in 0..4 {
            let px = &rgba[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
            let expected: &[u8] = if x < 2 { &RED } else { &[0, 255, 0, 255] };
            assert_eq!(px, expected, "pixel ({x}, {y})");
        }
    }
    assert_eq!(outputs[0].diagnostics.contained_viewport, Viewport::new(0, 0, 2, 4));
}

#[test]
fn dropping_matrices_clears_bounds_with_a_warning() {
    let outputs = LocalCluster::run(1, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        ctx.add_tile(0, 0, 2, 2, 0).unwrap();
        ctx.bounding_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let color = vec![0u8; 4 * 4];
        let depth = vec![0u8; 4 * 4];
        ctx.composite_image(&color, &depth, None, None, None, [0.0; 4]).unwrap()
    })
    .unwrap();
    let warnings = &outputs[0].diagnostics.warnings;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, ErrorKind::InvalidValue);
}

#[test]
fn composite_order_must_be_a_permutation() {
    let results = LocalCluster::run(2, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        let bad = ctx.composite_order(&[0, 0]).unwrap_err().kind();
        ctx.composite_order(&[1, 0]).unwrap();
        (bad, ctx.process_orders().to_vec())
    })
    .unwrap();
    assert_eq!(results[0], (ErrorKind::InvalidValue, vec![1, 0]));
}

#[test]
fn format_changes_are_validated() {
    let results = LocalCluster::run(1, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        let z_without_depth = ctx.set_formats(ColorFormat::RgbaUbyte, DepthFormat::None).unwrap_err().kind();
        ctx.set_composite_mode(CompositeMode::Blend).unwrap();
        ctx.set_formats(ColorFormat::RgbaFloat, DepthFormat::None).unwrap();
        (z_without_depth, ctx.config().color_format)
    })
    .unwrap();
    assert_eq!(results[0], (ErrorKind::InvalidOperation, ColorFormat::RgbaFloat));
}

#[test]
fn replication_color_groups_matching_ranks() {
    let groups = LocalCluster::run(4, |comm| {
        let mut ctx = Context::new(comm, CompositeConfig::default()).unwrap();
        ctx.data_replication_group_color((comm.rank() % 2) as i32).unwrap();
        ctx.replication_group().to_vec()
    })
    .unwrap();
    assert_eq!(groups, vec![vec![0, 2], vec![1, 3], vec![0, 2], vec![1, 3]]);
}

#[test]
fn blend_mode_ignores_the_depth_buffer_with_a_warning() {
    let outputs = LocalCluster::run(2, |comm| {
        let config = CompositeConfig {
            composite_mode: CompositeMode::Blend,
            depth_format: DepthFormat::Float,
            ..CompositeConfig::default()
        };
        let mut ctx = Context::new(comm, config).unwrap();
        ctx.add_tile(0, 0, 4, 4, 0).unwrap();
        let color = if comm.rank() == 0 { RED.repeat(16) } else { vec![0u8; 16 * 4] };
        let depth = vec![0u8; 16 * 4];
        ctx.composite_image(&color, &depth, None, None, None, [0.0; 4]).unwrap()
    })
    .unwrap();
    let display = &outputs[0];
    assert_eq!(display.image.depth_format(), DepthFormat::None);
    assert_eq!(display.image.color_rgba8().unwrap(), RED.repeat(16).as_slice());
    for out in &outputs {
        assert_eq!(out.diagnostics.warnings.len(), 1);
        assert_eq!(out.diagnostics.warnings[0].kind, ErrorKind::InvalidValue);
    }
}
