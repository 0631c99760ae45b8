use super::*;
use crate::foundation::error::ErrorKind;
use crate::image::format::{ColorFormat, DepthFormat};
use crate::image::pixel;
use crate::image::pool::ScratchPoolOpts;

const FORMAT: PixelFormat = PixelFormat::new(ColorFormat::RgbaUbyte, DepthFormat::Float);
const RED: [u8; 4] = [255, 0, 0, 255];

fn params(floating_viewport: bool, render_empty_images: bool) -> RenderParams {
    RenderParams {
        projection: matrix::identity(),
        modelview: matrix::identity(),
        background: [0.0, 0.0, 1.0, 1.0],
        mode: CompositeMode::ZBuffer,
        format: FORMAT,
        floating_viewport,
        render_empty_images,
    }
}

/// Two 4x4 tiles side by side, seen from rank 0.
fn two_tiles() -> TileLayout {
    let mut layout = TileLayout::new(0, 2);
    layout.add_tile(0, 0, 4, 4, 0).unwrap();
    layout.add_tile(4, 0, 4, 4, 1).unwrap();
    layout
}

/// Fills the readback viewport with red at depth 0.5 and records each call.
fn painter(calls: &mut Vec<DrawRequest>) -> impl FnMut(&DrawRequest, &mut OwnedImage) -> CompositeResult<()> + '_ {
    move |request: &DrawRequest, image: &mut OwnedImage| {
        calls.push(*request);
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
}

fn pool() -> ScratchPool {
    ScratchPool::new(ScratchPoolOpts::default())
}

#[test]
fn geometry_inside_one_tile_is_read_back_in_place() {
    let mut layout = TileLayout::new(0, 1);
    layout.add_tile(0, 0, 8, 8, 0).unwrap();
    let mut calls = Vec::new();
    let mut draw = painter(&mut calls);
    let mut buffer = OwnedImage::null();
    let mask = [true];
    let mut generator = TileGenerator::new(
        DrawSource::Callback(&mut draw),
        &layout,
        Viewport::new(2, 2, 3, 3),
        &mask,
        params(true, false),
        &mut buffer,
    );
    let mut timing = FrameTiming::default();
    let image = generator.tile_image(0, &mut timing).unwrap();
    let rgba = image.color_rgba8().unwrap();
    let at = |x: usize, y: usize| &rgba[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4];
    assert_eq!(at(3, 3), &RED);
    assert_eq!(at(0, 0), &[0, 0, 255, 255]);
    assert_eq!(at(5, 5), &[0, 0, 255, 255]);
    drop(generator);
    drop(draw);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].readback_viewport, Viewport::new(2, 2, 3, 3));
}

#[test]
fn tiles_outside_the_mask_are_not_rendered() {
    let layout = two_tiles();
    let mut calls = Vec::new();
    let mut draw = painter(&mut calls);
    let mut buffer = OwnedImage::null();
    let mask = [true, false];
    let mut generator = TileGenerator::new(
        DrawSource::Callback(&mut draw),
        &layout,
        Viewport::new(0, 0, 4, 4),
        &mask,
        params(true, false),
        &mut buffer,
    );
    let sparse = generator.compressed_tile(1, &mut pool(), &mut FrameTiming::default()).unwrap();
    assert_eq!((sparse.width(), sparse.height()), (4, 4));
    assert_eq!(sparse.num_active_pixels(), 0);
    drop(generator);
    drop(draw);
    assert!(calls.is_empty());
}

#[test]
fn empty_tiles_still_render_when_asked() {
    let layout = two_tiles();
    let mut calls = Vec::new();
    let mut draw = painter(&mut calls);
    let mut buffer = OwnedImage::null();
    let mask = [true, false];
    let mut generator = TileGenerator::new(
        DrawSource::Callback(&mut draw),
        &layout,
        Viewport::new(0, 0, 4, 4),
        &mask,
        params(true, true),
        &mut buffer,
    );
    let sparse = generator.compressed_tile(1, &mut pool(), &mut FrameTiming::default()).unwrap();
    assert_eq!(sparse.num_active_pixels(), 0);
    drop(generator);
    drop(draw);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].readback_viewport.is_empty());
}

#[test]
fn floating_viewport_renders_once_for_both_tiles() {
    let layout = two_tiles();
    let mut calls = Vec::new();
    let mut draw = painter(&mut calls);
    let mut buffer = OwnedImage::null();
    let mask = [true, true];
    let mut generator = TileGenerator::new(
        DrawSource::Callback(&mut draw),
        &layout,
        Viewport::new(2, 0, 4, 4),
        &mask,
        params(true, false),
        &mut buffer,
    );
    let mut pool = pool();
    let mut timing = FrameTiming::default();
    let left = generator.compressed_tile(0, &mut pool, &mut timing).unwrap();
    let right = generator.compressed_tile(1, &mut pool, &mut timing).unwrap();
    assert_eq!(left.num_active_pixels(), 8);
    assert_eq!(right.num_active_pixels(), 8);
    // The left tile's active pixels are its right half.
    assert_eq!(left.runs().next(), Some((2, 2)));
    assert_eq!(right.runs().next(), Some((0, 2)));
    drop(generator);
    drop(draw);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].readback_viewport, Viewport::new(0, 0, 4, 4));
}

#[test]
fn without_floating_viewport_each_tile_renders() {
    let layout = two_tiles();
    let mut calls = Vec::new();
    let mut draw = painter(&mut calls);
    let mut buffer = OwnedImage::null();
    let mask = [true, true];
    let mut generator = TileGenerator::new(
        DrawSource::Callback(&mut draw),
        &layout,
        Viewport::new(2, 0, 4, 4),
        &mask,
        params(false, false),
        &mut buffer,
    );
    let mut pool = pool();
    let mut timing = FrameTiming::default();
    assert_eq!(generator.compressed_tile(0, &mut pool, &mut timing).unwrap().num_active_pixels(), 8);
    assert_eq!(generator.compressed_tile(1, &mut pool, &mut timing).unwrap().num_active_pixels(), 8);
    drop(generator);
    drop(draw);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].readback_viewport, Viewport::new(2, 0, 2, 4));
    assert_eq!(calls[1].readback_viewport, Viewport::new(0, 0, 2, 4));
}

#[test]
fn prerendered_tiles_read_from_the_global_buffer() {
    let layout = two_tiles();
    let mut color = vec![0u8; 8 * 4 * 4];
    let mut depth = vec![0u8; 8 * 4 * 4];
    for i in 0..32 {
        let value = if i % 8 >= 4 { 0.25 } else { 1.0 };
        pixel::write_f32(&mut depth, i, value);
        color[i * 4..i * 4 + 4].copy_from_slice(&RED);
    }
    let prerendered = Image::from_buffers(FORMAT, 8, 4, &color, &depth).unwrap();
    let mut buffer = OwnedImage::null();
    let mask = [true, true];
    let mut generator = TileGenerator::new(
        DrawSource::Prerendered(&prerendered),
        &layout,
        Viewport::new(0, 0, 8, 4),
        &mask,
        params(true, false),
        &mut buffer,
    );
    let mut pool = pool();
    let mut timing = FrameTiming::default();
    assert_eq!(generator.compressed_tile(0, &mut pool, &mut timing).unwrap().num_active_pixels(), 0);
    assert_eq!(generator.compressed_tile(1, &mut pool, &mut timing).unwrap().num_active_pixels(), 16);
}

#[test]
fn resizing_the_render_buffer_is_rejected() {
    let mut layout = TileLayout::new(0, 1);
    layout.add_tile(0, 0, 4, 4, 0).unwrap();
    let mut draw = |_: &DrawRequest, image: &mut OwnedImage| image.set_dimensions(2, 2);
    let mut buffer = OwnedImage::null();
    let mask = [true];
    let mut generator = TileGenerator::new(
        DrawSource::Callback(&mut draw),
        &layout,
        Viewport::new(0, 0, 4, 4),
        &mask,
        params(true, false),
        &mut buffer,
    );
    let err = generator.tile_image(0, &mut FrameTiming::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SanityCheck);
}
