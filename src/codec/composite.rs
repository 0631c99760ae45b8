use crate::codec::Background;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::dense::Image;
use crate::image::format::{ColorFormat, CompositeMode, DepthFormat};
use crate::image::pixel;

/// Composite two dense images of the same size into `dest`.
///
/// Z-buffer mode keeps the nearer fragment. Blend mode puts `src` over `dest`
/// when `src_on_top`, under it otherwise.
pub fn composite_dense(
    dest: &mut Image<'_>,
    src: &Image<'_>,
    mode: CompositeMode,
    src_on_top: bool,
) -> CompositeResult<()> {
    dest.format().ensure_same(src.format(), "composite")?;
    if dest.num_pixels() != src.num_pixels() {
        return Err(CompositeError::invalid_value(
            "source and destination sizes don't match",
        ));
    }
    let format = src.format();
    let (cb, db) = (format.color_bytes(), format.depth_bytes());
    let (src_color, src_depth) = (src.color_bytes(), src.depth_bytes());
    let n = src.num_pixels();
    let (dst_color, dst_depth) = dest.planes_mut()?;

    match mode {
        CompositeMode::ZBuffer => {
            if format.depth == DepthFormat::None {
                return Err(CompositeError::invalid_operation(
                    "cannot z-buffer composite images without depth",
                ));
            }
            for i in 0..n {
                if pixel::read_f32(src_depth, i) < pixel::read_f32(dst_depth, i) {
                    dst_depth[i * db..(i + 1) * db].copy_from_slice(&src_depth[i * db..(i + 1) * db]);
                    dst_color[i * cb..(i + 1) * cb].copy_from_slice(&src_color[i * cb..(i + 1) * cb]);
                }
            }
        }
        CompositeMode::Blend => {
            if format.depth != DepthFormat::None {
                tracing::warn!("z buffer ignored during blend composite");
            }
            if format.color == ColorFormat::None {
                tracing::warn!("compositing images with no color data");
                return Ok(());
            }
            for i in 0..n {
                let s = &src_color[i * cb..(i + 1) * cb];
                let d = &mut dst_color[i * cb..(i + 1) * cb];
                if src_on_top {
                    pixel::blend_over(format.color, s, d);
                } else {
                    pixel::blend_under(format.color, d, s);
                }
            }
        }
    }
    Ok(())
}

/// Blend the true background under every pixel when correction is needed.
///
/// Returns whether the image was touched.
pub fn correct_background(image: &mut Image<'_>, background: &Background) -> CompositeResult<bool> {
    if !background.needs_correction {
        return Ok(false);
    }
    let color_format = image.color_format();
    let bg = pixel::encode_color(color_format, background.true_color);
    let cb = color_format.pixel_bytes();
    if cb == 0 {
        return Ok(false);
    }
    let color = image.color_bytes_mut()?;
    for px in color.chunks_exact_mut(cb) {
        pixel::blend_under(color_format, px, &bg);
    }
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/codec/composite.rs"]
mod tests;
