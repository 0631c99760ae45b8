use crate::codec::Background;
use crate::foundation::core::Color;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::dense::Image;
use crate::image::format::{CompositeMode, DepthFormat};
use crate::image::pixel;
use crate::image::sparse::SparseImage;

/// What happens to destination pixels as runs are replayed.
#[derive(Clone, Copy)]
enum Replay {
    /// Inactive pixels become `background`, active pixels are copied.
    Overwrite { background: Color },
    /// Active pixels are blended over `background`, inactive pixels become it.
    OverBackground { background: Color },
    /// Inactive pixels are skipped, active pixels are composited.
    Composite { mode: CompositeMode, src_on_top: bool },
}

fn replay(input: &SparseImage, offset: usize, output: &mut Image<'_>, how: Replay) -> CompositeResult<()> {
    input.format().ensure_same(output.format(), "decompress")?;
    let n = input.num_pixels();
    if offset + n > output.num_pixels() {
        return Err(CompositeError::invalid_value(format!(
            "decompressing {n} pixels at offset {offset} overruns a {} pixel image",
            output.num_pixels()
        )));
    }
    if let Replay::Composite { mode: CompositeMode::ZBuffer, .. } = how
        && input.format().depth == DepthFormat::None
    {
        return Err(CompositeError::invalid_operation(
            "cannot z-buffer composite images without depth",
        ));
    }

    let format = input.format();
    let color_format = format.color;
    let (cb, db) = (format.color_bytes(), format.depth_bytes());
    let fill = match how {
        Replay::Overwrite { background } | Replay::OverBackground { background } => {
            Some((pixel::encode_color(color_format, background), pixel::encode_far_depth(format.depth)))
        }
        Replay::Composite { .. } => None,
    };
    let (color, depth) = output.planes_mut()?;

    let mut cursor = input.cursor();
    let mut i = offset;
    let end = offset + n;
    while i < end {
        cursor.refill()?;
        let run = cursor.inactive().min(end - i);
        cursor.skip_inactive(run);
        if let Some((bg_color, bg_depth)) = &fill {
            for p in i..i + run {
                color[p * cb..(p + 1) * cb].copy_from_slice(bg_color);
                depth[p * db..(p + 1) * db].copy_from_slice(bg_depth);
            }
        }
        i += run;

        let run = cursor.active().min(end - i);
        let src = cursor.take_active(run)?;
        let pixel_bytes = (cb + db).max(1);
        for (k, px) in src.chunks_exact(pixel_bytes).enumerate() {
            let p = i + k;
            let (src_color, src_depth) = px.split_at(cb);
            let dst_color = &mut color[p * cb..(p + 1) * cb];
            let dst_depth = &mut depth[p * db..(p + 1) * db];
            match how {
                Replay::Overwrite { .. } => {
                    dst_color.copy_from_slice(src_color);
                    dst_depth.copy_from_slice(src_depth);
                }
                Replay::OverBackground { .. } => {
                    if let Some((bg_color, _)) = &fill {
                        pixel::blend(color_format, src_color, bg_color, dst_color);
                    }
                    dst_depth.copy_from_slice(src_depth);
                }
                Replay::Composite {
                    mode: CompositeMode::ZBuffer,
                    ..
                } => {
                    if pixel::read_f32(src_depth, 0) < pixel::read_f32(dst_depth, 0) {
                        dst_color.copy_from_slice(src_color);
                        dst_depth.copy_from_slice(src_depth);
                    }
                }
                Replay::Composite {
                    mode: CompositeMode::Blend,
                    src_on_top,
                } => {
                    if src_on_top {
                        pixel::blend_over(color_format, src_color, dst_color);
                    } else {
                        pixel::blend_under(color_format, dst_color, src_color);
                    }
                }
            }
        }
        i += run;
    }
    Ok(())
}

/// Expand `input` into `output`, resizing it to the sparse image's dimensions.
pub fn decompress_image(input: &SparseImage, output: &mut Image<'_>, background: Color) -> CompositeResult<()> {
    output.set_dimensions(input.width(), input.height())?;
    decompress_sub_image(input, 0, output, background)
}

/// Expand `input` into `output` starting at pixel `offset`.
pub fn decompress_sub_image(
    input: &SparseImage,
    offset: usize,
    output: &mut Image<'_>,
    background: Color,
) -> CompositeResult<()> {
    replay(input, offset, output, Replay::Overwrite { background })
}

/// Like [`decompress_image`], blending the true background back in when the
/// frame was composited over black.
pub fn decompress_image_correct_background(
    input: &SparseImage,
    output: &mut Image<'_>,
    background: &Background,
) -> CompositeResult<()> {
    output.set_dimensions(input.width(), input.height())?;
    decompress_sub_image_correct_background(input, 0, output, background)
}

/// Sub-image form of [`decompress_image_correct_background`].
pub fn decompress_sub_image_correct_background(
    input: &SparseImage,
    offset: usize,
    output: &mut Image<'_>,
    background: &Background,
) -> CompositeResult<()> {
    let how = if background.needs_correction {
        Replay::OverBackground {
            background: background.true_color,
        }
    } else {
        Replay::Overwrite {
            background: background.working,
        }
    };
    replay(input, offset, output, how)
}

/// Composite a sparse image onto a dense accumulator covering the same pixels.
pub fn compressed_composite(
    dest: &mut Image<'_>,
    src: &SparseImage,
    mode: CompositeMode,
    src_on_top: bool,
) -> CompositeResult<()> {
    if src.num_pixels() != dest.num_pixels() {
        return Err(CompositeError::sanity(format!(
            "composite of {} pixels onto a {} pixel image",
            src.num_pixels(),
            dest.num_pixels()
        )));
    }
    compressed_sub_composite(dest, 0, src, mode, src_on_top)
}

/// Composite a sparse image onto `dest` starting at pixel `offset`.
pub fn compressed_sub_composite(
    dest: &mut Image<'_>,
    offset: usize,
    src: &SparseImage,
    mode: CompositeMode,
    src_on_top: bool,
) -> CompositeResult<()> {
    replay(src, offset, dest, Replay::Composite { mode, src_on_top })
}

#[cfg(test)]
#[path = "../../tests/unit/codec/decompress.rs"]
mod tests;
