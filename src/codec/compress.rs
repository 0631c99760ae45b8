use crate::foundation::core::Viewport;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::dense::Image;
use crate::image::format::{ColorFormat, CompositeMode, DepthFormat};
use crate::image::pixel::{self, FAR_DEPTH};
use crate::image::runs::RunWriter;
use crate::image::sparse::SparseImage;

/// Inactive margins placed around a compressed region.
///
/// `full_width`/`full_height` are the dimensions of the resulting sparse
/// image; the region plus the margins must add up to them exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub bottom: usize,
    pub top: usize,
    pub left: usize,
    pub right: usize,
    pub full_width: usize,
    pub full_height: usize,
}

#[derive(Clone, Copy)]
enum Activity {
    Depth,
    Alpha,
    Nothing,
}

fn activity(image: &Image<'_>, mode: CompositeMode) -> CompositeResult<Activity> {
    match mode {
        CompositeMode::ZBuffer => {
            if image.depth_format() == DepthFormat::None {
                return Err(CompositeError::invalid_operation(
                    "cannot use z-buffer compression with no depth buffer",
                ));
            }
            Ok(Activity::Depth)
        }
        CompositeMode::Blend => {
            if image.depth_format() != DepthFormat::None {
                tracing::warn!("z buffer ignored during blend compress; output depth is meaningless");
            }
            if image.color_format() == ColorFormat::None {
                tracing::warn!("compressing image with no color data");
                return Ok(Activity::Nothing);
            }
            Ok(Activity::Alpha)
        }
    }
}

/// Row-major walk over a rectangle of the input image.
struct Scan {
    start: usize,
    rows: usize,
    row_len: usize,
    row_stride: usize,
}

fn compress_scan(
    input: &Image<'_>,
    act: Activity,
    scan: Scan,
    pad: Padding,
    writer: &mut RunWriter,
) {
    let (cb, db) = (input.format().color_bytes(), input.format().depth_bytes());
    let (color, depth) = (input.color_bytes(), input.depth_bytes());
    let color_format = input.color_format();

    writer.add_inactive(pad.bottom * pad.full_width);
    let mut pending = 0usize;
    for row in 0..scan.rows {
        pending += pad.left;
        let base = scan.start + row * scan.row_stride;
        for i in base..base + scan.row_len {
            let active = match act {
                Activity::Depth => pixel::read_f32(depth, i) < FAR_DEPTH,
                Activity::Alpha => pixel::has_alpha(color_format, &color[i * cb..]),
                Activity::Nothing => false,
            };
            if active {
                writer.add_inactive(std::mem::take(&mut pending));
                writer.add_pixel(&color[i * cb..(i + 1) * cb], &depth[i * db..(i + 1) * db]);
            } else {
                pending += 1;
            }
        }
        pending += pad.right;
    }
    writer.add_inactive(pending + pad.top * pad.full_width);
}

/// Compress a whole dense image.
pub fn compress_image(
    input: &Image<'_>,
    mode: CompositeMode,
    output: &mut SparseImage,
) -> CompositeResult<()> {
    compress_padded(
        input,
        Viewport::sized(input.width() as i32, input.height() as i32),
        Padding {
            full_width: input.width(),
            full_height: input.height(),
            ..Padding::default()
        },
        mode,
        output,
    )
}

/// Compress `num_pixels` consecutive pixels starting at `offset`; the output
/// becomes a `num_pixels x 1` image.
pub fn compress_sub_image(
    input: &Image<'_>,
    offset: usize,
    num_pixels: usize,
    mode: CompositeMode,
    output: &mut SparseImage,
) -> CompositeResult<()> {
    input.format().ensure_same(output.format(), "compress")?;
    if offset + num_pixels > input.num_pixels() {
        return Err(CompositeError::invalid_value(format!(
            "compress range [{offset}, {}) outside of a {} pixel image",
            offset + num_pixels,
            input.num_pixels()
        )));
    }
    let act = activity(input, mode)?;
    let mut writer = output.take_writer();
    compress_scan(
        input,
        act,
        Scan {
            start: offset,
            rows: 1,
            row_len: num_pixels,
            row_stride: 0,
        },
        Padding::default(),
        &mut writer,
    );
    output.install(num_pixels, 1, writer)
}

/// Compress `region` of `input`, surrounded by inactive `padding`.
///
/// The output has dimensions `padding.full_width x padding.full_height`.
pub fn compress_padded(
    input: &Image<'_>,
    region: Viewport,
    padding: Padding,
    mode: CompositeMode,
    output: &mut SparseImage,
) -> CompositeResult<()> {
    input.format().ensure_same(output.format(), "compress")?;
    if region.x < 0
        || region.y < 0
        || region.width < 0
        || region.height < 0
        || region.right() as usize > input.width()
        || region.top() as usize > input.height()
    {
        return Err(CompositeError::invalid_value(format!(
            "compress region {region:?} outside of a {}x{} image",
            input.width(),
            input.height()
        )));
    }
    let (rw, rh) = (region.width as usize, region.height as usize);
    if rw + padding.left + padding.right != padding.full_width
        || rh + padding.bottom + padding.top != padding.full_height
    {
        return Err(CompositeError::invalid_value(format!(
            "region {rw}x{rh} with padding {padding:?} does not fill the output"
        )));
    }
    let act = activity(input, mode)?;
    let mut writer = output.take_writer();
    compress_scan(
        input,
        act,
        Scan {
            start: region.x as usize + input.width() * region.y as usize,
            rows: rh,
            row_len: rw,
            row_stride: input.width(),
        },
        padding,
        &mut writer,
    );
    output.install(padding.full_width, padding.full_height, writer)
}

#[cfg(test)]
#[path = "../../tests/unit/codec/compress.rs"]
mod tests;
