use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::{ColorFormat, CompositeMode, DepthFormat};
use crate::image::pixel::{self, PixelBytes};
use crate::image::sparse::SparseImage;

/// Composite two sparse images run by run into `dest`.
///
/// Pixels active on one side pass through, pixels active on both sides are
/// merged (nearest depth, or `front` blended over `back`), pixels inactive on
/// both stay inactive. `front` and `back` must be distinct images.
pub fn composite_sparse(
    front: &SparseImage,
    back: &SparseImage,
    mode: CompositeMode,
    dest: &mut SparseImage,
) -> CompositeResult<()> {
    if std::ptr::eq(front, back) {
        return Err(CompositeError::sanity(
            "front and back of a compressed composite are the same image",
        ));
    }
    let format = front.format();
    if format != back.format() || format != dest.format() {
        return Err(CompositeError::sanity(
            "input buffers do not agree for compressed-compressed composite",
        ));
    }
    let n = front.num_pixels();
    if n != back.num_pixels() {
        return Err(CompositeError::sanity(format!(
            "compressed composite of {n} and {} pixel images",
            back.num_pixels()
        )));
    }

    match mode {
        CompositeMode::ZBuffer if format.depth == DepthFormat::None => {
            return Err(CompositeError::invalid_operation(
                "cannot z-buffer composite images without depth",
            ));
        }
        CompositeMode::Blend if format.depth != DepthFormat::None => {
            return Err(CompositeError::invalid_value(
                "cannot use blend composite with a depth buffer",
            ));
        }
        CompositeMode::Blend if format.color == ColorFormat::None => {
            tracing::warn!("compositing images with no color data");
            return dest.set_dimensions(front.width(), front.height());
        }
        _ => {}
    }

    let cb = format.color_bytes();
    let pb = format.pixel_bytes();
    let mut f = front.cursor();
    let mut b = back.cursor();
    let mut writer = dest.take_writer();
    let mut blended = PixelBytes::from_elem(0, cb);

    let mut done = 0usize;
    while done < n {
        f.refill()?;
        b.refill()?;
        let step = match (f.inactive(), b.inactive()) {
            (fi, bi) if fi > 0 && bi > 0 => {
                let m = fi.min(bi).min(n - done);
                f.skip_inactive(m);
                b.skip_inactive(m);
                writer.add_inactive(m);
                m
            }
            (fi, _) if fi > 0 => {
                let m = fi.min(b.active()).min(n - done);
                f.skip_inactive(m);
                writer.add_active(b.take_active(m)?, m);
                m
            }
            (_, bi) if bi > 0 => {
                let m = bi.min(f.active()).min(n - done);
                b.skip_inactive(m);
                writer.add_active(f.take_active(m)?, m);
                m
            }
            _ => {
                let m = f.active().min(b.active()).min(n - done);
                let fp = f.take_active(m)?;
                let bp = b.take_active(m)?;
                for (fpx, bpx) in fp.chunks_exact(pb.max(1)).zip(bp.chunks_exact(pb.max(1))) {
                    match mode {
                        CompositeMode::ZBuffer => {
                            let fd = pixel::read_f32(&fpx[cb..], 0);
                            let bd = pixel::read_f32(&bpx[cb..], 0);
                            writer.add_active(if fd < bd { fpx } else { bpx }, 1);
                        }
                        CompositeMode::Blend => {
                            pixel::blend(format.color, fpx, bpx, &mut blended);
                            writer.add_active(&blended, 1);
                        }
                    }
                }
                m
            }
        };
        if step == 0 {
            return Err(CompositeError::invalid_value("corrupt compressed image"));
        }
        done += step;
    }
    dest.install(front.width(), front.height(), writer)
}

#[cfg(test)]
#[path = "../../tests/unit/algebra/composite.rs"]
mod tests;
