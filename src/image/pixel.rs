//! Per-pixel primitives shared by the dense and sparse code paths.
//!
//! Pixels are handled as byte slices in the runtime [`ColorFormat`]; floats are
//! little-endian. The blend helpers operate on premultiplied colors.

use smallvec::SmallVec;

use crate::foundation::core::{Color, color_to_rgba8};
use crate::image::format::{ColorFormat, DepthFormat, PixelFormat};

/// Far-plane depth. Pixels at or beyond it are background in z-buffer mode.
pub const FAR_DEPTH: f32 = 1.0;

/// One encoded pixel (color then depth), at most 20 bytes.
pub(crate) type PixelBytes = SmallVec<[u8; 20]>;

#[inline]
pub(crate) fn read_f32(bytes: &[u8], index: usize) -> f32 {
    let o = index * 4;
    f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
}

#[inline]
pub(crate) fn write_f32(bytes: &mut [u8], index: usize, value: f32) {
    let o = index * 4;
    bytes[o..o + 4].copy_from_slice(&value.to_le_bytes());
}

/// Alpha of a single encoded color pixel, normalized to `[0, 1]`.
#[inline]
pub(crate) fn alpha(color: ColorFormat, pixel: &[u8]) -> f32 {
    match color {
        ColorFormat::None => 0.0,
        ColorFormat::RgbaUbyte => f32::from(pixel[3]) / 255.0,
        ColorFormat::RgbaFloat => read_f32(pixel, 3),
    }
}

/// Whether a color pixel carries any coverage.
#[inline]
pub(crate) fn has_alpha(color: ColorFormat, pixel: &[u8]) -> bool {
    match color {
        ColorFormat::None => false,
        ColorFormat::RgbaUbyte => pixel[3] != 0,
        ColorFormat::RgbaFloat => read_f32(pixel, 3) != 0.0,
    }
}

/// `dest = front + back * (1 - front.alpha)`.
pub(crate) fn blend(color: ColorFormat, front: &[u8], back: &[u8], dest: &mut [u8]) {
    match color {
        ColorFormat::None => {}
        ColorFormat::RgbaUbyte => {
            let af = 255 - u32::from(front[3]);
            for i in 0..4 {
                let v = u32::from(back[i]) * af / 255 + u32::from(front[i]);
                dest[i] = v.min(255) as u8;
            }
        }
        ColorFormat::RgbaFloat => {
            let af = 1.0 - read_f32(front, 3);
            for i in 0..4 {
                let v = read_f32(back, i) * af + read_f32(front, i);
                write_f32(dest, i, v);
            }
        }
    }
}

/// Blend `front` over the pixel held in `back_dest`, in place.
pub(crate) fn blend_over(color: ColorFormat, front: &[u8], back_dest: &mut [u8]) {
    let mut back: PixelBytes = SmallVec::from_slice(back_dest);
    back.truncate(color.pixel_bytes());
    blend(color, front, &back, back_dest);
}

/// Blend `back` under the pixel held in `front_dest`, in place.
pub(crate) fn blend_under(color: ColorFormat, front_dest: &mut [u8], back: &[u8]) {
    let front: PixelBytes = SmallVec::from_slice(&front_dest[..color.pixel_bytes()]);
    blend(color, &front, back, front_dest);
}

/// Encode a background color in the given color format.
pub(crate) fn encode_color(color: ColorFormat, value: Color) -> PixelBytes {
    match color {
        ColorFormat::None => SmallVec::new(),
        ColorFormat::RgbaUbyte => SmallVec::from_slice(&color_to_rgba8(value)),
        ColorFormat::RgbaFloat => value.iter().flat_map(|c| c.to_le_bytes()).collect(),
    }
}

/// Encode the far-plane depth in the given depth format.
pub(crate) fn encode_far_depth(depth: DepthFormat) -> PixelBytes {
    match depth {
        DepthFormat::None => SmallVec::new(),
        DepthFormat::Float => SmallVec::from_slice(&FAR_DEPTH.to_le_bytes()),
    }
}

/// Interleaved background pixel (color followed by far depth).
pub(crate) fn encode_background(format: PixelFormat, value: Color) -> PixelBytes {
    let mut px = encode_color(format.color, value);
    px.extend_from_slice(&encode_far_depth(format.depth));
    px
}

/// Convert an encoded color pixel to floats.
pub(crate) fn color_to_f32(color: ColorFormat, pixel: &[u8]) -> [f32; 4] {
    match color {
        ColorFormat::None => [0.0; 4],
        ColorFormat::RgbaUbyte => [0, 1, 2, 3].map(|i| f32::from(pixel[i]) / 255.0),
        ColorFormat::RgbaFloat => [0, 1, 2, 3].map(|i| read_f32(pixel, i)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/pixel.rs"]
mod tests;
