use crate::foundation::core::{Color, Viewport};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::{ColorFormat, DepthFormat, PixelFormat};
use crate::image::header::{DENSE_MAGIC, HEADER_SIZE, ImageHeader, POINTER_MAGIC};
use crate::image::pixel::{self, FAR_DEPTH};

/// Dense image with planar color and depth storage.
///
/// An image either owns its pixels or borrows them from the caller (a
/// "pointer image"). Pointer images are read-only: every mutating accessor
/// returns [`CompositeError::SanityCheck`].
#[derive(Clone, Debug)]
pub struct Image<'a> {
    format: PixelFormat,
    width: usize,
    height: usize,
    max_pixels: usize,
    storage: Storage<'a>,
}

/// Dense image that owns its buffers.
pub type OwnedImage = Image<'static>;

#[derive(Clone, Debug)]
enum Storage<'a> {
    Owned { color: Vec<u8>, depth: Vec<u8> },
    Borrowed { color: &'a [u8], depth: &'a [u8] },
}

/// Serialized size of a dense image of the given geometry.
pub fn dense_buffer_size(format: PixelFormat, width: usize, height: usize) -> usize {
    HEADER_SIZE + width * height * format.pixel_bytes()
}

/// Serialized size of a pointer image, which carries no pixels inline.
pub fn pointer_buffer_size() -> usize {
    HEADER_SIZE
}

impl OwnedImage {
    /// Allocate an image whose capacity is exactly `width * height` pixels.
    pub fn new(format: PixelFormat, width: usize, height: usize) -> Self {
        Self::with_capacity(format, width, height, width * height)
    }

    /// Allocate an image able to grow up to `max_pixels` pixels through
    /// [`Image::set_dimensions`].
    pub fn with_capacity(format: PixelFormat, width: usize, height: usize, max_pixels: usize) -> Self {
        let max_pixels = max_pixels.max(width * height);
        Self {
            format,
            width,
            height,
            max_pixels,
            storage: Storage::Owned {
                color: vec![0; max_pixels * format.color_bytes()],
                depth: vec![0; max_pixels * format.depth_bytes()],
            },
        }
    }

    /// A 0x0 image with no channels.
    pub fn null() -> Self {
        Self::new(PixelFormat::new(ColorFormat::None, DepthFormat::None), 0, 0)
    }

    /// Rebuild an image from bytes produced by [`Image::package_for_send`].
    pub fn unpackage_from_receive(bytes: &[u8]) -> CompositeResult<Self> {
        let header = ImageHeader::read_from(bytes)?;
        if header.magic == POINTER_MAGIC {
            return Err(CompositeError::sanity(
                "cannot receive a pointer image; package it as a dense image",
            ));
        }
        header.expect_magic(DENSE_MAGIC, "dense image")?;
        let expected = dense_buffer_size(header.format, header.width, header.height);
        if header.actual_size < 0 || header.actual_size as usize != expected || bytes.len() != expected
        {
            return Err(CompositeError::sanity(format!(
                "inconsistent dense image size: header {} computed {expected} received {}",
                header.actual_size,
                bytes.len()
            )));
        }
        let n = header.width * header.height;
        let color_len = n * header.format.color_bytes();
        let payload = &bytes[HEADER_SIZE..];
        let mut image = Self::new(header.format, header.width, header.height);
        if let Storage::Owned { color, depth } = &mut image.storage {
            color.copy_from_slice(&payload[..color_len]);
            depth.copy_from_slice(&payload[color_len..]);
        }
        Ok(image)
    }
}

impl<'a> Image<'a> {
    /// Wrap caller-owned planes as a read-only pointer image.
    ///
    /// A plane must be supplied exactly when the format has that channel.
    pub fn from_buffers(
        format: PixelFormat,
        width: usize,
        height: usize,
        color: &'a [u8],
        depth: &'a [u8],
    ) -> CompositeResult<Self> {
        let n = width * height;
        check_plane("color", format.color_bytes(), n, color.len())?;
        check_plane("depth", format.depth_bytes(), n, depth.len())?;
        Ok(Self {
            format,
            width,
            height,
            max_pixels: n,
            storage: Storage::Borrowed {
                color: &color[..n * format.color_bytes()],
                depth: &depth[..n * format.depth_bytes()],
            },
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn color_format(&self) -> ColorFormat {
        self.format.color
    }

    pub fn depth_format(&self) -> DepthFormat {
        self.format.depth
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    pub fn max_num_pixels(&self) -> usize {
        self.max_pixels
    }

    /// Whether this image only borrows its planes.
    pub fn is_pointer(&self) -> bool {
        matches!(self.storage, Storage::Borrowed { .. })
    }

    /// Declared serialized size; `-1` for pointer images.
    pub fn actual_buffer_size(&self) -> i64 {
        if self.is_pointer() {
            -1
        } else {
            dense_buffer_size(self.format, self.width, self.height) as i64
        }
    }

    /// Resize within the original allocation.
    pub fn set_dimensions(&mut self, width: usize, height: usize) -> CompositeResult<()> {
        if self.is_pointer() {
            return Err(CompositeError::sanity(
                "cannot set the dimensions of a pointer image",
            ));
        }
        if width * height > self.max_pixels {
            return Err(CompositeError::invalid_value(format!(
                "cannot set an image size to greater than what the image was originally created ({width}x{height} > {} pixels)",
                self.max_pixels
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Raw color plane of the current `width * height` pixels.
    pub fn color_bytes(&self) -> &[u8] {
        let len = self.num_pixels() * self.format.color_bytes();
        match &self.storage {
            Storage::Owned { color, .. } => &color[..len],
            Storage::Borrowed { color, .. } => &color[..len],
        }
    }

    /// Raw depth plane of the current `width * height` pixels.
    pub fn depth_bytes(&self) -> &[u8] {
        let len = self.num_pixels() * self.format.depth_bytes();
        match &self.storage {
            Storage::Owned { depth, .. } => &depth[..len],
            Storage::Borrowed { depth, .. } => &depth[..len],
        }
    }

    /// Mutable color and depth planes.
    pub fn planes_mut(&mut self) -> CompositeResult<(&mut [u8], &mut [u8])> {
        let n = self.num_pixels();
        let (cb, db) = (self.format.color_bytes(), self.format.depth_bytes());
        match &mut self.storage {
            Storage::Owned { color, depth } => Ok((&mut color[..n * cb], &mut depth[..n * db])),
            Storage::Borrowed { .. } => Err(CompositeError::sanity(
                "pointer images are read-only and cannot be written",
            )),
        }
    }

    pub fn color_bytes_mut(&mut self) -> CompositeResult<&mut [u8]> {
        Ok(self.planes_mut()?.0)
    }

    pub fn depth_bytes_mut(&mut self) -> CompositeResult<&mut [u8]> {
        Ok(self.planes_mut()?.1)
    }

    /// 8-bit RGBA color plane.
    pub fn color_rgba8(&self) -> CompositeResult<&[u8]> {
        if self.format.color != ColorFormat::RgbaUbyte {
            return Err(CompositeError::invalid_operation(format!(
                "color format is {:?}, not rgba_ubyte",
                self.format.color
            )));
        }
        Ok(self.color_bytes())
    }

    /// Float RGBA color plane, one `[r, g, b, a]` per pixel.
    pub fn color_rgba_f32(&self) -> CompositeResult<Vec<[f32; 4]>> {
        if self.format.color != ColorFormat::RgbaFloat {
            return Err(CompositeError::invalid_operation(format!(
                "color format is {:?}, not rgba_float",
                self.format.color
            )));
        }
        Ok(self
            .color_bytes()
            .chunks_exact(16)
            .map(|px| pixel::color_to_f32(ColorFormat::RgbaFloat, px))
            .collect())
    }

    /// Float depth plane.
    pub fn depth_f32(&self) -> CompositeResult<Vec<f32>> {
        if self.format.depth != DepthFormat::Float {
            return Err(CompositeError::invalid_operation(
                "depth format is not float",
            ));
        }
        let depth = self.depth_bytes();
        Ok((0..self.num_pixels()).map(|i| pixel::read_f32(depth, i)).collect())
    }

    /// Depth of pixel `index`, the far plane when there is no depth channel.
    pub(crate) fn depth_at(&self, index: usize) -> f32 {
        match self.format.depth {
            DepthFormat::Float => pixel::read_f32(self.depth_bytes(), index),
            DepthFormat::None => FAR_DEPTH,
        }
    }

    /// Copy colors out as 8-bit RGBA, converting from float if needed.
    pub fn copy_color_ub(&self, out: &mut [u8]) -> CompositeResult<()> {
        let n = self.num_pixels();
        check_out_len(out.len(), n * 4)?;
        match self.format.color {
            ColorFormat::None => Err(CompositeError::invalid_operation(
                "image has no color buffer to copy",
            )),
            ColorFormat::RgbaUbyte => {
                out[..n * 4].copy_from_slice(self.color_bytes());
                Ok(())
            }
            ColorFormat::RgbaFloat => {
                for (dst, src) in out.chunks_exact_mut(4).zip(self.color_bytes().chunks_exact(16)) {
                    let c = pixel::color_to_f32(ColorFormat::RgbaFloat, src);
                    dst.copy_from_slice(&c.map(|v| (255.0 * v.clamp(0.0, 1.0)) as u8));
                }
                Ok(())
            }
        }
    }

    /// Copy colors out as float RGBA, converting from 8-bit if needed.
    pub fn copy_color_f(&self, out: &mut [f32]) -> CompositeResult<()> {
        let n = self.num_pixels();
        check_out_len(out.len(), n * 4)?;
        if self.format.color == ColorFormat::None {
            return Err(CompositeError::invalid_operation(
                "image has no color buffer to copy",
            ));
        }
        let cb = self.format.color_bytes();
        for (dst, src) in out.chunks_exact_mut(4).zip(self.color_bytes().chunks_exact(cb)) {
            dst.copy_from_slice(&pixel::color_to_f32(self.format.color, src));
        }
        Ok(())
    }

    /// Copy depths out as floats.
    pub fn copy_depth_f(&self, out: &mut [f32]) -> CompositeResult<()> {
        let n = self.num_pixels();
        check_out_len(out.len(), n)?;
        if self.format.depth == DepthFormat::None {
            return Err(CompositeError::invalid_operation(
                "image has no depth buffer to copy",
            ));
        }
        let depth = self.depth_bytes();
        for (i, d) in out.iter_mut().take(n).enumerate() {
            *d = pixel::read_f32(depth, i);
        }
        Ok(())
    }

    /// Fill every pixel with `background` and far depth.
    pub fn clear(&mut self, background: Color) -> CompositeResult<()> {
        self.clear_around_region(Viewport::default(), background)
    }

    /// Fill everything outside `region` with `background` and far depth.
    pub fn clear_around_region(&mut self, region: Viewport, background: Color) -> CompositeResult<()> {
        let (w, h) = (self.width as i32, self.height as i32);
        let color_px = pixel::encode_color(self.format.color, background);
        let depth_px = pixel::encode_far_depth(self.format.depth);
        let (cb, db) = (self.format.color_bytes(), self.format.depth_bytes());
        let (color, depth) = self.planes_mut()?;

        let mut fill = |start: i32, end: i32| {
            let (start, end) = (start.max(0) as usize, end.max(0) as usize);
            for i in start..end {
                if cb > 0 {
                    color[i * cb..(i + 1) * cb].copy_from_slice(&color_px);
                }
                if db > 0 {
                    depth[i * db..(i + 1) * db].copy_from_slice(&depth_px);
                }
            }
        };

        if region.is_empty() {
            fill(0, w * h);
            return Ok(());
        }
        let bottom = region.y.clamp(0, h);
        let top = region.top().clamp(bottom, h);
        let left = region.x.clamp(0, w);
        let right = region.right().clamp(left, w);
        fill(0, bottom * w);
        for y in bottom..top {
            fill(y * w, y * w + left);
            fill(y * w + right, (y + 1) * w);
        }
        fill(top * w, h * w);
        Ok(())
    }

    /// Owned deep copy, turning a pointer image into a regular one.
    pub fn to_owned_image(&self) -> OwnedImage {
        let mut out = OwnedImage::new(self.format, self.width, self.height);
        if let Storage::Owned { color, depth } = &mut out.storage {
            color.copy_from_slice(self.color_bytes());
            depth.copy_from_slice(self.depth_bytes());
        }
        out
    }

    /// Serialize header and planes. Pointer images package as dense images.
    pub fn package_for_send(&self) -> CompositeResult<Vec<u8>> {
        let size = dense_buffer_size(self.format, self.width, self.height);
        let mut out = Vec::with_capacity(size);
        ImageHeader {
            magic: DENSE_MAGIC,
            format: self.format,
            width: self.width,
            height: self.height,
            max_pixels: self.num_pixels(),
            actual_size: crate::image::header::to_i32(size)?,
        }
        .write_to(&mut out)?;
        out.extend_from_slice(self.color_bytes());
        out.extend_from_slice(self.depth_bytes());
        Ok(out)
    }
}

/// Copy a rectangular region between two images of the same format.
pub fn copy_region(
    input: &Image<'_>,
    in_viewport: Viewport,
    output: &mut Image<'_>,
    out_viewport: Viewport,
) -> CompositeResult<()> {
    input.format.ensure_same(output.format, "copy_region")?;
    if in_viewport.width != out_viewport.width || in_viewport.height != out_viewport.height {
        return Err(CompositeError::invalid_value(
            "sizes of input and output regions must be the same",
        ));
    }
    for (vp, img, what) in [
        (in_viewport, (input.width, input.height), "input"),
        (out_viewport, (output.width, output.height), "output"),
    ] {
        if vp.x < 0 || vp.y < 0 || vp.right() > img.0 as i32 || vp.top() > img.1 as i32 {
            return Err(CompositeError::invalid_value(format!(
                "{what} region {vp:?} does not fit in a {}x{} image",
                img.0, img.1
            )));
        }
    }
    if in_viewport.is_empty() {
        return Ok(());
    }
    let (in_w, out_w) = (input.width, output.width);
    let row = in_viewport.width as usize;
    let (cb, db) = (input.format.color_bytes(), input.format.depth_bytes());
    let (src_color, src_depth) = (input.color_bytes(), input.depth_bytes());
    let (dst_color, dst_depth) = output.planes_mut()?;
    for y in 0..in_viewport.height as usize {
        let src = (in_viewport.y as usize + y) * in_w + in_viewport.x as usize;
        let dst = (out_viewport.y as usize + y) * out_w + out_viewport.x as usize;
        dst_color[dst * cb..(dst + row) * cb].copy_from_slice(&src_color[src * cb..(src + row) * cb]);
        dst_depth[dst * db..(dst + row) * db].copy_from_slice(&src_depth[src * db..(src + row) * db]);
    }
    Ok(())
}

/// Copy `num_pixels` consecutive pixels between two images of the same format.
pub fn copy_pixels(
    input: &Image<'_>,
    in_offset: usize,
    output: &mut Image<'_>,
    out_offset: usize,
    num_pixels: usize,
) -> CompositeResult<()> {
    input.format.ensure_same(output.format, "copy_pixels")?;
    if in_offset + num_pixels > input.num_pixels() {
        return Err(CompositeError::invalid_value("pixels to copy are outside of the input range"));
    }
    if out_offset + num_pixels > output.num_pixels() {
        return Err(CompositeError::invalid_value("pixels to copy are outside of the output range"));
    }
    let (cb, db) = (input.format.color_bytes(), input.format.depth_bytes());
    let (src_color, src_depth) = (input.color_bytes(), input.depth_bytes());
    let (dst_color, dst_depth) = output.planes_mut()?;
    dst_color[out_offset * cb..(out_offset + num_pixels) * cb]
        .copy_from_slice(&src_color[in_offset * cb..(in_offset + num_pixels) * cb]);
    dst_depth[out_offset * db..(out_offset + num_pixels) * db]
        .copy_from_slice(&src_depth[in_offset * db..(in_offset + num_pixels) * db]);
    Ok(())
}

fn check_plane(what: &str, bytes_per_pixel: usize, n: usize, len: usize) -> CompositeResult<()> {
    if bytes_per_pixel == 0 {
        if len != 0 {
            return Err(CompositeError::invalid_value(format!(
                "{what} buffer given for a format without {what}"
            )));
        }
    } else if len < n * bytes_per_pixel {
        return Err(CompositeError::invalid_value(format!(
            "{what} buffer of {len} bytes is too small for {n} pixels"
        )));
    }
    Ok(())
}

fn check_out_len(len: usize, needed: usize) -> CompositeResult<()> {
    if len < needed {
        return Err(CompositeError::invalid_value(format!(
            "output buffer holds {len} values, {needed} needed"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/image/dense.rs"]
mod tests;
