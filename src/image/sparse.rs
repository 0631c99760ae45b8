use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::PixelFormat;
use crate::image::header::{HEADER_SIZE, ImageHeader, RUN_LENGTH_SIZE, SPARSE_MAGIC, to_i32};
use crate::image::runs::{RunCursor, RunWriter, push_run, read_run, write_run};

/// Run-length encoded image: `(inactive, active)` pairs each followed by the
/// active pixels, interleaved color then depth.
///
/// The run lengths always sum to `width * height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseImage {
    format: PixelFormat,
    width: usize,
    height: usize,
    max_pixels: usize,
    data: Vec<u8>,
}

/// Worst-case serialized size of a sparse image of the given geometry.
pub fn sparse_buffer_size(format: PixelFormat, width: usize, height: usize) -> usize {
    let n = width * height;
    let pixel = format.pixel_bytes();
    let mut size = HEADER_SIZE + RUN_LENGTH_SIZE + n * pixel;
    // Alternating one-pixel runs cost a header per two pixels.
    if pixel < RUN_LENGTH_SIZE {
        size += (RUN_LENGTH_SIZE - pixel) * n.div_ceil(2);
    }
    size
}

impl SparseImage {
    /// An empty (fully inactive) image able to hold `width * height` pixels.
    pub fn new(format: PixelFormat, width: usize, height: usize) -> Self {
        Self::with_capacity(format, width, height, width * height)
    }

    pub fn with_capacity(format: PixelFormat, width: usize, height: usize, max_pixels: usize) -> Self {
        let max_pixels = max_pixels.max(width * height);
        let reserve = sparse_buffer_size(format, max_pixels, 1) - HEADER_SIZE;
        let mut image = Self {
            format,
            width,
            height,
            max_pixels,
            data: Vec::with_capacity(reserve),
        };
        image.clear();
        image
    }

    /// A 0x0 image.
    pub fn null(format: PixelFormat) -> Self {
        Self::new(format, 0, 0)
    }

    /// An empty image of the given dimensions that writes into `buffer`.
    pub(crate) fn with_buffer(
        format: PixelFormat,
        width: usize,
        height: usize,
        max_pixels: usize,
        buffer: Vec<u8>,
    ) -> Self {
        let mut image = Self {
            format,
            width,
            height,
            max_pixels: max_pixels.max(width * height),
            data: buffer,
        };
        image.clear();
        image
    }

    pub(crate) fn from_runs(format: PixelFormat, width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            max_pixels: width * height,
            data,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
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

    /// Bytes this image occupies when packaged for sending.
    pub fn compressed_buffer_size(&self) -> usize {
        HEADER_SIZE + self.data.len()
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn cursor(&self) -> RunCursor<'_> {
        RunCursor::new(&self.data, self.format.pixel_bytes())
    }

    /// Hand the run buffer to a [`RunWriter`], leaving this image empty.
    pub(crate) fn take_writer(&mut self) -> RunWriter {
        RunWriter::new(std::mem::take(&mut self.data))
    }

    /// Install freshly written runs with new dimensions.
    pub(crate) fn install(&mut self, width: usize, height: usize, writer: RunWriter) -> CompositeResult<()> {
        self.check_capacity(width, height)?;
        self.width = width;
        self.height = height;
        self.data = writer.finish();
        Ok(())
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Keep only the first `cut` bytes of runs, shortening the run header at
    /// `last_run` by the pixels that fell past the cut.
    pub(crate) fn truncate_runs(
        &mut self,
        num_pixels: usize,
        cut: usize,
        last_run: Option<usize>,
        leftover: (usize, usize),
    ) -> CompositeResult<()> {
        self.check_capacity(num_pixels, 1)?;
        self.width = num_pixels;
        self.height = 1;
        self.data.truncate(cut);
        match last_run {
            Some(pos) => {
                let (inactive, active) = read_run(&self.data, pos)
                    .ok_or_else(|| CompositeError::sanity("corrupt compressed image: lost run header"))?;
                write_run(&mut self.data, pos, inactive - leftover.0, active - leftover.1);
            }
            None => {
                self.data.clear();
                push_run(&mut self.data, 0, 0);
            }
        }
        Ok(())
    }

    fn check_capacity(&self, width: usize, height: usize) -> CompositeResult<()> {
        if width * height > self.max_pixels {
            return Err(CompositeError::invalid_value(format!(
                "cannot set an image size to greater than what the image was originally created ({width}x{height} > {} pixels)",
                self.max_pixels
            )));
        }
        Ok(())
    }

    /// Resize within the original capacity and clear to a single inactive run.
    pub fn set_dimensions(&mut self, width: usize, height: usize) -> CompositeResult<()> {
        self.check_capacity(width, height)?;
        self.width = width;
        self.height = height;
        self.clear();
        Ok(())
    }

    /// Make every pixel inactive.
    pub fn clear(&mut self) {
        let n = self.num_pixels();
        self.data.clear();
        push_run(&mut self.data, n, 0);
    }

    /// Iterate the `(inactive, active)` run pairs.
    pub fn runs(&self) -> Runs<'_> {
        Runs {
            data: &self.data,
            pos: 0,
            pixel_bytes: self.format.pixel_bytes(),
        }
    }

    /// Total active pixels stored.
    pub fn num_active_pixels(&self) -> usize {
        self.runs().map(|(_, a)| a).sum()
    }

    /// Check that the runs cover exactly `width * height` pixels.
    pub fn validate_runs(&self) -> CompositeResult<()> {
        let mut total = 0usize;
        let mut pos = 0usize;
        let pb = self.format.pixel_bytes();
        while pos < self.data.len() {
            let (inactive, active) = read_run(&self.data, pos).ok_or_else(|| {
                CompositeError::sanity("corrupt compressed image: truncated run header")
            })?;
            pos += RUN_LENGTH_SIZE + active * pb;
            total += inactive + active;
        }
        if pos != self.data.len() || total != self.num_pixels() {
            return Err(CompositeError::sanity(format!(
                "corrupt compressed image: runs cover {total} of {} pixels",
                self.num_pixels()
            )));
        }
        Ok(())
    }

    /// Serialize header and runs.
    pub fn package_for_send(&self) -> CompositeResult<Vec<u8>> {
        let size = self.compressed_buffer_size();
        let mut out = Vec::with_capacity(size);
        ImageHeader {
            magic: SPARSE_MAGIC,
            format: self.format,
            width: self.width,
            height: self.height,
            max_pixels: self.num_pixels(),
            actual_size: to_i32(size)?,
        }
        .write_to(&mut out)?;
        out.extend_from_slice(&self.data);
        Ok(out)
    }

    /// Rebuild an image from bytes produced by [`SparseImage::package_for_send`].
    pub fn unpackage_from_receive(bytes: &[u8]) -> CompositeResult<Self> {
        let header = ImageHeader::read_from(bytes)?;
        header.expect_magic(SPARSE_MAGIC, "sparse image")?;
        if header.actual_size < 0 || header.actual_size as usize != bytes.len() {
            return Err(CompositeError::sanity(format!(
                "inconsistent sparse image size: header {} received {}",
                header.actual_size,
                bytes.len()
            )));
        }
        let max = sparse_buffer_size(header.format, header.width, header.height);
        if bytes.len() > max {
            return Err(CompositeError::sanity(format!(
                "sparse image of {} bytes exceeds its worst case of {max}",
                bytes.len()
            )));
        }
        let image = Self::from_runs(
            header.format,
            header.width,
            header.height,
            bytes[HEADER_SIZE..].to_vec(),
        );
        image.validate_runs()?;
        Ok(image)
    }
}

/// Copy `num_pixels` pixels starting at `in_offset` into `output`, which
/// becomes a `num_pixels x 1` image.
///
/// Copying a whole image is a raw copy that keeps the input dimensions and
/// the output capacity.
pub fn copy_sparse_pixels(
    input: &SparseImage,
    in_offset: usize,
    num_pixels: usize,
    output: &mut SparseImage,
) -> CompositeResult<()> {
    input.format.ensure_same(output.format, "copy_sparse_pixels")?;
    if in_offset + num_pixels > input.num_pixels() {
        return Err(CompositeError::invalid_value(format!(
            "cannot copy pixels [{in_offset}, {}) of a {} pixel image",
            in_offset + num_pixels,
            input.num_pixels()
        )));
    }
    if in_offset == 0 && num_pixels == input.num_pixels() {
        output.check_capacity(input.width, input.height)?;
        output.width = input.width;
        output.height = input.height;
        output.data.clear();
        output.data.extend_from_slice(&input.data);
        return Ok(());
    }
    let mut cursor = input.cursor();
    cursor.scan(in_offset, None)?;
    let mut writer = output.take_writer();
    cursor.scan(num_pixels, Some(&mut writer))?;
    output.install(num_pixels, 1, writer)
}

/// Iterator over the run pairs of a [`SparseImage`].
#[derive(Clone, Debug)]
pub struct Runs<'a> {
    data: &'a [u8],
    pos: usize,
    pixel_bytes: usize,
}

impl Iterator for Runs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let run = read_run(self.data, self.pos)?;
        self.pos += RUN_LENGTH_SIZE + run.1 * self.pixel_bytes;
        Some(run)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/sparse.rs"]
mod tests;
