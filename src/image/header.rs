use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::{ColorFormat, DepthFormat, PixelFormat};

/// Size of the serialized image header: seven little-endian `i32` fields.
pub const HEADER_SIZE: usize = 7 * 4;

/// Bytes of one `(inactive, active)` run-length pair.
pub const RUN_LENGTH_SIZE: usize = 2 * 4;

pub(crate) const DENSE_MAGIC: i32 = 0x004D_5000;
pub(crate) const POINTER_MAGIC: i32 = 0x004D_5100;
pub(crate) const SPARSE_MAGIC: i32 = 0x004D_6000;

/// Wire header preceding every packaged image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ImageHeader {
    pub magic: i32,
    pub format: PixelFormat,
    pub width: usize,
    pub height: usize,
    pub max_pixels: usize,
    /// Total packaged size in bytes, `-1` for pointer images.
    pub actual_size: i32,
}

impl ImageHeader {
    pub fn write_to(&self, out: &mut Vec<u8>) -> CompositeResult<()> {
        let fields = [
            self.magic,
            self.format.color.code(),
            self.format.depth.code(),
            to_i32(self.width)?,
            to_i32(self.height)?,
            to_i32(self.max_pixels)?,
            self.actual_size,
        ];
        for f in fields {
            out.extend_from_slice(&f.to_le_bytes());
        }
        Ok(())
    }

    pub fn read_from(bytes: &[u8]) -> CompositeResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CompositeError::sanity(format!(
                "image buffer of {} bytes is smaller than its header",
                bytes.len()
            )));
        }
        let field = |i: usize| {
            let o = i * 4;
            i32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
        };
        let dim = |i: usize| {
            usize::try_from(field(i))
                .map_err(|_| CompositeError::sanity(format!("negative image header field {i}")))
        };
        Ok(Self {
            magic: field(0),
            format: PixelFormat::new(
                ColorFormat::from_code(field(1))?,
                DepthFormat::from_code(field(2))?,
            ),
            width: dim(3)?,
            height: dim(4)?,
            max_pixels: dim(5)?,
            actual_size: field(6),
        })
    }

    pub fn expect_magic(&self, magic: i32, what: &str) -> CompositeResult<()> {
        if self.magic != magic {
            return Err(CompositeError::sanity(format!(
                "invalid {what} header magic 0x{:X}",
                self.magic
            )));
        }
        Ok(())
    }
}

pub(crate) fn to_i32(v: usize) -> CompositeResult<i32> {
    i32::try_from(v).map_err(|_| CompositeError::invalid_value(format!("{v} does not fit in a header field")))
}
