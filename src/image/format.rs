use crate::foundation::error::{CompositeError, CompositeResult};

/// Storage of the color channel of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    /// No color channel.
    None,
    /// Premultiplied RGBA, one byte per channel.
    #[default]
    RgbaUbyte,
    /// Premultiplied RGBA, one little-endian `f32` per channel.
    RgbaFloat,
}

/// Storage of the depth channel of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    /// No depth channel.
    None,
    /// One little-endian `f32` per pixel in `[0, 1]`, 1.0 is the far plane.
    #[default]
    Float,
}

/// How two images are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Keep the nearest fragment. Requires a depth channel.
    #[default]
    ZBuffer,
    /// Premultiplied alpha blending, front over back.
    Blend,
}

impl ColorFormat {
    pub(crate) const CODE_NONE: i32 = 0xC000;
    pub(crate) const CODE_UBYTE: i32 = 0xC001;
    pub(crate) const CODE_FLOAT: i32 = 0xC002;

    /// Bytes one pixel of this format occupies.
    pub const fn pixel_bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::RgbaUbyte => 4,
            Self::RgbaFloat => 16,
        }
    }

    pub(crate) const fn code(self) -> i32 {
        match self {
            Self::None => Self::CODE_NONE,
            Self::RgbaUbyte => Self::CODE_UBYTE,
            Self::RgbaFloat => Self::CODE_FLOAT,
        }
    }

    pub(crate) fn from_code(code: i32) -> CompositeResult<Self> {
        match code {
            Self::CODE_NONE => Ok(Self::None),
            Self::CODE_UBYTE => Ok(Self::RgbaUbyte),
            Self::CODE_FLOAT => Ok(Self::RgbaFloat),
            other => Err(CompositeError::invalid_enum(format!(
                "unknown color format code 0x{other:X}"
            ))),
        }
    }
}

impl DepthFormat {
    pub(crate) const CODE_NONE: i32 = 0xD000;
    pub(crate) const CODE_FLOAT: i32 = 0xD001;

    /// Bytes one pixel of this format occupies.
    pub const fn pixel_bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::Float => 4,
        }
    }

    pub(crate) const fn code(self) -> i32 {
        match self {
            Self::None => Self::CODE_NONE,
            Self::Float => Self::CODE_FLOAT,
        }
    }

    pub(crate) fn from_code(code: i32) -> CompositeResult<Self> {
        match code {
            Self::CODE_NONE => Ok(Self::None),
            Self::CODE_FLOAT => Ok(Self::Float),
            other => Err(CompositeError::invalid_enum(format!(
                "unknown depth format code 0x{other:X}"
            ))),
        }
    }
}

/// Runtime pixel layout shared by dense and sparse images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelFormat {
    pub color: ColorFormat,
    pub depth: DepthFormat,
}

impl PixelFormat {
    pub const fn new(color: ColorFormat, depth: DepthFormat) -> Self {
        Self { color, depth }
    }

    pub const fn color_bytes(self) -> usize {
        self.color.pixel_bytes()
    }

    pub const fn depth_bytes(self) -> usize {
        self.depth.pixel_bytes()
    }

    /// Bytes of one interleaved pixel in a sparse image.
    pub const fn pixel_bytes(self) -> usize {
        self.color_bytes() + self.depth_bytes()
    }

    pub(crate) fn ensure_same(self, other: PixelFormat, what: &str) -> CompositeResult<()> {
        if self != other {
            return Err(CompositeError::invalid_value(format!(
                "{what}: images have different formats ({self:?} vs {other:?})"
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for ColorFormat {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "rgba_ubyte" | "ubyte" => Ok(Self::RgbaUbyte),
            "rgba_float" | "float" => Ok(Self::RgbaFloat),
            other => Err(CompositeError::invalid_enum(format!(
                "unknown color format '{other}'"
            ))),
        }
    }
}

impl std::str::FromStr for DepthFormat {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "float" => Ok(Self::Float),
            other => Err(CompositeError::invalid_enum(format!(
                "unknown depth format '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/format.rs"]
mod tests;
