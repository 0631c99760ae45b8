use std::path::Path;

use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::{ColorFormat, CompositeMode, DepthFormat, PixelFormat};

/// Default branching factor radix-k aims for.
pub const DEFAULT_MAGIC_K: usize = 8;

/// Default cap on how many pieces an image may be split into.
pub const DEFAULT_MAX_IMAGE_SPLIT: usize = 1 << 30;

/// Multi-tile strategy driving a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Composite one tile at a time with the whole group.
    #[default]
    Sequential,
    /// Send every tile image straight to its display rank.
    Direct,
}

/// Strategy used to composite one image across a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleImageStrategy {
    /// Radix-k with the configured `magic_k`.
    Radixk,
    /// Binary swap, radix-k fixed at `k = 2`.
    Bswap,
    /// Binary tree of whole-image reductions.
    Tree,
    /// Let the compositor decide (currently radix-k).
    #[default]
    Automatic,
}

impl std::str::FromStr for Strategy {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "direct" => Ok(Self::Direct),
            other => Err(CompositeError::invalid_enum(format!(
                "unknown strategy '{other}'"
            ))),
        }
    }
}

impl std::str::FromStr for SingleImageStrategy {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "radixk" => Ok(Self::Radixk),
            "bswap" => Ok(Self::Bswap),
            "tree" => Ok(Self::Tree),
            "automatic" => Ok(Self::Automatic),
            other => Err(CompositeError::invalid_enum(format!(
                "unknown single image strategy '{other}'"
            ))),
        }
    }
}

/// Tunables for a compositing context.
///
/// Loaded once per session (usually from JSON) and handed to
/// [`crate::Context::new`]. Only formats and the composite mode may change
/// afterwards, and only between frames.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeConfig {
    pub composite_mode: CompositeMode,
    pub color_format: ColorFormat,
    pub depth_format: DepthFormat,
    pub strategy: Strategy,
    pub single_image_strategy: SingleImageStrategy,
    /// Target branching factor for radix-k rounds.
    pub magic_k: usize,
    /// Upper bound on the number of partitions an image is split into.
    pub max_image_split: usize,
    pub interlace_images: bool,
    /// Fold non-power-of-two remainders into a power-of-two main group.
    pub telescope: bool,
    pub collect_images: bool,
    pub ordered_composite: bool,
    /// Blend the true background back in when blending over a colored one.
    pub correct_colored_background: bool,
    pub floating_viewport: bool,
    pub render_empty_images: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            composite_mode: CompositeMode::ZBuffer,
            color_format: ColorFormat::RgbaUbyte,
            depth_format: DepthFormat::Float,
            strategy: Strategy::Sequential,
            single_image_strategy: SingleImageStrategy::Automatic,
            magic_k: DEFAULT_MAGIC_K,
            max_image_split: DEFAULT_MAX_IMAGE_SPLIT,
            interlace_images: true,
            telescope: false,
            collect_images: true,
            ordered_composite: false,
            correct_colored_background: false,
            floating_viewport: true,
            render_empty_images: false,
        }
    }
}

impl CompositeConfig {
    /// Parse a config from JSON text and validate it.
    pub fn from_json_str(s: &str) -> CompositeResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> CompositeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CompositeError::Other(anyhow::Error::new(e).context(format!(
                "read config '{}'",
                path.display()
            )))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> CompositeResult<()> {
        if self.magic_k < 2 {
            return Err(CompositeError::invalid_value(format!(
                "magic_k must be at least 2, got {}",
                self.magic_k
            )));
        }
        if self.max_image_split < 1 {
            return Err(CompositeError::invalid_value(
                "max_image_split must be at least 1",
            ));
        }
        if self.composite_mode == CompositeMode::ZBuffer && self.depth_format == DepthFormat::None
        {
            return Err(CompositeError::invalid_operation(
                "z-buffer compositing requires a depth format",
            ));
        }
        if self.composite_mode == CompositeMode::Blend && self.depth_format != DepthFormat::None {
            tracing::warn!("blend mode ignores the depth format; images carry color only");
        }
        Ok(())
    }

    /// Layout of the images the compositor works on.
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::new(self.color_format, self.composited_depth())
    }

    /// Depth format images actually carry. Blend mode never composites depth.
    pub fn composited_depth(&self) -> DepthFormat {
        match self.composite_mode {
            CompositeMode::Blend => DepthFormat::None,
            CompositeMode::ZBuffer => self.depth_format,
        }
    }

    /// Radix-k parameters after resolving the single-image strategy.
    pub(crate) fn effective_magic_k(&self) -> usize {
        match self.single_image_strategy {
            SingleImageStrategy::Bswap => 2,
            _ => self.magic_k,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
