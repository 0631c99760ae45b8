//! Dense <-> sparse conversion and dense-side compositing.

pub(crate) mod composite;
pub(crate) mod compress;
pub(crate) mod decompress;

use crate::foundation::core::{Color, color_is_black};
use crate::image::format::CompositeMode;

/// Background colors in effect for a frame.
///
/// Blend mode renders and composites over transparent black (`working`); the
/// caller's `true_color` is blended back at the end when `needs_correction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Background {
    pub working: Color,
    pub true_color: Color,
    pub needs_correction: bool,
}

impl Background {
    /// A background used as-is, with no correction step.
    pub fn plain(color: Color) -> Self {
        Self {
            working: color,
            true_color: color,
            needs_correction: false,
        }
    }

    /// Resolve the working background for a composite mode.
    pub fn for_mode(mode: CompositeMode, color: Color, correct_colored_background: bool) -> Self {
        match mode {
            CompositeMode::ZBuffer => Self::plain(color),
            CompositeMode::Blend => Self {
                working: [0.0; 4],
                true_color: color,
                needs_correction: correct_colored_background && !color_is_black(color),
            },
        }
    }
}
