use crate::foundation::core::{Color, Viewport};
use crate::foundation::error::CompositeResult;
use crate::frame::matrix::Matrix;
use crate::image::dense::OwnedImage;

/// Everything a renderer needs to draw one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRequest {
    pub projection: Matrix,
    pub modelview: Matrix,
    pub background: Color,
    /// Pixels of the output the compositor will read back; the rest may be
    /// left untouched.
    pub readback_viewport: Viewport,
}

/// Renders geometry into a compositor-owned buffer.
///
/// The buffer is sized to the physical render size and already has the
/// session's pixel format.
pub trait DrawCallback {
    fn draw(&mut self, request: &DrawRequest, output: &mut OwnedImage) -> CompositeResult<()>;
}

impl<F> DrawCallback for F
where
    F: FnMut(&DrawRequest, &mut OwnedImage) -> CompositeResult<()>,
{
    fn draw(&mut self, request: &DrawRequest, output: &mut OwnedImage) -> CompositeResult<()> {
        self(request, output)
    }
}
