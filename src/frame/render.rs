//! Per-tile image generation: drive the draw callback (or read a
//! pre-rendered buffer) and cut out the part of the result that belongs to a
//! tile.

use std::time::Instant;

use crate::codec::compress::{Padding, compress_padded};
use crate::foundation::core::{Color, Viewport};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::frame::draw::{DrawCallback, DrawRequest};
use crate::frame::matrix::{self, Matrix};
use crate::frame::projection::{project_tile, viewport_project};
use crate::frame::tiles::TileLayout;
use crate::frame::timing::FrameTiming;
use crate::image::dense::{Image, OwnedImage, copy_region};
use crate::image::format::{CompositeMode, PixelFormat};
use crate::image::pool::{BufferKey, ScratchPool};
use crate::image::sparse::{SparseImage, sparse_buffer_size};
use crate::strategy::TileRenderer;

/// Where tile pixels come from.
pub(crate) enum DrawSource<'s> {
    Callback(&'s mut (dyn DrawCallback + 's)),
    /// A buffer covering the global viewport, rendered before the frame.
    Prerendered(&'s Image<'s>),
}

/// Per-frame inputs shared by every tile this rank generates.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RenderParams {
    pub projection: Matrix,
    pub modelview: Matrix,
    pub background: Color,
    pub mode: CompositeMode,
    pub format: PixelFormat,
    pub floating_viewport: bool,
    pub render_empty_images: bool,
}

/// Result of placing one tile: `screen` is the region of the rendered
/// buffer holding the tile's pixels, `target` where they go in the tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Placement {
    screen: Viewport,
    target: Viewport,
}

const NOWHERE: Placement = Placement {
    screen: Viewport::new(0, 0, 0, 0),
    target: Viewport::new(0, 0, 0, 0),
};

/// Generates this rank's image of any tile during one frame.
pub(crate) struct TileGenerator<'s> {
    source: DrawSource<'s>,
    layout: &'s TileLayout,
    contained: Viewport,
    mask: &'s [bool],
    params: RenderParams,
    render_buffer: &'s mut OwnedImage,
    /// Viewport of the floating render already in `render_buffer` this frame.
    floating: Option<Viewport>,
}

impl<'s> TileGenerator<'s> {
    pub(crate) fn new(
        source: DrawSource<'s>,
        layout: &'s TileLayout,
        contained: Viewport,
        mask: &'s [bool],
        params: RenderParams,
        render_buffer: &'s mut OwnedImage,
    ) -> Self {
        Self {
            source,
            layout,
            contained,
            mask,
            params,
            render_buffer,
            floating: None,
        }
    }

    fn tile_viewport(&self, tile: usize) -> CompositeResult<Viewport> {
        Ok(self.layout.tile(tile)?.viewport)
    }

    fn place(&mut self, tile: usize, timing: &mut FrameTiming) -> CompositeResult<Placement> {
        match self.source {
            DrawSource::Prerendered(_) => self.place_prerendered(tile),
            DrawSource::Callback(_) => self.render_tile(tile, timing),
        }
    }

    fn place_prerendered(&self, tile: usize) -> CompositeResult<Placement> {
        let tvp = self.tile_viewport(tile)?;
        let screen = tvp.intersect(self.contained);
        if screen.is_empty() {
            return Ok(NOWHERE);
        }
        let global = self.layout.global_viewport();
        Ok(Placement {
            screen: screen.relative_to(global),
            target: screen.relative_to(tvp),
        })
    }

    fn render_tile(&mut self, tile: usize, timing: &mut FrameTiming) -> CompositeResult<Placement> {
        let tvp = self.tile_viewport(tile)?;
        let cvp = self.contained;
        let (pw, ph) = self.layout.physical_render_size();
        let in_mask = self.mask.get(tile).copied().unwrap_or(false);

        if !in_mask
            || cvp.right() < tvp.x
            || cvp.top() < tvp.y
            || cvp.x > tvp.right()
            || cvp.y > tvp.top()
        {
            tracing::debug!(tile, "case 0: geometry completely outside tile");
            if self.params.render_empty_images {
                let projection = project_tile(self.layout, tile, &self.params.projection)?;
                self.draw(projection, Viewport::default(), timing)?;
            }
            return Ok(NOWHERE);
        }

        if tvp.contains(cvp) {
            tracing::debug!(tile, "case 1: geometry fits entirely within tile");
            let screen = cvp.relative_to(tvp);
            let projection = project_tile(self.layout, tile, &self.params.projection)?;
            self.draw(projection, screen, timing)?;
            return Ok(Placement { screen, target: screen });
        }

        if !self.params.floating_viewport || cvp.width > pw || cvp.height > ph {
            tracing::debug!(tile, "case 2: can't use floating viewport");
            let (x, width) = clip_axis(cvp.x, cvp.width, tvp.x, tvp.width);
            let (y, height) = clip_axis(cvp.y, cvp.height, tvp.y, tvp.height);
            let screen = Viewport::new(x, y, width, height);
            let projection = project_tile(self.layout, tile, &self.params.projection)?;
            self.draw(projection, screen, timing)?;
            return Ok(Placement { screen, target: screen });
        }

        tracing::debug!(tile, "case 3: using floating viewport");
        let rendered = Viewport::new(cvp.x, cvp.y, pw, ph);
        let (sx, tx, width) = float_axis(cvp.x, cvp.width, tvp.x, tvp.width);
        let (sy, ty, height) = float_axis(cvp.y, cvp.height, tvp.y, tvp.height);
        let placement = Placement {
            screen: Viewport::new(sx, sy, width, height),
            target: Viewport::new(tx, ty, width, height),
        };
        match self.floating {
            Some(previous) if previous == rendered => {
                tracing::debug!(tile, "already rendered floating viewport");
                return Ok(placement);
            }
            Some(_) => {
                return Err(CompositeError::sanity(
                    "rendered floating viewport became invalidated",
                ));
            }
            None => {}
        }
        let viewport_proj = viewport_project(
            rendered.x,
            rendered.y,
            rendered.width,
            rendered.height,
            self.layout.global_viewport(),
        );
        let projection = matrix::multiply(&viewport_proj, &self.params.projection);
        self.draw(projection, Viewport::sized(cvp.width, cvp.height), timing)?;
        self.floating = Some(rendered);
        Ok(placement)
    }

    fn draw(&mut self, projection: Matrix, readback: Viewport, timing: &mut FrameTiming) -> CompositeResult<()> {
        let DrawSource::Callback(callback) = &mut self.source else {
            return Err(CompositeError::sanity("asked to draw a pre-rendered frame"));
        };
        let (pw, ph) = self.layout.physical_render_size();
        let (pw, ph) = (pw.max(0) as usize, ph.max(0) as usize);
        if self.render_buffer.format() != self.params.format || self.render_buffer.max_num_pixels() < pw * ph {
            *self.render_buffer = OwnedImage::new(self.params.format, pw, ph);
        } else {
            self.render_buffer.set_dimensions(pw, ph)?;
        }
        let request = DrawRequest {
            projection,
            modelview: self.params.modelview,
            background: self.params.background,
            readback_viewport: readback,
        };
        let start = Instant::now();
        callback.draw(&request, self.render_buffer)?;
        timing.render += start.elapsed().as_secs_f64();
        if (self.render_buffer.width(), self.render_buffer.height()) != (pw, ph)
            || self.render_buffer.format() != self.params.format
        {
            return Err(CompositeError::sanity(
                "draw callback changed the geometry or format of the render buffer",
            ));
        }
        Ok(())
    }

    fn rendered(&self) -> &Image<'_> {
        match &self.source {
            DrawSource::Prerendered(image) => *image,
            DrawSource::Callback(_) => self.render_buffer,
        }
    }

    fn tile_dims(&self, tile: usize) -> CompositeResult<(usize, usize)> {
        let vp = self.tile_viewport(tile)?;
        Ok((vp.width.max(0) as usize, vp.height.max(0) as usize))
    }
}

/// Clip one axis of the contained viewport to a tile (non-floating render).
fn clip_axis(c_pos: i32, c_len: i32, t_pos: i32, t_len: i32) -> (i32, i32) {
    if c_pos <= t_pos {
        (0, t_len.min(c_pos + c_len - t_pos))
    } else {
        (c_pos - t_pos, c_len.min(t_pos + t_len - c_pos))
    }
}

/// One axis of a floating render: `(screen start, target start, length)`.
fn float_axis(c_pos: i32, c_len: i32, t_pos: i32, t_len: i32) -> (i32, i32, i32) {
    if c_pos < t_pos {
        let screen = t_pos - c_pos;
        (screen, 0, (c_len - screen).min(t_len))
    } else {
        let target = c_pos - t_pos;
        (0, target, (t_len - target).min(c_len))
    }
}

impl TileRenderer for TileGenerator<'_> {
    fn tile_image(&mut self, tile: usize, timing: &mut FrameTiming) -> CompositeResult<OwnedImage> {
        let (width, height) = self.tile_dims(tile)?;
        let mut image = OwnedImage::new(self.params.format, width, height);
        let placement = self.place(tile, timing)?;
        let start = Instant::now();
        if !placement.target.is_empty() {
            copy_region(self.rendered(), placement.screen, &mut image, placement.target)?;
        }
        image.clear_around_region(placement.target, self.params.background)?;
        timing.buffer_read += start.elapsed().as_secs_f64();
        Ok(image)
    }

    fn compressed_tile(
        &mut self,
        tile: usize,
        pool: &mut ScratchPool,
        timing: &mut FrameTiming,
    ) -> CompositeResult<SparseImage> {
        let (width, height) = self.tile_dims(tile)?;
        let buffer = pool.take(
            BufferKey::TileCompress,
            sparse_buffer_size(self.params.format, width, height),
        );
        let mut out = SparseImage::with_buffer(self.params.format, width, height, width * height, buffer);
        let placement = self.place(tile, timing)?;
        let target = placement.target;
        if target.is_empty() {
            return Ok(out);
        }
        let (tw, th) = (target.width as usize, target.height as usize);
        let (tx, ty) = (target.x.max(0) as usize, target.y.max(0) as usize);
        let padding = Padding {
            left: tx,
            right: width.saturating_sub(tw + tx),
            bottom: ty,
            top: height.saturating_sub(th + ty),
            full_width: width,
            full_height: height,
        };
        let start = Instant::now();
        compress_padded(self.rendered(), placement.screen, padding, self.params.mode, &mut out)?;
        timing.compress += start.elapsed().as_secs_f64();
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/render.rs"]
mod tests;
