use std::time::Instant;

use crate::codec::Background;
use crate::comm::communicator::{Communicator, CountingComm};
use crate::foundation::config::{CompositeConfig, Strategy};
use crate::foundation::core::{Color, Viewport, check_permutation};
use crate::foundation::error::{CompositeError, CompositeResult, ErrorKind, Warning};
use crate::frame::draw::DrawCallback;
use crate::frame::matrix::{self, Matrix};
use crate::frame::projection::{
    ContainedRegion, bounding_box, contained_region, contained_tiles, intersect_viewports,
};
use crate::frame::render::{DrawSource, RenderParams, TileGenerator};
use crate::frame::replication::{adjust_for_replication, check_group, group_from_colors};
use crate::frame::tiles::TileLayout;
use crate::frame::timing::{FrameStats, FrameTiming};
use crate::image::dense::{Image, OwnedImage};
use crate::image::format::{ColorFormat, CompositeMode, DepthFormat};
use crate::image::pool::{PoolStats, ScratchPool, ScratchPoolOpts};
use crate::strategy::direct::direct_compose;
use crate::strategy::sequential::sequential_compose;
use crate::strategy::{ComposeParams, FrameTiles, ValidPixels};

/// Non-fatal findings of one frame.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
    /// Screen area this rank was responsible for after data replication.
    pub contained_viewport: Viewport,
    /// Tiles this rank drew into.
    pub contained_tiles: Vec<bool>,
}

/// Everything a frame leaves on this rank.
#[derive(Debug)]
pub struct FrameOutput {
    /// The displayed tile when collecting, otherwise this rank's piece placed
    /// in a tile-sized image. 0x0 when the rank holds nothing.
    pub image: OwnedImage,
    pub valid_pixels: ValidPixels,
    pub stats: FrameStats,
    pub diagnostics: Diagnostics,
}

/// One rank's compositing session.
///
/// Holds the configuration, the tiled display, geometry bounds and scratch
/// buffers across frames. Every rank of the communicator must build a
/// context with the same configuration and tiles and draw frames in lockstep.
pub struct Context<'c, C: Communicator + ?Sized> {
    comm: &'c C,
    config: CompositeConfig,
    layout: TileLayout,
    pool: ScratchPool,
    draw_callback: Option<Box<dyn DrawCallback + 'c>>,
    bounds: Vec<[f64; 3]>,
    replication_group: Vec<usize>,
    composite_order: Vec<usize>,
    process_orders: Vec<usize>,
    render_buffer: OwnedImage,
    frame_count: u64,
    last_error: Option<ErrorKind>,
}

impl<'c, C: Communicator + ?Sized> Context<'c, C> {
    pub fn new(comm: &'c C, config: CompositeConfig) -> CompositeResult<Self> {
        config.validate()?;
        let (rank, size) = (comm.rank(), comm.size());
        Ok(Self {
            comm,
            config,
            layout: TileLayout::new(rank, size),
            pool: ScratchPool::new(ScratchPoolOpts::default()),
            draw_callback: None,
            bounds: Vec::new(),
            replication_group: vec![rank],
            composite_order: (0..size).collect(),
            process_orders: (0..size).collect(),
            render_buffer: OwnedImage::null(),
            frame_count: 0,
            last_error: None,
        })
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Frames drawn so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Kind of the error that failed the most recent frame, if it failed.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn add_tile(&mut self, x: i32, y: i32, width: i32, height: i32, display_rank: usize) -> CompositeResult<usize> {
        self.layout.add_tile(x, y, width, height, display_rank)
    }

    pub fn reset_tiles(&mut self) {
        self.layout.reset();
    }

    pub fn set_physical_render_size(&mut self, width: i32, height: i32) -> Option<Warning> {
        self.layout.set_physical_render_size(width, height)
    }

    pub fn set_draw_callback(&mut self, callback: impl DrawCallback + 'c) {
        self.draw_callback = Some(Box::new(callback));
    }

    /// Bound the geometry by an axis-aligned box in object space.
    pub fn bounding_box(&mut self, x_min: f64, x_max: f64, y_min: f64, y_max: f64, z_min: f64, z_max: f64) {
        self.bounds = bounding_box(x_min, x_max, y_min, y_max, z_min, z_max);
    }

    /// Bound the geometry by the convex hull of `vertices`.
    pub fn bounding_vertices(&mut self, vertices: &[[f64; 3]]) {
        self.bounds = vertices.to_vec();
    }

    /// Forget the bounds; the geometry is assumed to cover the whole display.
    pub fn clear_bounds(&mut self) {
        self.bounds.clear();
    }

    /// Ranks holding the same geometry as this one.
    pub fn data_replication_group(&mut self, group: &[usize]) -> CompositeResult<()> {
        check_group(group, self.comm.rank(), self.comm.size())?;
        self.replication_group = group.to_vec();
        Ok(())
    }

    /// Form replication groups from ranks passing the same `color`.
    ///
    /// Collective: every rank must call it.
    pub fn data_replication_group_color(&mut self, color: i32) -> CompositeResult<()> {
        let gathered = self.comm.allgather(&color.to_le_bytes())?;
        let colors = gathered
            .iter()
            .map(|bytes| {
                let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    CompositeError::transport(format!("replication color of {} bytes", bytes.len()))
                })?;
                Ok(i32::from_le_bytes(raw))
            })
            .collect::<CompositeResult<Vec<i32>>>()?;
        self.replication_group = group_from_colors(&colors, self.comm.rank());
        Ok(())
    }

    pub fn replication_group(&self) -> &[usize] {
        &self.replication_group
    }

    /// Front-to-back order of ranks used by ordered compositing.
    pub fn composite_order(&mut self, order: &[usize]) -> CompositeResult<()> {
        check_permutation(order, self.comm.size())?;
        self.composite_order = order.to_vec();
        for (position, &rank) in order.iter().enumerate() {
            self.process_orders[rank] = position;
        }
        Ok(())
    }

    /// Position of each rank in the composite order, indexed by rank.
    pub fn process_orders(&self) -> &[usize] {
        &self.process_orders
    }

    pub fn set_formats(&mut self, color: ColorFormat, depth: DepthFormat) -> CompositeResult<()> {
        let candidate = CompositeConfig {
            color_format: color,
            depth_format: depth,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.config = candidate;
        self.render_buffer = OwnedImage::null();
        Ok(())
    }

    pub fn set_composite_mode(&mut self, mode: CompositeMode) -> CompositeResult<()> {
        let candidate = CompositeConfig {
            composite_mode: mode,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }

    /// Render through the draw callback and composite the result.
    ///
    /// Collective: every rank must call it.
    #[tracing::instrument(level = "debug", skip_all, fields(rank = self.comm.rank(), frame = self.frame_count + 1))]
    pub fn draw_frame(&mut self, projection: &Matrix, modelview: &Matrix, background: Color) -> CompositeResult<FrameOutput> {
        let result = self.do_frame(None, *projection, *modelview, background, Vec::new());
        self.finish(result)
    }

    /// Composite buffers the caller already rendered at the global viewport
    /// size.
    ///
    /// `valid_viewport` limits the pixels taken from the buffers. Without
    /// matrices any geometry bounds are dropped for this and later frames.
    #[tracing::instrument(level = "debug", skip_all, fields(rank = self.comm.rank(), frame = self.frame_count + 1))]
    pub fn composite_image(
        &mut self,
        color: &[u8],
        depth: &[u8],
        valid_viewport: Option<Viewport>,
        projection: Option<&Matrix>,
        modelview: Option<&Matrix>,
        background: Color,
    ) -> CompositeResult<FrameOutput> {
        let mut warnings = Vec::new();
        let (projection, modelview) = match (projection, modelview) {
            (Some(p), Some(m)) => (*p, *m),
            (Some(p), None) => {
                warnings.push(Warning::raise(
                    ErrorKind::InvalidValue,
                    "drawing with a projection matrix but no modelview matrix",
                ));
                (*p, matrix::identity())
            }
            (None, Some(m)) => {
                warnings.push(Warning::raise(
                    ErrorKind::InvalidValue,
                    "drawing with a modelview matrix but no projection matrix",
                ));
                (matrix::identity(), *m)
            }
            (None, None) => {
                if !self.bounds.is_empty() {
                    warnings.push(Warning::raise(
                        ErrorKind::InvalidValue,
                        "geometry bounds were given but no projection matrices; clearing the bounds",
                    ));
                    self.bounds.clear();
                }
                (matrix::identity(), matrix::identity())
            }
        };
        let global = self.layout.global_viewport();
        let format = self.config.pixel_format();
        let depth = if self.config.composited_depth() != self.config.depth_format { &[][..] } else { depth };
        let result = Image::from_buffers(
            format,
            global.width.max(0) as usize,
            global.height.max(0) as usize,
            color,
            depth,
        )
        .and_then(|prerendered| {
            let valid = valid_viewport.map(|v| Viewport::new(v.x + global.x, v.y + global.y, v.width, v.height));
            self.do_frame(Some((&prerendered, valid)), projection, modelview, background, warnings)
        });
        self.finish(result)
    }

    fn finish(&mut self, result: CompositeResult<FrameOutput>) -> CompositeResult<FrameOutput> {
        self.last_error = result.as_ref().err().map(CompositeError::kind);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "frame failed");
        }
        result
    }

    fn do_frame(
        &mut self,
        prerendered: Option<(&Image<'_>, Option<Viewport>)>,
        projection: Matrix,
        modelview: Matrix,
        background: Color,
        mut warnings: Vec<Warning>,
    ) -> CompositeResult<FrameOutput> {
        let start = Instant::now();
        if self.layout.num_tiles() == 0 {
            return Err(CompositeError::invalid_operation("no tiles defined for the frame"));
        }
        let source = match (prerendered, self.draw_callback.as_deref_mut()) {
            (Some((image, _)), _) => DrawSource::Prerendered(image),
            (None, Some(callback)) => DrawSource::Callback(callback),
            (None, None) => {
                return Err(CompositeError::invalid_operation(
                    "drawing function not set; set a draw callback or composite a pre-rendered image",
                ));
            }
        };

        if self.config.composited_depth() != self.config.depth_format {
            warnings.push(Warning::raise(
                ErrorKind::InvalidValue,
                "Z buffer ignored: blend mode composites color only",
            ));
        }

        let (rank, size) = (self.comm.rank(), self.comm.size());
        let mut timing = FrameTiming::default();
        let background = Background::for_mode(
            self.config.composite_mode,
            background,
            self.config.correct_colored_background,
        );
        self.frame_count += 1;

        let global = self.layout.global_viewport();
        let mut region = if self.bounds.is_empty() {
            ContainedRegion::whole(global)
        } else {
            contained_region(&self.bounds, &projection, &modelview, global)
        };
        if let Some((_, Some(valid))) = prerendered {
            region.viewport = intersect_viewports(valid, region.viewport);
        }
        let mask = contained_tiles(&region, self.layout.tiles());
        let (contained, mask) =
            adjust_for_replication(rank, &self.replication_group, self.layout.tiles(), region.viewport, mask);
        tracing::debug!(?contained, ?mask, "contained tiles");

        let masks = if self.config.strategy == Strategy::Sequential {
            let mut masks = vec![Vec::new(); size];
            masks[rank] = mask.clone();
            masks
        } else {
            let local: Vec<u8> = mask.iter().map(|&b| u8::from(b)).collect();
            self.comm
                .allgather(&local)?
                .into_iter()
                .map(|bytes| bytes.into_iter().map(|b| b != 0).collect())
                .collect()
        };

        let frame = FrameTiles {
            tiles: self.layout.tiles(),
            contained: &masks,
            composite_order: self.config.ordered_composite.then_some(self.composite_order.as_slice()),
            background,
            format: self.config.pixel_format(),
            collect_images: self.config.collect_images,
        };
        let mut generator = TileGenerator::new(
            source,
            &self.layout,
            contained,
            &mask,
            RenderParams {
                projection,
                modelview,
                background: background.working,
                mode: self.config.composite_mode,
                format: self.config.pixel_format(),
                floating_viewport: self.config.floating_viewport,
                render_empty_images: self.config.render_empty_images,
            },
            &mut self.render_buffer,
        );

        let comm = CountingComm::new(self.comm);
        let output = match self.config.strategy {
            Strategy::Sequential => sequential_compose(
                &comm,
                &mut self.pool,
                &ComposeParams::from_config(&self.config),
                &frame,
                &mut timing,
                &mut generator,
            )?,
            Strategy::Direct => direct_compose(
                &comm,
                &mut self.pool,
                self.config.composite_mode,
                &frame,
                &mut timing,
                &mut generator,
            )?,
        };
        warnings.extend(output.warnings);

        let valid_tile = output.valid_pixels.tile;
        if self.config.collect_images && valid_tile != self.layout.displayed_tile() {
            return Err(CompositeError::sanity(format!(
                "got unexpected tile {valid_tile:?} from strategy, expected {:?}",
                self.layout.displayed_tile()
            )));
        }
        if let Some(tile) = valid_tile {
            let vp = self.layout.tile(tile)?.viewport;
            if (vp.width as usize, vp.height as usize) != (output.image.width(), output.image.height()) {
                return Err(CompositeError::sanity(format!(
                    "got unexpected image size {}x{} from strategy for a {}x{} tile",
                    output.image.width(),
                    output.image.height(),
                    vp.width,
                    vp.height
                )));
            }
        }

        timing.total = start.elapsed().as_secs_f64();
        timing.compose = timing.total - timing.render - timing.buffer_read;
        let stats = FrameStats {
            frame: self.frame_count,
            bytes_sent: comm.bytes_sent(),
            timing,
        };
        tracing::debug!(frame = stats.frame, bytes_sent = stats.bytes_sent, total = timing.total, "frame done");

        Ok(FrameOutput {
            image: output.image,
            valid_pixels: output.valid_pixels,
            stats,
            diagnostics: Diagnostics {
                warnings,
                contained_viewport: contained,
                contained_tiles: mask,
            },
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/context.rs"]
mod tests;
