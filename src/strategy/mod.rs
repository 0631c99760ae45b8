//! Compositing strategies.
//!
//! Single-image strategies composite one image across a group and leave each
//! rank with a piece of it. Multi-tile strategies drive whole frames: they
//! decide who renders which tile and how the results reach display ranks.

pub(crate) mod collect;
pub(crate) mod direct;
pub(crate) mod pivot;
pub(crate) mod radixk;
pub(crate) mod sequential;
pub(crate) mod tree;

use crate::codec::Background;
use crate::comm::communicator::Communicator;
use crate::foundation::config::{CompositeConfig, SingleImageStrategy};
use crate::foundation::error::{CompositeResult, Warning};
use crate::frame::tiles::Tile;
use crate::frame::timing::FrameTiming;
use crate::image::dense::OwnedImage;
use crate::image::format::{CompositeMode, PixelFormat};
use crate::image::pool::ScratchPool;
use crate::image::sparse::SparseImage;

/// Knobs a single-image compose reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComposeParams {
    pub mode: CompositeMode,
    pub strategy: SingleImageStrategy,
    pub magic_k: usize,
    pub max_image_split: usize,
    pub interlace_images: bool,
    pub telescope: bool,
}

impl ComposeParams {
    pub fn from_config(config: &CompositeConfig) -> Self {
        Self {
            mode: config.composite_mode,
            strategy: config.single_image_strategy,
            magic_k: config.effective_magic_k(),
            max_image_split: config.max_image_split,
            interlace_images: config.interlace_images,
            telescope: config.telescope,
        }
    }
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self::from_config(&CompositeConfig::default())
    }
}

/// Which tile and pixel range of it this rank holds after a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidPixels {
    pub tile: Option<usize>,
    pub offset: usize,
    pub num_pixels: usize,
}

/// Composite `input` across `group` with the configured single-image
/// strategy.
///
/// `image_dest` indexes into `group` and names the rank that should end up
/// with data when the strategy funnels to one rank. Returns this rank's piece
/// and its offset in the image.
pub fn single_image_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    params: &ComposeParams,
    group: &[usize],
    image_dest: usize,
    input: SparseImage,
) -> CompositeResult<(SparseImage, usize)> {
    match params.strategy {
        SingleImageStrategy::Tree => tree::tree_compose(comm, pool, params.mode, group, image_dest, input),
        SingleImageStrategy::Bswap => {
            let params = ComposeParams {
                magic_k: 2,
                ..*params
            };
            radixk::radixk_compose(comm, pool, &params, group, image_dest, input)
        }
        SingleImageStrategy::Radixk | SingleImageStrategy::Automatic => {
            radixk::radixk_compose(comm, pool, params, group, image_dest, input)
        }
    }
}

/// Per-frame facts a multi-tile strategy works from.
pub(crate) struct FrameTiles<'a> {
    pub tiles: &'a [Tile],
    /// `contained[rank][tile]`: whether `rank` draws anything into `tile`.
    pub contained: &'a [Vec<bool>],
    pub composite_order: Option<&'a [usize]>,
    pub background: Background,
    pub format: PixelFormat,
    pub collect_images: bool,
}

impl FrameTiles<'_> {
    pub(crate) fn tile_dims(&self, tile: usize) -> (usize, usize) {
        let vp = self.tiles[tile].viewport;
        (vp.width.max(0) as usize, vp.height.max(0) as usize)
    }

    /// Ranks in compositing order.
    pub(crate) fn compose_group(&self, size: usize) -> Vec<usize> {
        match self.composite_order {
            Some(order) => order.to_vec(),
            None => (0..size).collect(),
        }
    }

    pub(crate) fn contributes(&self, rank: usize, tile: usize) -> bool {
        self.contained
            .get(rank)
            .and_then(|mask| mask.get(tile))
            .copied()
            .unwrap_or(false)
    }
}

/// What a multi-tile strategy leaves on this rank.
#[derive(Debug)]
pub(crate) struct StrategyOutput {
    pub image: OwnedImage,
    pub valid_pixels: ValidPixels,
    pub warnings: Vec<Warning>,
}

/// Produces this rank's image of a tile.
pub(crate) trait TileRenderer {
    /// The tile as a dense image, cleared to the background outside the
    /// region this rank drew.
    fn tile_image(&mut self, tile: usize, timing: &mut FrameTiming) -> CompositeResult<OwnedImage>;

    fn compressed_tile(
        &mut self,
        tile: usize,
        pool: &mut ScratchPool,
        timing: &mut FrameTiming,
    ) -> CompositeResult<SparseImage>;
}
