use std::time::Instant;

use crate::codec::decompress::decompress_sub_image_correct_background;
use crate::comm::communicator::Communicator;
use crate::foundation::core::find_rank_in_group;
use crate::foundation::error::{CompositeError, CompositeResult, ErrorKind, Warning};
use crate::frame::timing::FrameTiming;
use crate::image::dense::OwnedImage;
use crate::image::pool::{BufferKey, ScratchPool};
use crate::strategy::collect::single_image_collect;
use crate::strategy::{
    ComposeParams, FrameTiles, StrategyOutput, TileRenderer, ValidPixels, single_image_compose,
};

/// Composite the tiles one after another, each with every rank, using the
/// single-image strategy and sending the result to the tile's display rank.
#[tracing::instrument(level = "debug", skip_all, fields(tiles = frame.tiles.len()))]
pub(crate) fn sequential_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    params: &ComposeParams,
    frame: &FrameTiles<'_>,
    timing: &mut FrameTiming,
    renderer: &mut dyn TileRenderer,
) -> CompositeResult<StrategyOutput> {
    let me = comm.rank();
    let mut warnings = Vec::new();
    let mut collect = frame.collect_images;
    if !collect && frame.tiles.len() > 1 {
        warnings.push(Warning::raise(
            ErrorKind::InvalidOperation,
            "sequential strategy must collect images with more than one tile",
        ));
        collect = true;
    }

    let group = frame.compose_group(comm.size());
    let mut image = OwnedImage::null();
    let mut valid_pixels = ValidPixels::default();

    for (index, tile) in frame.tiles.iter().enumerate() {
        let display = tile.display_rank;
        let image_dest = find_rank_in_group(&group, display).ok_or_else(|| {
            CompositeError::sanity(format!("display rank {display} missing from the compose group"))
        })?;
        let (width, height) = frame.tile_dims(index);
        tracing::debug!(tile = index, display_rank = tile.display_rank, width, height, "sequential tile");

        let rendered = renderer.compressed_tile(index, pool, timing)?;
        let start = Instant::now();
        let (piece, offset) = single_image_compose(comm, pool, params, &group, image_dest, rendered)?;
        timing.compose += start.elapsed().as_secs_f64();

        if collect {
            let start = Instant::now();
            if display == me {
                let mut tile_image = OwnedImage::new(frame.format, width, height);
                single_image_collect(comm, &group, image_dest, &piece, offset, &frame.background, &mut tile_image)?;
                image = tile_image;
                valid_pixels = ValidPixels {
                    tile: Some(index),
                    offset: 0,
                    num_pixels: width * height,
                };
            } else {
                let mut unused = OwnedImage::new(frame.format, 0, 0);
                single_image_collect(comm, &group, image_dest, &piece, offset, &frame.background, &mut unused)?;
            }
            timing.collect += start.elapsed().as_secs_f64();
        } else if piece.num_pixels() > 0 {
            let mut tile_image = OwnedImage::new(frame.format, width, height);
            decompress_sub_image_correct_background(&piece, offset, &mut tile_image, &frame.background)?;
            valid_pixels = ValidPixels {
                tile: Some(index),
                offset,
                num_pixels: piece.num_pixels(),
            };
            image = tile_image;
        } else {
            image = OwnedImage::null();
            valid_pixels = ValidPixels::default();
        }
        pool.give_back(BufferKey::TileCompress, piece.into_data());
    }

    Ok(StrategyOutput {
        image,
        valid_pixels,
        warnings,
    })
}
