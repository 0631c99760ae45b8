use std::time::Instant;

use crate::codec::composite::correct_background;
use crate::codec::decompress::{compressed_composite, decompress_image};
use crate::comm::TAG_DIRECT_IMAGE;
use crate::comm::communicator::{Communicator, RecvRequest};
use crate::foundation::error::CompositeResult;
use crate::frame::timing::FrameTiming;
use crate::image::dense::OwnedImage;
use crate::image::format::CompositeMode;
use crate::image::pool::{BufferKey, ScratchPool};
use crate::image::sparse::SparseImage;
use crate::strategy::{FrameTiles, StrategyOutput, TileRenderer, ValidPixels};

/// Fold tile images into the display rank's accumulator, the first one by
/// plain decompression and later ones underneath.
struct Accumulator {
    image: OwnedImage,
    mode: CompositeMode,
    empty: bool,
}

impl Accumulator {
    /// Seed with this rank's own dense tile image.
    fn start_with(&mut self, image: OwnedImage) {
        self.image = image;
        self.empty = false;
    }

    fn add(&mut self, sparse: &SparseImage, frame: &FrameTiles<'_>) -> CompositeResult<()> {
        if std::mem::take(&mut self.empty) {
            decompress_image(sparse, &mut self.image, frame.background.working)
        } else {
            compressed_composite(&mut self.image, sparse, self.mode, false)
        }
    }
}

/// Every contributing rank sends its tile image straight to the tile's
/// display rank, which composites them.
#[tracing::instrument(level = "debug", skip_all, fields(tiles = frame.tiles.len()))]
pub(crate) fn direct_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    mode: CompositeMode,
    frame: &FrameTiles<'_>,
    timing: &mut FrameTiming,
    renderer: &mut dyn TileRenderer,
) -> CompositeResult<StrategyOutput> {
    let me = comm.rank();

    for (index, tile) in frame.tiles.iter().enumerate() {
        if tile.display_rank == me || !frame.contributes(me, index) {
            continue;
        }
        let rendered = renderer.compressed_tile(index, pool, timing)?;
        tracing::debug!(tile = index, dest = tile.display_rank, "direct send");
        comm.send(tile.display_rank, TAG_DIRECT_IMAGE, rendered.package_for_send()?)?;
        pool.give_back(BufferKey::TileCompress, rendered.into_data());
    }

    let Some(display_tile) = frame.tiles.iter().position(|t| t.display_rank == me) else {
        return Ok(StrategyOutput {
            image: OwnedImage::null(),
            valid_pixels: ValidPixels::default(),
            warnings: Vec::new(),
        });
    };
    let (width, height) = frame.tile_dims(display_tile);
    let contributors: Vec<usize> = frame
        .compose_group(comm.size())
        .into_iter()
        .filter(|&r| frame.contributes(r, display_tile))
        .collect();
    tracing::debug!(tile = display_tile, ?contributors, "direct receive");

    let mut acc = Accumulator {
        image: OwnedImage::new(frame.format, width, height),
        mode,
        empty: true,
    };
    if contributors.is_empty() {
        acc.image.clear(frame.background.true_color)?;
    } else {
        let start = Instant::now();
        if frame.composite_order.is_some() {
            for (position, &r) in contributors.iter().enumerate() {
                if r == me && position == 0 {
                    acc.start_with(renderer.tile_image(display_tile, timing)?);
                    continue;
                }
                let sparse = if r == me {
                    renderer.compressed_tile(display_tile, pool, timing)?
                } else {
                    SparseImage::unpackage_from_receive(&comm.recv(r, TAG_DIRECT_IMAGE)?)?
                };
                acc.add(&sparse, frame)?;
                pool.give_back(BufferKey::DirectComposite, sparse.into_data());
            }
        } else {
            if contributors.contains(&me) {
                acc.start_with(renderer.tile_image(display_tile, timing)?);
            }
            let mut requests: Vec<RecvRequest> = contributors
                .iter()
                .map(|&r| {
                    if r == me {
                        RecvRequest::null()
                    } else {
                        comm.irecv(r, TAG_DIRECT_IMAGE)
                    }
                })
                .collect();
            for _ in 0..requests.iter().filter(|r| r.is_pending()).count() {
                let (_, bytes) = comm.wait_any(&mut requests)?;
                acc.add(&SparseImage::unpackage_from_receive(&bytes)?, frame)?;
            }
        }
        correct_background(&mut acc.image, &frame.background)?;
        timing.blend += start.elapsed().as_secs_f64();
    }

    Ok(StrategyOutput {
        image: acc.image,
        valid_pixels: ValidPixels {
            tile: Some(display_tile),
            offset: 0,
            num_pixels: width * height,
        },
        warnings: Vec::new(),
    })
}
