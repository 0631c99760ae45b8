//! Radix-k compositing: the group is factored into rounds of `k` ranks that
//! each split their image and swap pieces, so every rank finishes with a
//! fully composited slice of the image.

pub(crate) mod exchange;
pub(crate) mod rounds;
pub(crate) mod telescope;

use crate::algebra::interlace::{interlace, interlace_offset};
use crate::comm::communicator::Communicator;
use crate::foundation::core::find_rank_in_group;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::floor_pow2;
use crate::image::header::HEADER_SIZE;
use crate::image::pool::{BufferKey, ScratchPool};
use crate::image::sparse::{SparseImage, sparse_buffer_size};
use crate::strategy::ComposeParams;

use exchange::basic_compose;
use rounds::RadixkInfo;
use telescope::{telescope_compose, telescope_main_group};

/// Interlace `input` for `partitions` eventual pieces into a pooled buffer.
fn interlace_pooled(
    pool: &mut ScratchPool,
    input: SparseImage,
    partitions: usize,
) -> CompositeResult<SparseImage> {
    let format = input.format();
    let n = input.num_pixels();
    let buffer = pool.take(BufferKey::Interlace, sparse_buffer_size(format, n, 1) - HEADER_SIZE);
    let mut output = SparseImage::with_buffer(format, 0, 0, n, buffer);
    interlace(&input, partitions, &mut output)?;
    pool.give_back(BufferKey::Interlace, input.into_data());
    Ok(output)
}

/// Composite `input` across `group` with radix-k.
///
/// Returns this rank's piece and its pixel offset in the original image
/// order. Ranks that hold no piece get a 0x0 image.
#[tracing::instrument(level = "debug", skip_all, fields(group = group.len(), magic_k = params.magic_k))]
pub(crate) fn radixk_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    params: &ComposeParams,
    group: &[usize],
    image_dest: usize,
    input: SparseImage,
) -> CompositeResult<(SparseImage, usize)> {
    let me = comm.rank();
    let original_size = input.num_pixels();

    if params.telescope {
        let main_size = floor_pow2(group.len());
        let total = RadixkInfo::new(main_size, 0, params.magic_k, params.max_image_split)?
            .total_partitions();
        let use_interlace = params.interlace_images && total > params.magic_k;
        let working = if use_interlace {
            interlace_pooled(pool, input, total)?
        } else {
            input
        };
        let (piece, offset) =
            telescope_compose(comm, pool, params, group, image_dest, total, working)?;
        if !use_interlace || piece.num_pixels() == 0 {
            return Ok((piece, offset));
        }
        let main_group = telescope_main_group(group, image_dest);
        let main_rank = find_rank_in_group(main_group, me)
            .ok_or_else(|| CompositeError::sanity("telescoped piece outside the main group"))?;
        let partition = RadixkInfo::new(main_size, main_rank, params.magic_k, total)?
            .final_partition_index()
            .ok_or_else(|| CompositeError::sanity("telescoped piece without a partition"))?;
        return Ok((piece, interlace_offset(partition, total, original_size)?));
    }

    let group_rank = find_rank_in_group(group, me)
        .ok_or_else(|| CompositeError::sanity("local process not in compose group"))?;
    let info = RadixkInfo::new(group.len(), group_rank, params.magic_k, params.max_image_split)?;
    let total = info.total_partitions();
    let use_interlace = params.interlace_images && info.num_rounds() > 1;
    let working = if use_interlace {
        interlace_pooled(pool, input, total)?
    } else {
        input
    };

    let (piece, offset) = basic_compose(comm, pool, params.mode, &info, group, total, working)?;
    if !use_interlace || piece.num_pixels() == 0 {
        return Ok((piece, offset));
    }
    let partition = info
        .final_partition_index()
        .ok_or_else(|| CompositeError::sanity("radix-k piece without a partition"))?;
    Ok((piece, interlace_offset(partition, total, original_size)?))
}
