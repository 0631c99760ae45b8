//! Radix-k for group sizes that are not a power of two.
//!
//! The group is cut into a power-of-two main group and the remainder. The
//! remainder composites among itself (telescoping again as needed) and then
//! hands its pieces to the main group ranks holding the matching partitions.

use crate::algebra::composite::composite_sparse;
use crate::algebra::split::split_into;
use crate::comm::TAG_RADIXK_TELESCOPE;
use crate::comm::communicator::Communicator;
use crate::foundation::core::find_rank_in_group;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::floor_pow2;
use crate::image::header::HEADER_SIZE;
use crate::image::pool::{BufferKey, ScratchPool};
use crate::image::sparse::{SparseImage, sparse_buffer_size};
use crate::strategy::ComposeParams;
use crate::strategy::radixk::exchange::basic_compose;
use crate::strategy::radixk::rounds::RadixkInfo;

fn rank_in(group: &[usize], rank: usize) -> CompositeResult<usize> {
    find_rank_in_group(group, rank)
        .ok_or_else(|| CompositeError::sanity(format!("rank {rank} is not in its telescope group")))
}

/// The rank of `upper_group` that sends its piece to `my_rank` of
/// `my_group`, or `None` when `my_rank` ends up without a piece.
pub fn telescope_upper_group_sender(
    my_group: &[usize],
    my_rank: usize,
    upper_group: &[usize],
    magic_k: usize,
    max_image_split: usize,
) -> CompositeResult<Option<usize>> {
    let info = RadixkInfo::new(my_group.len(), rank_in(my_group, my_rank)?, magic_k, max_image_split)?;
    let Some(my_partition) = info.final_partition_index() else {
        return Ok(None);
    };
    let my_partitions = info.total_partitions();

    let upper = RadixkInfo::new(floor_pow2(upper_group.len()), 0, magic_k, max_image_split)?;
    let upper_partitions = upper.total_partitions();
    if my_partitions < upper_partitions {
        return Err(CompositeError::sanity(format!(
            "telescope group with {my_partitions} partitions cannot receive {upper_partitions}"
        )));
    }
    let factor = my_partitions / upper_partitions;
    let sender = upper.group_rank_for_final_partition(my_partition / factor);
    Ok(Some(upper_group[sender]))
}

/// The ranks of `lower_group` that `my_rank` of `my_group` sends its piece
/// to, in partition order.
pub fn telescope_lower_group_receivers(
    lower_group: &[usize],
    my_group: &[usize],
    my_rank: usize,
    magic_k: usize,
    max_image_split: usize,
) -> CompositeResult<Vec<usize>> {
    let info = RadixkInfo::new(my_group.len(), rank_in(my_group, my_rank)?, magic_k, max_image_split)?;
    let my_partitions = info.total_partitions();
    let Some(my_partition) = info.final_partition_index() else {
        return Ok(Vec::new());
    };

    let lower = RadixkInfo::new(lower_group.len(), 0, magic_k, max_image_split)?;
    let num_receivers = lower.total_partitions() / my_partitions;
    let first = my_partition * num_receivers;
    Ok((first..first + num_receivers)
        .map(|p| lower_group[lower.group_rank_for_final_partition(p)])
        .collect())
}

/// Parameters shared by every level of one telescoped compose.
struct Telescope<'a, C: Communicator + ?Sized> {
    comm: &'a C,
    params: &'a ComposeParams,
    /// Split cap pinned to the main group's partition count.
    max_split: usize,
    total_partitions: usize,
}

impl<C: Communicator + ?Sized> Telescope<'_, C> {
    /// Composite within `my_group`, then fold in the piece from
    /// `upper_group` if one is sent here.
    fn compose_receive(
        &self,
        pool: &mut ScratchPool,
        my_group: &[usize],
        upper_group: &[usize],
        local_in_front: bool,
        input: SparseImage,
    ) -> CompositeResult<(SparseImage, usize)> {
        let me = self.comm.rank();
        let info = RadixkInfo::new(
            my_group.len(),
            rank_in(my_group, me)?,
            self.params.magic_k,
            self.max_split,
        )?;
        let (working, offset) = basic_compose(
            self.comm,
            pool,
            self.params.mode,
            &info,
            my_group,
            self.total_partitions,
            input,
        )?;

        let sender = if upper_group.is_empty() {
            None
        } else {
            telescope_upper_group_sender(my_group, me, upper_group, self.params.magic_k, self.max_split)?
        };
        let Some(sender) = sender else {
            return Ok((working, offset));
        };

        tracing::debug!(sender, "receiving telescoped piece");
        let bytes = self.comm.recv(sender, TAG_RADIXK_TELESCOPE)?;
        let incoming = SparseImage::unpackage_from_receive(&bytes)?;
        if incoming.num_pixels() != working.num_pixels() {
            return Err(CompositeError::sanity(format!(
                "telescoped piece has {} pixels, expected {}",
                incoming.num_pixels(),
                working.num_pixels()
            )));
        }
        let format = working.format();
        let n = working.num_pixels();
        let buffer = pool.take(BufferKey::Telescope, sparse_buffer_size(format, n, 1) - HEADER_SIZE);
        let mut result = SparseImage::with_buffer(format, 0, 0, n, buffer);
        if local_in_front {
            composite_sparse(&working, &incoming, self.params.mode, &mut result)?;
        } else {
            composite_sparse(&incoming, &working, self.params.mode, &mut result)?;
        }
        pool.give_back(BufferKey::Telescope, working.into_data());
        Ok((result, offset))
    }

    /// Composite `my_group` and ship the result down to `lower_group`.
    fn compose_send(
        &self,
        pool: &mut ScratchPool,
        lower_group: &[usize],
        my_group: &[usize],
        input: SparseImage,
    ) -> CompositeResult<()> {
        let me = self.comm.rank();
        let main_size = floor_pow2(my_group.len());
        let (main_group, sub_group) = my_group.split_at(main_size);

        if find_rank_in_group(main_group, me).is_none() {
            return self.compose_send(pool, main_group, sub_group, input);
        }

        let (working, piece_offset) = self.compose_receive(pool, main_group, sub_group, true, input)?;
        let local_partitions =
            RadixkInfo::new(main_size, 0, self.params.magic_k, self.max_split)?.total_partitions();
        let receivers = telescope_lower_group_receivers(
            lower_group,
            main_group,
            me,
            self.params.magic_k,
            self.max_split,
        )?;
        tracing::debug!(?receivers, "sending telescoped pieces");

        let mut sends = Vec::with_capacity(receivers.len());
        match receivers.as_slice() {
            [] => return Ok(()),
            [only] => {
                sends.push(self.comm.isend(*only, TAG_RADIXK_TELESCOPE, working.package_for_send()?)?);
            }
            many => {
                let format = working.format();
                let capacity = working.num_pixels() / many.len() + 1;
                let mut pieces: Vec<SparseImage> = many
                    .iter()
                    .map(|_| {
                        let buffer = pool.take(
                            BufferKey::RadixkPiece,
                            sparse_buffer_size(format, capacity, 1) - HEADER_SIZE,
                        );
                        SparseImage::with_buffer(format, 0, 0, capacity, buffer)
                    })
                    .collect();
                split_into(
                    &working,
                    piece_offset,
                    self.total_partitions / local_partitions,
                    &mut pieces,
                )?;
                for (piece, &receiver) in pieces.into_iter().zip(many) {
                    sends.push(self.comm.isend(receiver, TAG_RADIXK_TELESCOPE, piece.package_for_send()?)?);
                    pool.give_back(BufferKey::RadixkPiece, piece.into_data());
                }
            }
        }
        self.comm.wait_all(&sends)?;
        pool.give_back(BufferKey::RadixkComposite, working.into_data());
        Ok(())
    }
}

/// Radix-k over a group of any size, telescoping the non-power-of-two
/// remainder into the power-of-two main group.
///
/// Returns the piece this rank holds and its offset in the image as it was
/// composited, before any interlace correction. Ranks outside the main group
/// always end with a 0x0 image.
pub(crate) fn telescope_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    params: &ComposeParams,
    group: &[usize],
    image_dest: usize,
    total_partitions: usize,
    input: SparseImage,
) -> CompositeResult<(SparseImage, usize)> {
    let main_size = floor_pow2(group.len());
    let sub_size = group.len() - main_size;
    // Keep the image destination in the main group so it holds data.
    let (main_group, sub_group, main_in_front) = if image_dest < main_size {
        (&group[..main_size], &group[main_size..], true)
    } else {
        (&group[sub_size..], &group[..sub_size], false)
    };

    let telescope = Telescope {
        comm,
        params,
        max_split: total_partitions,
        total_partitions,
    };
    if find_rank_in_group(main_group, comm.rank()).is_some() {
        telescope.compose_receive(pool, main_group, sub_group, main_in_front, input)
    } else {
        let format = input.format();
        telescope.compose_send(pool, main_group, sub_group, input)?;
        Ok((SparseImage::null(format), 0))
    }
}

/// Power-of-two group that ends up holding the telescoped result.
pub(crate) fn telescope_main_group(group: &[usize], image_dest: usize) -> &[usize] {
    let main_size = floor_pow2(group.len());
    if image_dest < main_size {
        &group[..main_size]
    } else {
        &group[group.len() - main_size..]
    }
}
