//! One radix-k compose over a fixed group: per-round splits, exchanges and
//! the binary-tree reduction of arriving pieces.

use crate::algebra::composite::composite_sparse;
use crate::algebra::split::{split_into, split_partition_num_pixels};
use crate::comm::TAG_RADIXK_SWAP;
use crate::comm::communicator::{Communicator, RecvRequest, SendRequest};
use crate::foundation::core::find_rank_in_group;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::CompositeMode;
use crate::image::header::HEADER_SIZE;
use crate::image::pool::{BufferKey, ScratchPool};
use crate::image::sparse::{SparseImage, sparse_buffer_size};
use crate::strategy::pivot::PivotIter;
use crate::strategy::radixk::rounds::{RadixkInfo, RoundInfo};

/// Incoming pieces of one round, paired up as a binary tree by slot index.
///
/// A slot's level counts the composites folded into it. Two slots only merge
/// when they sit at the same level, so the pairing depends on slot indices and
/// never on arrival order.
struct Reduction {
    images: Vec<Option<SparseImage>>,
    levels: Vec<Option<u32>>,
}

impl Reduction {
    fn new(k: usize) -> Self {
        Self {
            images: vec![None; k],
            levels: vec![None; k],
        }
    }

    fn k(&self) -> usize {
        self.images.len()
    }

    fn place(&mut self, index: usize, image: SparseImage) {
        self.images[index] = Some(image);
        self.levels[index] = Some(0);
    }

    fn done(&self) -> bool {
        self.levels[0].is_some_and(|l| (1usize << l) >= self.k())
    }

    /// Merge everything that can merge starting from `index`; returns whether
    /// the whole round is reduced into slot 0.
    fn try_composite(
        &mut self,
        mut index: usize,
        mode: CompositeMode,
        pool: &mut ScratchPool,
    ) -> CompositeResult<bool> {
        let k = self.k();
        loop {
            let level = self.levels[index].ok_or_else(|| {
                CompositeError::sanity(format!("radix-k slot {index} composited before arriving"))
            })?;
            let dist = 1usize << level;
            let subtree = dist << 1;
            let (front, back) = if index % subtree == 0 {
                if index + dist >= k {
                    if index == 0 {
                        break;
                    }
                    self.levels[index] = Some(level + 1);
                    continue;
                }
                (index, index + dist)
            } else {
                (index - dist, index)
            };
            if self.levels[front] != self.levels[back] {
                break;
            }

            let (Some(f), Some(b)) = (self.images[front].take(), self.images[back].take()) else {
                return Err(CompositeError::sanity("radix-k slot lost its image"));
            };
            let buffer = pool.take(
                BufferKey::RadixkComposite,
                sparse_buffer_size(f.format(), f.num_pixels(), 1) - HEADER_SIZE,
            );
            let mut dest = SparseImage::with_buffer(f.format(), 0, 0, f.num_pixels(), buffer);
            composite_sparse(&f, &b, mode, &mut dest)?;
            pool.give_back(BufferKey::RadixkComposite, f.into_data());
            pool.give_back(BufferKey::RadixkComposite, b.into_data());

            self.images[front] = Some(dest);
            self.levels[front] = Some(level + 1);
            self.levels[back] = None;
            index = front;
        }
        Ok(self.done())
    }
}

/// Ranks exchanging with `group_rank` in `round`, as indices into `group`.
fn partner_group_ranks(round: &RoundInfo, group_rank: usize) -> impl Iterator<Item = usize> {
    let span = round.step * round.k;
    let first = group_rank % round.step + (group_rank / span) * span;
    let step = round.step;
    (0..round.k).map(move |i| first + i * step)
}

/// Composite `working` across `group` following the round schedule in
/// `info`.
///
/// Returns the piece this rank ends up with and its pixel offset in the
/// (possibly interlaced) image. Ranks that drop out return a 0x0 image.
pub(crate) fn basic_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    mode: CompositeMode,
    info: &RadixkInfo,
    group: &[usize],
    total_partitions: usize,
    mut working: SparseImage,
) -> CompositeResult<(SparseImage, usize)> {
    let group_rank = find_rank_in_group(group, comm.rank())
        .ok_or_else(|| CompositeError::sanity("local process not in compose group"))?;
    if group.len() == 1 {
        return Ok((working, 0));
    }
    if info.rounds.is_empty() {
        return Err(CompositeError::sanity("radix-k has no rounds"));
    }

    let format = working.format();
    let mut my_offset = 0usize;
    let mut remaining_partitions = total_partitions;

    for (round_index, round) in info.rounds.iter().enumerate() {
        let tag = TAG_RADIXK_SWAP + round_index as u32;
        let partners: Vec<usize> = partner_group_ranks(round, group_rank)
            .map(|g| group[g])
            .collect();
        tracing::debug!(
            round = round_index,
            k = round.k,
            split = round.split,
            has_image = round.has_image,
            ?partners,
            "radix-k round"
        );

        let mut receives: Vec<RecvRequest> = if round.has_image {
            partners
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    if i == round.partition_index {
                        RecvRequest::null()
                    } else {
                        comm.irecv(p, tag)
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut reduction = Reduction::new(round.k);
        let mut sends: Vec<SendRequest> = Vec::new();
        if round.split {
            let capacity =
                split_partition_num_pixels(working.num_pixels(), round.k, remaining_partitions);
            let mut pieces: Vec<SparseImage> = (0..round.k)
                .map(|_| {
                    let buffer = pool.take(
                        BufferKey::RadixkPiece,
                        sparse_buffer_size(format, capacity, 1) - HEADER_SIZE,
                    );
                    SparseImage::with_buffer(format, 0, 0, capacity, buffer)
                })
                .collect();
            let offsets = split_into(&working, my_offset, remaining_partitions, &mut pieces)?;
            pool.give_back(BufferKey::RadixkPiece, working.into_data());

            let mut mine = None;
            let mut pieces: Vec<Option<SparseImage>> = pieces.into_iter().map(Some).collect();
            for i in PivotIter::new(0, round.partition_index, round.k) {
                let Some(piece) = pieces[i].take() else { continue };
                if i == round.partition_index {
                    mine = Some(piece);
                } else {
                    sends.push(comm.isend(partners[i], tag, piece.package_for_send()?)?);
                    pool.give_back(BufferKey::RadixkPiece, piece.into_data());
                }
            }
            let mine = mine.ok_or_else(|| CompositeError::sanity("radix-k lost its own piece"))?;
            my_offset = offsets[round.partition_index];
            reduction.place(round.partition_index, mine);
        } else if round.has_image {
            reduction.place(round.partition_index, working);
        } else {
            sends.push(comm.isend(partners[0], tag, working.package_for_send()?)?);
            comm.wait_all(&sends)?;
            working.set_dimensions(0, 0)?;
            return Ok((working, 0));
        }

        let (width, height) = reduction.images[round.partition_index]
            .as_ref()
            .map(|img| (img.width(), img.height()))
            .unwrap_or((0, 0));
        let mut done = reduction.try_composite(round.partition_index, mode, pool)?;
        while !done {
            let (index, bytes) = comm.wait_any(&mut receives)?;
            let incoming = SparseImage::unpackage_from_receive(&bytes)?;
            if incoming.width() != width || incoming.height() != height {
                return Err(CompositeError::sanity(format!(
                    "radix-k received a {}x{} image, expected {width}x{height}",
                    incoming.width(),
                    incoming.height()
                )));
            }
            reduction.place(index, incoming);
            done = reduction.try_composite(index, mode, pool)?;
        }
        comm.wait_all(&sends)?;

        working = reduction.images[0]
            .take()
            .ok_or_else(|| CompositeError::sanity("radix-k round finished without a result"))?;
        if round.split {
            remaining_partitions /= round.k;
        }
    }

    Ok((working, my_offset))
}
