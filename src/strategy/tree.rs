use crate::algebra::composite::composite_sparse;
use crate::comm::TAG_TREE_IMAGE;
use crate::comm::communicator::Communicator;
use crate::foundation::core::find_rank_in_group;
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::format::CompositeMode;
use crate::image::header::HEADER_SIZE;
use crate::image::pool::{BufferKey, ScratchPool};
use crate::image::sparse::{SparseImage, sparse_buffer_size};

struct TreeReduce<'a, C: Communicator + ?Sized> {
    comm: &'a C,
    mode: CompositeMode,
}

impl<C: Communicator + ?Sized> TreeReduce<'_, C> {
    fn send(&self, dest: usize, mut image: SparseImage) -> CompositeResult<SparseImage> {
        tracing::debug!(dest, "tree send");
        self.comm.send(dest, TAG_TREE_IMAGE, image.package_for_send()?)?;
        image.set_dimensions(0, 0)?;
        Ok(image)
    }

    fn receive(
        &self,
        pool: &mut ScratchPool,
        src: usize,
        local: SparseImage,
        local_in_front: bool,
    ) -> CompositeResult<SparseImage> {
        tracing::debug!(src, "tree receive");
        let incoming = SparseImage::unpackage_from_receive(&self.comm.recv(src, TAG_TREE_IMAGE)?)?;
        let format = local.format();
        let (w, h) = (local.width(), local.height());
        let buffer = pool.take(BufferKey::TreeComposite, sparse_buffer_size(format, w, h) - HEADER_SIZE);
        let mut result = SparseImage::with_buffer(format, 0, 0, w * h, buffer);
        if local_in_front {
            composite_sparse(&local, &incoming, self.mode, &mut result)?;
        } else {
            composite_sparse(&incoming, &local, self.mode, &mut result)?;
        }
        pool.give_back(BufferKey::TreeComposite, local.into_data());
        Ok(result)
    }

    /// Reduce `group` so the whole image lands on `dest` (a group index),
    /// or on group index 0 when `dest` lies outside this group.
    fn reduce(
        &self,
        pool: &mut ScratchPool,
        group: &[usize],
        group_rank: usize,
        dest: Option<usize>,
        image: SparseImage,
    ) -> CompositeResult<SparseImage> {
        if group.len() <= 1 {
            return Ok(image);
        }
        let middle = group.len() / 2;
        let (lower, upper) = group.split_at(middle);

        if group_rank < middle {
            let sub_dest = dest.filter(|&d| d < middle);
            let image = self.reduce(pool, lower, group_rank, sub_dest, image)?;
            if group_rank != sub_dest.unwrap_or(0) {
                return Ok(image);
            }
            match dest {
                Some(d) if d >= middle => self.send(group[d], image),
                _ => self.receive(pool, group[middle], image, true),
            }
        } else {
            let sub_dest = dest.filter(|&d| d >= middle).map(|d| d - middle);
            let image = self.reduce(pool, upper, group_rank - middle, sub_dest, image)?;
            if group_rank - middle != sub_dest.unwrap_or(0) {
                return Ok(image);
            }
            match dest {
                Some(d) if d < middle => self.send(group[d], image),
                Some(_) => self.receive(pool, group[0], image, false),
                None => self.send(group[0], image),
            }
        }
    }
}

/// Binary tree reduction of whole sparse images onto `group[image_dest]`.
///
/// Every other rank ends with a 0x0 image. The result offset is always 0.
#[tracing::instrument(level = "debug", skip_all, fields(group = group.len(), image_dest))]
pub(crate) fn tree_compose<C: Communicator + ?Sized>(
    comm: &C,
    pool: &mut ScratchPool,
    mode: CompositeMode,
    group: &[usize],
    image_dest: usize,
    input: SparseImage,
) -> CompositeResult<(SparseImage, usize)> {
    let group_rank = find_rank_in_group(group, comm.rank())
        .ok_or_else(|| CompositeError::sanity("local process not in compose group"))?;
    if image_dest >= group.len() {
        return Err(CompositeError::invalid_value(format!(
            "image destination {image_dest} outside a group of {}",
            group.len()
        )));
    }
    let tree = TreeReduce { comm, mode };
    let result = tree.reduce(pool, group, group_rank, Some(image_dest), input)?;
    Ok((result, 0))
}
