use crate::codec::Background;
use crate::codec::decompress::decompress_sub_image_correct_background;
use crate::comm::TAG_COLLECT;
use crate::comm::communicator::{Communicator, RecvRequest};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::dense::Image;
use crate::image::sparse::SparseImage;

const OFFSET_BYTES: usize = 8;

fn package_piece(piece: &SparseImage, offset: usize) -> CompositeResult<Vec<u8>> {
    let body = piece.package_for_send()?;
    let mut out = Vec::with_capacity(OFFSET_BYTES + body.len());
    out.extend_from_slice(&(offset as u64).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn unpackage_piece(bytes: &[u8]) -> CompositeResult<(SparseImage, usize)> {
    let Some((head, body)) = bytes.split_first_chunk::<OFFSET_BYTES>() else {
        return Err(CompositeError::sanity("collected piece is missing its offset"));
    };
    let offset = usize::try_from(u64::from_le_bytes(*head))
        .map_err(|_| CompositeError::sanity("collected piece offset does not fit in memory"))?;
    Ok((SparseImage::unpackage_from_receive(body)?, offset))
}

fn place_piece(
    piece: &SparseImage,
    offset: usize,
    output: &mut Image<'_>,
    background: &Background,
) -> CompositeResult<()> {
    if piece.num_pixels() == 0 {
        return Ok(());
    }
    if offset + piece.num_pixels() > output.num_pixels() {
        return Err(CompositeError::sanity(format!(
            "collected piece [{offset}, {}) overruns a {} pixel tile",
            offset + piece.num_pixels(),
            output.num_pixels()
        )));
    }
    decompress_sub_image_correct_background(piece, offset, output, background)
}

/// Gather every rank's composited piece onto `group[dest]`.
///
/// Each piece travels with its pixel offset and is decompressed, with
/// background correction, into `output` on the destination, which must
/// already have the tile's dimensions. Returns whether `output` was filled.
pub(crate) fn single_image_collect<C: Communicator + ?Sized>(
    comm: &C,
    group: &[usize],
    dest: usize,
    piece: &SparseImage,
    offset: usize,
    background: &Background,
    output: &mut Image<'_>,
) -> CompositeResult<bool> {
    let me = comm.rank();
    let dest_rank = *group.get(dest).ok_or_else(|| {
        CompositeError::invalid_value(format!("collect destination {dest} outside a group of {}", group.len()))
    })?;

    if me != dest_rank {
        comm.send(dest_rank, TAG_COLLECT, package_piece(piece, offset)?)?;
        return Ok(false);
    }

    place_piece(piece, offset, output, background)?;
    let mut requests: Vec<RecvRequest> = group
        .iter()
        .map(|&r| {
            if r == me {
                RecvRequest::null()
            } else {
                comm.irecv(r, TAG_COLLECT)
            }
        })
        .collect();
    for _ in 1..group.len() {
        let (index, bytes) = comm.wait_any(&mut requests)?;
        let (incoming, incoming_offset) = unpackage_piece(&bytes)?;
        tracing::debug!(
            from = group[index],
            offset = incoming_offset,
            pixels = incoming.num_pixels(),
            "collected piece"
        );
        place_piece(&incoming, incoming_offset, output, background)?;
    }
    Ok(true)
}
