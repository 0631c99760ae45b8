use crate::foundation::error::{CompositeError, CompositeResult};
use crate::image::sparse::SparseImage;

/// One contiguous piece of a split image.
#[derive(Clone, Debug)]
pub struct Partition {
    pub image: SparseImage,
    /// Pixel offset of the piece in the original image's index space.
    pub offset: usize,
}

/// Largest number of pixels a single partition can hold.
pub fn split_partition_num_pixels(
    input_num_pixels: usize,
    num_partitions: usize,
    eventual_num_partitions: usize,
) -> usize {
    let sub_partitions = eventual_num_partitions / num_partitions.max(1);
    input_num_pixels / num_partitions.max(1) + sub_partitions
}

fn check_counts(num_partitions: usize, eventual_num_partitions: usize) -> CompositeResult<()> {
    if num_partitions < 2 {
        return Err(CompositeError::invalid_value(format!(
            "splitting into {num_partitions} partitions makes no sense; at least 2 are needed"
        )));
    }
    if eventual_num_partitions == 0 || eventual_num_partitions % num_partitions != 0 {
        return Err(CompositeError::invalid_value(format!(
            "{num_partitions} partitions is not a factor of {eventual_num_partitions} eventual partitions"
        )));
    }
    Ok(())
}

/// Start offsets of each partition.
///
/// Sizes are multiples of `size / eventual` with the remainder handed out in
/// `eventual / num`-pixel portions, so splitting by `a` then by `b` lands on
/// the same boundaries as splitting by `a * b` directly.
pub(crate) fn partition_offsets(
    num_partitions: usize,
    eventual_num_partitions: usize,
    size: usize,
    first_offset: usize,
) -> Vec<usize> {
    let sub_partitions = eventual_num_partitions / num_partitions;
    let lower = (size / eventual_num_partitions) * sub_partitions;
    let mut remainder = size % eventual_num_partitions;
    let mut offset = first_offset;
    let mut offsets = Vec::with_capacity(num_partitions);
    for _ in 0..num_partitions {
        offsets.push(offset);
        offset += lower;
        let extra = remainder.min(sub_partitions);
        offset += extra;
        remainder -= extra;
    }
    offsets
}

fn partition_sizes(offsets: &[usize], total: usize, first_offset: usize) -> Vec<usize> {
    let end = first_offset + total;
    offsets
        .iter()
        .enumerate()
        .map(|(i, &o)| offsets.get(i + 1).copied().unwrap_or(end) - o)
        .collect()
}

/// Split `input` into `outputs.len()` partitions written to caller buffers.
///
/// `offset` is where `input` starts in the original image; the returned
/// offsets are in that same space. Each output becomes an `n x 1` image.
pub fn split_into(
    input: &SparseImage,
    offset: usize,
    eventual_num_partitions: usize,
    outputs: &mut [SparseImage],
) -> CompositeResult<Vec<usize>> {
    let num_partitions = outputs.len();
    check_counts(num_partitions, eventual_num_partitions)?;
    let offsets = partition_offsets(num_partitions, eventual_num_partitions, input.num_pixels(), offset);
    let sizes = partition_sizes(&offsets, input.num_pixels(), offset);
    let mut cursor = input.cursor();
    for (out, &size) in outputs.iter_mut().zip(&sizes) {
        input.format().ensure_same(out.format(), "split")?;
        let mut writer = out.take_writer();
        cursor.scan(size, Some(&mut writer))?;
        out.install(size, 1, writer)?;
    }
    Ok(offsets)
}

/// Split `input` into `num_partitions` freshly allocated pieces.
#[tracing::instrument(level = "trace", skip(input))]
pub fn split(
    input: &SparseImage,
    offset: usize,
    num_partitions: usize,
    eventual_num_partitions: usize,
) -> CompositeResult<Vec<Partition>> {
    check_counts(num_partitions, eventual_num_partitions)?;
    let cap = split_partition_num_pixels(input.num_pixels(), num_partitions, eventual_num_partitions);
    let mut outputs: Vec<SparseImage> = (0..num_partitions)
        .map(|_| SparseImage::with_capacity(input.format(), 0, 0, cap))
        .collect();
    let offsets = split_into(input, offset, eventual_num_partitions, &mut outputs)?;
    Ok(outputs
        .into_iter()
        .zip(offsets)
        .map(|(image, offset)| Partition { image, offset })
        .collect())
}

/// Split with the first partition reusing `image`'s own buffer.
///
/// `image` is truncated to partition 0; partitions `1..` are written to
/// `rest`, which must hold `num_partitions - 1` images.
pub fn split_in_place(
    image: &mut SparseImage,
    offset: usize,
    eventual_num_partitions: usize,
    rest: &mut [SparseImage],
) -> CompositeResult<Vec<usize>> {
    let num_partitions = rest.len() + 1;
    check_counts(num_partitions, eventual_num_partitions)?;
    let total = image.num_pixels();
    let offsets = partition_offsets(num_partitions, eventual_num_partitions, total, offset);
    let sizes = partition_sizes(&offsets, total, offset);

    let (cut, last_run, leftover) = {
        let mut cursor = image.cursor();
        cursor.scan(sizes[0], None)?;
        let state = (
            cursor.position(),
            cursor.last_run(),
            (cursor.inactive(), cursor.active()),
        );
        for (out, &size) in rest.iter_mut().zip(&sizes[1..]) {
            image.format().ensure_same(out.format(), "split")?;
            let mut writer = out.take_writer();
            cursor.scan(size, Some(&mut writer))?;
            out.install(size, 1, writer)?;
        }
        state
    };
    image.truncate_runs(sizes[0], cut, last_run, leftover)?;
    Ok(offsets)
}

#[cfg(test)]
#[path = "../../tests/unit/algebra/split.rs"]
mod tests;
