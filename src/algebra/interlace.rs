use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::bit_reverse;
use crate::image::runs::RunCursor;
use crate::image::sparse::{SparseImage, copy_sparse_pixels};

fn interlaced_index(original: usize, eventual_num_partitions: usize) -> usize {
    let index = bit_reverse(original, eventual_num_partitions);
    if index >= eventual_num_partitions {
        original
    } else {
        index
    }
}

fn partition_size(index: usize, lower: usize, remainder: usize) -> usize {
    lower + usize::from(index < remainder)
}

/// Reorder the pixels of `input` so that a later split into
/// `eventual_num_partitions` pieces samples the image evenly.
///
/// The image is cut into `eventual_num_partitions` contiguous pieces which
/// are written back in bit-reversed order. Dimensions are preserved.
pub fn interlace(
    input: &SparseImage,
    eventual_num_partitions: usize,
    output: &mut SparseImage,
) -> CompositeResult<()> {
    if eventual_num_partitions < 2 {
        return copy_sparse_pixels(input, 0, input.num_pixels(), output);
    }
    input.format().ensure_same(output.format(), "interlace")?;

    let n = input.num_pixels();
    let lower = n / eventual_num_partitions;
    let remainder = n % eventual_num_partitions;

    let mut starts: Vec<Option<RunCursor<'_>>> = vec![None; eventual_num_partitions];
    let mut cursor = input.cursor();
    for original in 0..eventual_num_partitions {
        let index = interlaced_index(original, eventual_num_partitions);
        let size = partition_size(index, lower, remainder);
        starts[index] = Some(cursor.clone());
        if original + 1 < eventual_num_partitions {
            cursor.scan(size, None)?;
        }
    }

    let mut writer = output.take_writer();
    for (index, start) in starts.into_iter().enumerate() {
        let mut start = start.ok_or_else(|| {
            CompositeError::sanity(format!("interlaced partition {index} never located"))
        })?;
        start.scan(partition_size(index, lower, remainder), Some(&mut writer))?;
    }
    output.install(input.width(), input.height(), writer)
}

/// Pixel offset in the original image of interlaced partition `partition`.
pub fn interlace_offset(
    partition: usize,
    eventual_num_partitions: usize,
    original_image_size: usize,
) -> CompositeResult<usize> {
    if partition >= eventual_num_partitions {
        return Err(CompositeError::invalid_value(format!(
            "partition {partition} is out of range for {eventual_num_partitions} partitions"
        )));
    }
    let lower = original_image_size / eventual_num_partitions;
    let remainder = original_image_size % eventual_num_partitions;
    let mut offset = 0;
    for original in 0..eventual_num_partitions {
        let index = interlaced_index(original, eventual_num_partitions);
        if index == partition {
            return Ok(offset);
        }
        offset += partition_size(index, lower, remainder);
    }
    Err(CompositeError::sanity(format!(
        "could not find interlaced partition {partition}"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/algebra/interlace.rs"]
mod tests;
