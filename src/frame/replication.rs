//! Data replication groups: ranks holding identical geometry share the work
//! of covering the screen instead of each rendering everything.

use crate::foundation::core::{Viewport, find_rank_in_group};
use crate::foundation::error::{CompositeError, CompositeResult};
use crate::frame::projection::{ContainedRegion, contained_tiles};
use crate::frame::tiles::Tile;

/// Placeholder viewport for a replica left with nothing to draw.
const NOTHING: Viewport = Viewport::new(-10_000, -10_000, 0, 0);

/// Validate a replication group for `rank`.
pub(crate) fn check_group(group: &[usize], rank: usize, num_processes: usize) -> CompositeResult<()> {
    if find_rank_in_group(group, rank).is_none() {
        return Err(CompositeError::invalid_value(
            "local process not part of data replication group",
        ));
    }
    if let Some(&bad) = group.iter().find(|&&r| r >= num_processes) {
        return Err(CompositeError::invalid_value(format!(
            "rank {bad} in data replication group is out of range"
        )));
    }
    Ok(())
}

/// Ranks whose color equals `colors[rank]`, in rank order.
pub(crate) fn group_from_colors(colors: &[i32], rank: usize) -> Vec<usize> {
    let mine = colors[rank];
    colors
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == mine)
        .map(|(r, _)| r)
        .collect()
}

/// Shrink this rank's responsibility when it shares geometry with `group`.
///
/// With at least as many replicas as touched tiles, each replica takes a
/// slice of one tile, and a replica displaying a touched tile renders that
/// tile. With fewer replicas the contained viewport itself is split.
/// Returns the new contained viewport and tile mask.
pub(crate) fn adjust_for_replication(
    rank: usize,
    group: &[usize],
    tiles: &[Tile],
    contained: Viewport,
    mask: Vec<bool>,
) -> (Viewport, Vec<bool>) {
    if group.len() <= 1 {
        return (contained, mask);
    }
    let mut group = group.to_vec();
    let mut contained_list: Vec<usize> = (0..tiles.len()).filter(|&t| mask[t]).collect();

    if group.len() >= contained_list.len() {
        let mut tile_rendering: Option<usize> = None;
        let mut num_rendering_tile = 0usize;
        let mut allocation = 0usize;

        if let Some((list_index, group_index)) = contained_list
            .iter()
            .enumerate()
            .find_map(|(i, &t)| find_rank_in_group(&group, tiles[t].display_rank).map(|g| (i, g)))
        {
            if group[group_index] == rank {
                tile_rendering = Some(contained_list[list_index]);
                num_rendering_tile = 1;
                allocation = 0;
            }
            contained_list.swap_remove(list_index);
            group.swap_remove(group_index);
        }

        if !contained_list.is_empty() {
            let mut per_tile = 0usize;
            let mut tile_index = 0usize;
            for &member in &group {
                if tile_index >= contained_list.len() {
                    tile_index = 0;
                    per_tile += 1;
                }
                if member == rank {
                    tile_rendering = Some(contained_list[tile_index]);
                    allocation = per_tile;
                    num_rendering_tile = per_tile + 1;
                } else if tile_rendering == Some(contained_list[tile_index]) {
                    num_rendering_tile += 1;
                }
                tile_index += 1;
            }
        }

        let new_mask = (0..tiles.len()).map(|t| Some(t) == tile_rendering).collect();
        let viewport = match tile_rendering {
            Some(t) => {
                let tv = tiles[t].viewport;
                let piece = tv.width / num_rendering_tile as i32;
                let x = tv.x + allocation as i32 * piece;
                let width = if allocation + 1 == num_rendering_tile {
                    tv.width - allocation as i32 * piece
                } else {
                    piece
                };
                Viewport::new(x, tv.y, width, tv.height)
            }
            None => NOTHING,
        };
        return (viewport, new_mask);
    }

    let mut viewport = contained;
    let mut size = group.len();
    let mut start = 0usize;
    let mut factor = 2usize;
    while factor <= size {
        while size % factor != 0 {
            factor += 1;
        }
        let split_y = viewport.width < viewport.height;
        let length = if split_y { viewport.height } else { viewport.width };
        let piece_len = length / factor as i32;
        let group_rank = find_rank_in_group(&group[start..start + size], rank).unwrap_or(0);
        size /= factor;
        let piece = group_rank / size;
        start += piece * size;
        let offset = piece as i32 * piece_len;
        let new_len = if piece == factor - 1 { length - offset } else { piece_len };
        if split_y {
            viewport.y += offset;
            viewport.height = new_len;
        } else {
            viewport.x += offset;
            viewport.width = new_len;
        }
    }
    let region = ContainedRegion {
        viewport,
        znear: 0.0,
        zfar: 0.0,
    };
    (viewport, contained_tiles(&region, tiles))
}

#[cfg(test)]
#[path = "../../tests/unit/frame/replication.rs"]
mod tests;
