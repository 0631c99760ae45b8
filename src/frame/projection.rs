//! Screen-space reasoning: tile projections and where geometry bounds land
//! on the tiled display.

use crate::foundation::core::Viewport;
use crate::foundation::error::CompositeResult;
use crate::frame::matrix::{self, Matrix};
use crate::frame::tiles::{Tile, TileLayout};

/// Viewport placeholder for "nothing", far off-screen so it overlaps no tile.
pub const EMPTY_VIEWPORT: Viewport = Viewport::new(-1_000_000, -1_000_000, 0, 0);

/// Projection that maps the normalized device coordinates of `global` onto
/// the sub-rectangle `(x, y, width, height)`.
pub fn viewport_project(x: i32, y: i32, width: i32, height: i32, global: Viewport) -> Matrix {
    let (w, h) = (f64::from(width), f64::from(height));
    let mut m = matrix::identity();
    m[0] = f64::from(global.width) / w;
    m[5] = f64::from(global.height) / h;
    m[12] = f64::from(global.width + 2 * global.x - 2 * x - width) / w;
    m[13] = f64::from(global.height + 2 * global.y - 2 * y - height) / h;
    m
}

/// Projection that renders `tile` of the global view.
///
/// When the physical render buffer is larger than the tile, the tile lands
/// in the buffer's lower-left corner.
pub fn project_tile(layout: &TileLayout, tile: usize, global_projection: &Matrix) -> CompositeResult<Matrix> {
    let vp = layout.tile(tile)?.viewport;
    let tile_proj = viewport_project(vp.x, vp.y, vp.width, vp.height, layout.global_viewport());
    let (pw, ph) = layout.physical_render_size();
    let tile_proj = if (pw, ph) != (vp.width, vp.height) {
        let correction = matrix::ortho(
            -1.0,
            2.0 * f64::from(pw) / f64::from(vp.width) - 1.0,
            -1.0,
            2.0 * f64::from(ph) / f64::from(vp.height) - 1.0,
            1.0,
            -1.0,
        );
        matrix::multiply(&correction, &tile_proj)
    } else {
        tile_proj
    };
    Ok(matrix::multiply(&tile_proj, global_projection))
}

/// Overlap of two viewports, or [`EMPTY_VIEWPORT`] when they do not overlap.
pub fn intersect_viewports(a: Viewport, b: Viewport) -> Viewport {
    let v = a.intersect(b);
    if v.is_empty() { EMPTY_VIEWPORT } else { v }
}

/// The eight corners of an axis-aligned box.
pub fn bounding_box(x_min: f64, x_max: f64, y_min: f64, y_max: f64, z_min: f64, z_max: f64) -> Vec<[f64; 3]> {
    let mut corners = Vec::with_capacity(8);
    for x in [x_min, x_max] {
        for y in [y_min, y_max] {
            for z in [z_min, z_max] {
                corners.push([x, y, z]);
            }
        }
    }
    corners
}

/// Screen area and normalized depth range covered by projected geometry.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ContainedRegion {
    pub viewport: Viewport,
    pub znear: f64,
    pub zfar: f64,
}

impl ContainedRegion {
    /// Everything: used when no bounds are known.
    pub fn whole(global: Viewport) -> Self {
        Self {
            viewport: global,
            znear: -1.0,
            zfar: 1.0,
        }
    }
}

/// Project bounding `vertices` to find the pixels and depths they cover.
///
/// Vertices behind the near plane are replaced by the intersections of the
/// near plane with their segments to every vertex in front of it.
pub fn contained_region(
    vertices: &[[f64; 3]],
    projection: &Matrix,
    modelview: &Matrix,
    global: Viewport,
) -> ContainedRegion {
    let (gw, gh) = (f64::from(global.width), f64::from(global.height));
    let mut to_viewport = [0.0; 16];
    to_viewport[0] = gw;
    to_viewport[5] = gh;
    to_viewport[10] = 2.0;
    to_viewport[12] = gw + f64::from(global.x) * 2.0;
    to_viewport[13] = gh + f64::from(global.y) * 2.0;
    to_viewport[15] = 2.0;
    let total = matrix::multiply(&to_viewport, &matrix::multiply(projection, modelview));

    let transformed: Vec<[f64; 4]> = vertices
        .iter()
        .map(|v| matrix::vector_multiply(&total, [v[0], v[1], v[2], 1.0]))
        .collect();
    let in_front = |v: &[f64; 4]| v[2] + v[3] >= 0.0;

    let mut left = f64::from(global.right());
    let mut right = f64::from(global.x);
    let mut bottom = f64::from(global.top());
    let mut top = f64::from(global.y);
    let mut znear = 1.0f64;
    let mut zfar = -1.0f64;
    let mut include = |x: f64, y: f64| {
        left = left.min(x);
        right = right.max(x);
        bottom = bottom.min(y);
        top = top.max(y);
    };

    for vert in &transformed {
        if in_front(vert) {
            let inv_w = 1.0 / vert[3];
            include(vert[0] * inv_w, vert[1] * inv_w);
            let z = vert[2] * inv_w;
            znear = znear.min(z);
            zfar = zfar.max(z);
        } else {
            for other in transformed.iter().filter(|o| in_front(o)) {
                let t = (other[2] + other[3]) / (other[2] - vert[2] + other[3] - vert[3]);
                let inv_w = 1.0 / ((vert[3] - other[3]) * t + other[3]);
                include(
                    ((vert[0] - other[0]) * t + other[0]) * inv_w,
                    ((vert[1] - other[1]) * t + other[1]) * inv_w,
                );
                znear = -1.0;
            }
        }
    }

    let left = left.floor().max(f64::from(global.x));
    let right = right.ceil().min(f64::from(global.right()));
    let bottom = bottom.floor().max(f64::from(global.y));
    let top = top.ceil().min(f64::from(global.top()));
    ContainedRegion {
        viewport: Viewport::new(left as i32, bottom as i32, (right - left) as i32, (top - bottom) as i32),
        znear: znear.max(-1.0),
        zfar: zfar.min(1.0),
    }
}

/// Which tiles `region` touches, as a mask over `tiles`.
pub fn contained_tiles(region: &ContainedRegion, tiles: &[Tile]) -> Vec<bool> {
    let in_depth = region.znear <= 1.0 && region.zfar >= -1.0;
    tiles
        .iter()
        .map(|t| in_depth && region.viewport.overlaps(t.viewport))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/frame/projection.rs"]
mod tests;
