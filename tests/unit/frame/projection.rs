use super::*;

const GLOBAL: Viewport = Viewport::new(0, 0, 100, 100);

#[test]
fn projecting_the_global_viewport_is_identity() {
    assert_eq!(viewport_project(0, 0, 100, 100, GLOBAL), matrix::identity());
}

#[test]
fn quadrant_projection_stretches_its_corner_to_the_clip_cube() {
    let m = viewport_project(0, 0, 50, 50, GLOBAL);
    assert_eq!(matrix::vector_multiply(&m, [-1.0, -1.0, 0.0, 1.0]), [-1.0, -1.0, 0.0, 1.0]);
    assert_eq!(matrix::vector_multiply(&m, [0.0, 0.0, 0.0, 1.0]), [1.0, 1.0, 0.0, 1.0]);
}

#[test]
fn project_tile_without_size_correction() {
    let mut layout = TileLayout::new(0, 2);
    layout.add_tile(0, 0, 50, 100, 0).unwrap();
    layout.add_tile(50, 0, 50, 100, 1).unwrap();
    let global_proj = matrix::identity();
    let expected = viewport_project(50, 0, 50, 100, layout.global_viewport());
    assert_eq!(project_tile(&layout, 1, &global_proj).unwrap(), expected);
    assert!(project_tile(&layout, 2, &global_proj).is_err());
}

#[test]
fn box_projects_to_its_pixel_footprint() {
    let corners = bounding_box(-0.5, 0.5, -0.5, 0.5, -0.5, 0.5);
    assert_eq!(corners.len(), 8);
    let region = contained_region(&corners, &matrix::identity(), &matrix::identity(), GLOBAL);
    assert_eq!(region.viewport, Viewport::new(25, 25, 50, 50));
    assert_eq!(region.znear, -0.5);
    assert_eq!(region.zfar, 0.5);
}

#[test]
fn projection_is_clipped_to_the_global_viewport() {
    let corners = bounding_box(0.5, 2.0, -2.0, 2.0, 0.0, 0.0);
    let region = contained_region(&corners, &matrix::identity(), &matrix::identity(), GLOBAL);
    assert_eq!(region.viewport, Viewport::new(75, 0, 25, 100));
}

#[test]
fn contained_tiles_follow_overlap_and_depth() {
    let tiles = [
        Tile {
            viewport: Viewport::new(0, 0, 50, 100),
            display_rank: 0,
        },
        Tile {
            viewport: Viewport::new(50, 0, 50, 100),
            display_rank: 1,
        },
    ];
    let mut region = ContainedRegion {
        viewport: Viewport::new(25, 25, 20, 50),
        znear: -0.5,
        zfar: 0.5,
    };
    assert_eq!(contained_tiles(&region, &tiles), vec![true, false]);
    region.viewport = Viewport::new(40, 0, 20, 10);
    assert_eq!(contained_tiles(&region, &tiles), vec![true, true]);
    region.znear = 1.5;
    assert_eq!(contained_tiles(&region, &tiles), vec![false, false]);
}

#[test]
fn disjoint_viewports_intersect_to_the_placeholder() {
    assert_eq!(
        intersect_viewports(Viewport::new(0, 0, 10, 10), Viewport::new(20, 20, 5, 5)),
        EMPTY_VIEWPORT
    );
    assert_eq!(
        intersect_viewports(Viewport::new(0, 0, 10, 10), Viewport::new(5, 5, 10, 10)),
        Viewport::new(5, 5, 5, 5)
    );
}
