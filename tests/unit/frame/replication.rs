use super::*;

fn tile(x: i32, y: i32, w: i32, h: i32, display_rank: usize) -> Tile {
    Tile {
        viewport: Viewport::new(x, y, w, h),
        display_rank,
    }
}

#[test]
fn singleton_group_changes_nothing() {
    let tiles = [tile(0, 0, 10, 10, 0)];
    let vp = Viewport::new(1, 2, 3, 4);
    assert_eq!(adjust_for_replication(0, &[0], &tiles, vp, vec![true]), (vp, vec![true]));
}

#[test]
fn display_rank_in_group_renders_its_tile_alone() {
    let tiles = [tile(0, 0, 100, 10, 0)];
    let vp = Viewport::new(0, 0, 100, 10);
    let group = [0, 1, 2, 3];
    assert_eq!(
        adjust_for_replication(0, &group, &tiles, vp, vec![true]),
        (Viewport::new(0, 0, 100, 10), vec![true])
    );
    let (other, mask) = adjust_for_replication(2, &group, &tiles, vp, vec![true]);
    assert!(other.is_empty());
    assert_eq!(mask, vec![false]);
}

#[test]
fn replicas_share_tiles_in_slices() {
    let tiles = [tile(0, 0, 90, 10, 5), tile(90, 0, 90, 10, 6)];
    let vp = Viewport::new(0, 0, 180, 10);
    let group = [0, 1, 2];
    let mask = vec![true, true];
    assert_eq!(
        adjust_for_replication(0, &group, &tiles, vp, mask.clone()),
        (Viewport::new(0, 0, 45, 10), vec![true, false])
    );
    assert_eq!(
        adjust_for_replication(1, &group, &tiles, vp, mask.clone()),
        (Viewport::new(90, 0, 90, 10), vec![false, true])
    );
    assert_eq!(
        adjust_for_replication(2, &group, &tiles, vp, mask),
        (Viewport::new(45, 0, 45, 10), vec![true, false])
    );
}

#[test]
fn fewer_replicas_than_tiles_split_the_viewport() {
    let tiles = [
        tile(0, 0, 50, 50, 0),
        tile(50, 0, 50, 50, 1),
        tile(0, 50, 50, 50, 2),
        tile(50, 50, 50, 50, 3),
    ];
    let vp = Viewport::new(0, 0, 100, 100);
    let (left, left_mask) = adjust_for_replication(0, &[0, 1], &tiles, vp, vec![true; 4]);
    assert_eq!(left, Viewport::new(0, 0, 50, 100));
    assert_eq!(left_mask, vec![true, false, true, false]);
    let (right, right_mask) = adjust_for_replication(1, &[0, 1], &tiles, vp, vec![true; 4]);
    assert_eq!(right, Viewport::new(50, 0, 50, 100));
    assert_eq!(right_mask, vec![false, true, false, true]);
}

#[test]
fn groups_are_validated_and_built_from_colors() {
    assert!(check_group(&[0, 2], 2, 4).is_ok());
    assert!(check_group(&[0, 1], 2, 4).is_err());
    assert!(check_group(&[2, 7], 2, 4).is_err());
    assert_eq!(group_from_colors(&[3, 1, 3, 2], 2), vec![0, 2]);
}
