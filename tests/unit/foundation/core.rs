use super::*;

#[test]
fn intersect_clamps_disjoint_to_empty() {
    let a = Viewport::new(0, 0, 10, 10);
    let b = Viewport::new(20, 5, 4, 4);
    let i = a.intersect(b);
    assert!(i.is_empty());
    assert_eq!(i.num_pixels(), 0);

    let c = Viewport::new(5, 5, 10, 10);
    assert_eq!(a.intersect(c), Viewport::new(5, 5, 5, 5));
}

#[test]
fn overlap_is_strict_at_edges() {
    let a = Viewport::new(0, 0, 10, 10);
    assert!(!a.overlaps(Viewport::new(10, 0, 5, 5)));
    assert!(a.overlaps(Viewport::new(9, 9, 5, 5)));
    assert!(a.contains(Viewport::new(2, 2, 8, 8)));
    assert!(!a.contains(Viewport::new(2, 2, 9, 8)));
}

#[test]
fn background_word_rounds_down() {
    assert_eq!(color_to_rgba8([1.0, 0.5, 0.0, 1.0]), [255, 127, 0, 255]);
    assert!(color_is_black([0.0, 0.0, 0.0, 0.0]));
    assert!(!color_is_black([0.0, 0.0, 0.1, 0.0]));
}

#[test]
fn permutation_check_rejects_duplicates() {
    assert!(check_permutation(&[2, 0, 1], 3).is_ok());
    assert!(check_permutation(&[0, 0, 1], 3).is_err());
    assert!(check_permutation(&[0, 3, 1], 3).is_err());
    assert!(check_permutation(&[0, 1], 3).is_err());
    assert_eq!(find_rank_in_group(&[4, 7, 9], 9), Some(2));
    assert_eq!(find_rank_in_group(&[4, 7, 9], 5), None);
}
