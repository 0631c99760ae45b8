use super::*;

#[test]
fn alternates_outward_from_the_pivot() {
    let order: Vec<usize> = PivotIter::new(2, 8, 16).collect();
    assert_eq!(order[..5], [8, 7, 9, 6, 10]);
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (2..16).collect::<Vec<_>>());
}

#[test]
fn clamps_at_the_edges() {
    assert_eq!(PivotIter::new(0, 0, 4).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(PivotIter::new(0, 3, 4).collect::<Vec<_>>(), vec![3, 2, 1, 0]);
    assert_eq!(PivotIter::new(0, 1, 4).collect::<Vec<_>>(), vec![1, 0, 2, 3]);
}

#[test]
fn single_element_range() {
    assert_eq!(PivotIter::new(5, 5, 6).collect::<Vec<_>>(), vec![5]);
}
