use super::*;

fn ks(info: &RadixkInfo) -> Vec<usize> {
    info.rounds.iter().map(|r| r.k).collect()
}

#[test]
fn factors_prefer_magic_k_then_nearby_divisors() {
    assert_eq!(ks(&RadixkInfo::new(8, 0, 8, usize::MAX).unwrap()), vec![8]);
    assert_eq!(ks(&RadixkInfo::new(16, 0, 8, usize::MAX).unwrap()), vec![8, 2]);
    assert_eq!(ks(&RadixkInfo::new(576, 0, 8, usize::MAX).unwrap()), vec![8, 8, 9]);
    assert_eq!(ks(&RadixkInfo::new(12, 0, 4, usize::MAX).unwrap()), vec![4, 3]);
    assert_eq!(ks(&RadixkInfo::new(509, 0, 8, usize::MAX).unwrap()), vec![509]);
}

#[test]
fn large_factor_found_above_twice_magic_k() {
    // 17 * 23: no divisor in [2, 8), 17 is found scanning upward.
    assert_eq!(ks(&RadixkInfo::new(391, 0, 4, usize::MAX).unwrap()), vec![17, 23]);
    // 17 * 19: the scan stops below the square root, so the product stays whole.
    assert_eq!(ks(&RadixkInfo::new(323, 0, 4, usize::MAX).unwrap()), vec![323]);
}

#[test]
fn single_process_is_one_trivial_round() {
    let info = RadixkInfo::new(1, 0, 8, 4).unwrap();
    assert_eq!(info.num_rounds(), 1);
    assert_eq!(info.rounds[0].k, 1);
    assert!(info.rounds[0].split && info.rounds[0].has_image);
    assert_eq!(info.final_partition_index(), Some(0));
    assert_eq!(info.total_partitions(), 1);
}

#[test]
fn partition_indices_and_steps() {
    let info = RadixkInfo::new(16, 13, 4, usize::MAX).unwrap();
    assert_eq!(info.rounds[0].step, 1);
    assert_eq!(info.rounds[0].partition_index, 1);
    assert_eq!(info.rounds[1].step, 4);
    assert_eq!(info.rounds[1].partition_index, 3);
    assert_eq!(info.final_partition_index(), Some(7));
    assert_eq!(info.group_rank_for_final_partition(7), 13);
    assert_eq!(info.total_partitions(), 16);
}

#[test]
fn max_split_turns_later_rounds_into_reductions() {
    let keeper = RadixkInfo::new(16, 1, 8, 8).unwrap();
    assert!(keeper.rounds[0].split);
    assert!(!keeper.rounds[1].split);
    assert!(keeper.rounds[1].has_image);
    assert_eq!(keeper.final_partition_index(), Some(1));
    assert_eq!(keeper.total_partitions(), 8);

    let dropped = RadixkInfo::new(16, 9, 8, 8).unwrap();
    assert!(!dropped.rounds[1].has_image);
    assert_eq!(dropped.final_partition_index(), None);
}

#[test]
fn split_stops_at_first_round_that_does_not_fit() {
    // 8 does not fit under 4, so the later 2 is not split either.
    let info = RadixkInfo::new(16, 0, 8, 4).unwrap();
    assert!(info.rounds.iter().all(|r| !r.split));
    assert_eq!(info.total_partitions(), 1);
}

#[test]
fn magic_k_below_two_is_rejected() {
    let err = RadixkInfo::new(8, 0, 1, 8).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidValue);
}
