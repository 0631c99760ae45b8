use crate::foundation::error::{CompositeError, CompositeResult};
use crate::foundation::math::{floor_log2, isqrt};
use crate::strategy::pivot::PivotIter;

/// What one rank does in one radix-k round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RoundInfo {
    /// Number of ranks exchanging with each other this round.
    pub k: usize,
    /// Distance in group rank between partners.
    pub step: usize,
    /// Whether the working image is split into `k` pieces.
    pub split: bool,
    /// Whether this rank still holds image data after the round.
    pub has_image: bool,
    /// Index of the piece this rank keeps, among the round's `k`.
    pub partition_index: usize,
}

/// Round schedule of one rank in a radix-k composite.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RadixkInfo {
    pub rounds: Vec<RoundInfo>,
}

fn choose_k(remaining: usize, magic_k: usize) -> usize {
    if remaining % magic_k == 0 {
        return magic_k;
    }
    if let Some(k) = PivotIter::new(2, magic_k, 2 * magic_k).find(|&k| remaining % k == 0) {
        return k;
    }
    // The smallest factor other than `remaining` itself is at most its square root.
    let max_k = isqrt(remaining);
    (2 * magic_k..max_k)
        .find(|&k| remaining % k == 0)
        .unwrap_or(remaining)
}

impl RadixkInfo {
    /// Factor `group_size` into rounds near `magic_k` and assign `group_rank`
    /// its partition in each.
    ///
    /// Rounds split the image while the running partition count stays within
    /// `max_image_split`; later rounds funnel whole images to partition 0.
    pub fn new(
        group_size: usize,
        group_rank: usize,
        magic_k: usize,
        max_image_split: usize,
    ) -> CompositeResult<Self> {
        if group_size < 2 {
            return Ok(Self {
                rounds: vec![RoundInfo {
                    k: 1,
                    step: 1,
                    split: true,
                    has_image: true,
                    partition_index: 0,
                }],
            });
        }
        if magic_k < 2 {
            return Err(CompositeError::invalid_value(format!(
                "magic k must be at least 2, got {magic_k}"
            )));
        }

        let max_rounds = floor_log2(group_size);
        let mut factors = Vec::with_capacity(max_rounds);
        let mut remaining = group_size;
        while remaining > 1 {
            let k = choose_k(remaining, magic_k);
            factors.push(k);
            remaining /= k;
            if factors.len() > max_rounds {
                return Err(CompositeError::sanity(
                    "radix-k produced more factors than possible",
                ));
            }
        }
        if factors.iter().product::<usize>() != group_size {
            return Err(CompositeError::sanity(format!(
                "product of radix-k factors {factors:?} is not {group_size}"
            )));
        }

        let mut rounds = Vec::with_capacity(factors.len());
        let mut total_partitions = 1usize;
        let mut step = 1usize;
        let mut splitting = true;
        for k in factors {
            let partition_index = (group_rank / step) % k;
            splitting = splitting && total_partitions.saturating_mul(k) <= max_image_split;
            if splitting {
                total_partitions *= k;
            }
            rounds.push(RoundInfo {
                k,
                step,
                split: splitting,
                has_image: splitting || partition_index == 0,
                partition_index,
            });
            step *= k;
        }
        Ok(Self { rounds })
    }

    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Index of the final piece this rank holds among all pieces, or `None`
    /// when it drops out in a non-splitting round.
    pub fn final_partition_index(&self) -> Option<usize> {
        let mut index = 0;
        for r in &self.rounds {
            if r.split {
                index = index * r.k + r.partition_index;
            } else if !r.has_image {
                return None;
            }
        }
        Some(index)
    }

    /// Number of pieces the image ends up split into.
    pub fn total_partitions(&self) -> usize {
        self.rounds.iter().filter(|r| r.split).map(|r| r.k).product()
    }

    /// Group rank that ends up holding final piece `partition_index`; the
    /// inverse of [`RadixkInfo::final_partition_index`].
    pub fn group_rank_for_final_partition(&self, partition_index: usize) -> usize {
        let mut remaining = partition_index;
        let mut group_rank = 0;
        for r in self.rounds.iter().rev().filter(|r| r.split) {
            group_rank += r.step * (remaining % r.k);
            remaining /= r.k;
        }
        group_rank
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/strategy/radixk/rounds.rs"]
mod tests;
