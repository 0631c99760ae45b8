/// Visits `pivot, pivot - 1, pivot + 1, pivot - 2, pivot + 2, ...`, skipping
/// anything outside `[low, high)`, until the whole range has been seen.
#[derive(Clone, Debug)]
pub(crate) struct PivotIter {
    low: isize,
    pivot: isize,
    high: isize,
    step: isize,
    max: isize,
}

impl PivotIter {
    pub fn new(low: usize, pivot: usize, high: usize) -> Self {
        let (low, pivot, high) = (low as isize, pivot as isize, high as isize);
        let span = if pivot < (high + low) / 2 {
            high - pivot
        } else {
            pivot - low + 1
        };
        Self {
            low,
            pivot,
            high,
            step: 1,
            max: 2 * span,
        }
    }
}

impl Iterator for PivotIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.step < self.max {
            let i = self.step;
            self.step += 1;
            let v = if i % 2 == 0 {
                self.pivot - i / 2
            } else {
                self.pivot + i / 2
            };
            if v >= self.low && v < self.high {
                return Some(v as usize);
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/strategy/pivot.rs"]
mod tests;
