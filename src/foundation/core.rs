use crate::foundation::error::{CompositeError, CompositeResult};

/// RGBA background color with channels in `[0, 1]`.
pub type Color = [f32; 4];

/// Axis-aligned pixel rectangle. `x`/`y` address the lower-left corner.
///
/// Signed so that far off-screen placeholders can be represented while
/// reducing work for data replication groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport with the given size anchored at the origin.
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(self) -> i32 {
        self.x + self.width
    }

    pub fn top(self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of pixels covered, zero for empty viewports.
    pub fn num_pixels(self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// Same rectangle expressed relative to `origin`.
    pub fn relative_to(self, origin: Viewport) -> Self {
        Self::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }

    /// Intersection of two viewports. Disjoint inputs give a zero-sized result.
    pub fn intersect(self, other: Viewport) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        Self::new(x, y, (right - x).max(0), (top - y).max(0))
    }

    /// Strict overlap test: touching edges do not overlap.
    pub fn overlaps(self, other: Viewport) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    /// Whether `inner` lies entirely inside `self`.
    pub fn contains(self, inner: Viewport) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.top() <= self.top()
    }

    pub(crate) fn to_array(self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Pack a float background color into the 8-bit RGBA word used by ubyte images.
pub fn color_to_rgba8(color: Color) -> [u8; 4] {
    color.map(|c| (255.0 * c.clamp(0.0, 1.0)) as u8)
}

/// Whether a background color is anything other than transparent black.
pub fn color_is_black(color: Color) -> bool {
    color_to_rgba8(color) == [0, 0, 0, 0]
}

/// Index of `rank` inside `group`, `None` when it is not a member.
pub fn find_rank_in_group(group: &[usize], rank: usize) -> Option<usize> {
    group.iter().position(|&r| r == rank)
}

/// Validate that `order` is a permutation of `0..len`.
pub(crate) fn check_permutation(order: &[usize], len: usize) -> CompositeResult<()> {
    if order.len() != len {
        return Err(CompositeError::invalid_value(format!(
            "order has {} entries, expected {len}",
            order.len()
        )));
    }
    let mut seen = vec![false; len];
    for &r in order {
        if r >= len {
            return Err(CompositeError::invalid_value(format!(
                "rank {r} out of range for {len} processes"
            )));
        }
        if std::mem::replace(&mut seen[r], true) {
            return Err(CompositeError::invalid_value(format!(
                "rank {r} listed twice"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
