use std::collections::HashMap;

/// Logical name of a scratch buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKey {
    /// Pieces an image is split into before a radix-k round.
    RadixkPiece,
    /// Output of a compressed-compressed composite in the radix-k tree.
    RadixkComposite,
    /// Working image after interlacing.
    Interlace,
    /// Composite of a telescoped sub-group contribution.
    Telescope,
    /// Result of a binary tree reduction step.
    TreeComposite,
    /// Compressed rendering of a tile.
    TileCompress,
    /// Composite of whole images in the direct strategy.
    DirectComposite,
}

/// Retention limits for [`ScratchPool`].
#[derive(Debug, Clone, Copy)]
pub struct ScratchPoolOpts {
    /// Maximum bytes retained across all keys.
    pub max_pool_bytes: usize,
    /// Maximum buffers kept per key.
    pub max_buffers_per_key: usize,
}

impl Default for ScratchPoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_buffers_per_key: 16,
        }
    }
}

/// Counters describing pool behavior.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub retained_buffers: usize,
    pub retained_bytes: usize,
    pub allocations: u64,
    pub reuses: u64,
    pub dropped_on_release: u64,
}

/// Byte buffers reused across rounds and frames, keyed by logical name.
///
/// Buffers come back cleared; their capacity is what gets reused.
#[derive(Debug, Default)]
pub struct ScratchPool {
    opts: ScratchPoolOpts,
    stats: PoolStats,
    buckets: HashMap<BufferKey, Vec<Vec<u8>>>,
}

impl ScratchPool {
    pub fn new(opts: ScratchPoolOpts) -> Self {
        Self {
            opts,
            stats: PoolStats::default(),
            buckets: HashMap::new(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.clone()
    }

    /// An empty buffer with at least `capacity` bytes reserved.
    pub fn take(&mut self, key: BufferKey, capacity: usize) -> Vec<u8> {
        if let Some(mut buf) = self.buckets.get_mut(&key).and_then(Vec::pop) {
            self.stats.retained_buffers = self.stats.retained_buffers.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(buf.capacity());
            self.stats.reuses = self.stats.reuses.saturating_add(1);
            buf.clear();
            buf.reserve(capacity);
            return buf;
        }
        self.stats.allocations = self.stats.allocations.saturating_add(1);
        Vec::with_capacity(capacity)
    }

    /// Return a buffer for later reuse under `key`.
    pub fn give_back(&mut self, key: BufferKey, buf: Vec<u8>) {
        let bytes = buf.capacity();
        if bytes == 0 || self.opts.max_buffers_per_key == 0 {
            return;
        }
        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }
        let bucket = self.buckets.entry(key).or_default();
        if bucket.len() >= self.opts.max_buffers_per_key {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }
        bucket.push(buf);
        self.stats.retained_buffers = self.stats.retained_buffers.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/image/pool.rs"]
mod tests;
