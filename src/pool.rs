//! Segment-count-keyed pool of trail geometry buffers.
//!
//! Trails are created and destroyed constantly, but after decimation their
//! segment counts cluster on a few small values. Keeping one free-list per
//! exact segment count means a new trail almost always finds a buffer of
//! precisely the right size waiting for it.
//!
//! Ownership does the bookkeeping: [`MeshBufferPool::get`] moves a buffer
//! out to the caller and [`MeshBufferPool::put`] moves it back, so a buffer
//! can never sit in a bucket and be in use at the same time. Buffers hold no
//! reference to the pool; the owner passes the pool explicitly on return.

use std::collections::HashMap;

use crate::error::TrailError;
use crate::geometry::TrailGeometryBuffer;

/// Allocation counters for a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created since the pool was made.
    pub allocations: usize,
    /// Requests served from a bucket.
    pub reuses: usize,
    /// Buffers currently checked out.
    pub in_use: usize,
    /// Most buffers ever checked out at once.
    pub high_water: usize,
    /// Buffers sitting in buckets.
    pub free: usize,
}

/// Bucketed free-list of [`TrailGeometryBuffer`]s.
#[derive(Debug, Default)]
pub struct MeshBufferPool {
    buckets: HashMap<u32, Vec<TrailGeometryBuffer>>,
    max_buffers: Option<usize>,
    stats: PoolStats,
}

impl MeshBufferPool {
    /// Pool that allocates on demand without limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool that refuses to own more than `max_buffers` buffers in total.
    pub fn with_max_buffers(max_buffers: usize) -> Self {
        Self {
            max_buffers: Some(max_buffers),
            ..Self::default()
        }
    }

    /// Total buffers owned by the pool or checked out from it.
    #[inline]
    pub fn total_buffers(&self) -> usize {
        self.stats.in_use + self.stats.free
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn max_buffers(&self) -> Option<usize> {
        self.max_buffers
    }

    /// Free buffers waiting for `segment_count`.
    pub fn available(&self, segment_count: u32) -> usize {
        self.buckets.get(&segment_count).map_or(0, Vec::len)
    }

    /// `(segment_count, free buffers)` for every bucket, sorted by segment count.
    pub fn bucket_sizes(&self) -> Vec<(u32, usize)> {
        let mut sizes: Vec<_> = self.buckets.iter().map(|(&k, v)| (k, v.len())).collect();
        sizes.sort_unstable();
        sizes
    }

    /// Take a buffer for exactly `segment_count` segments.
    ///
    /// Pops from the matching bucket when possible and allocates otherwise.
    /// Fails only when a ceiling is set and already reached.
    pub fn get(&mut self, segment_count: u32) -> Result<TrailGeometryBuffer, TrailError> {
        let buffer = match self.buckets.get_mut(&segment_count).and_then(Vec::pop) {
            Some(buffer) => {
                self.stats.reuses += 1;
                self.stats.free -= 1;
                buffer
            }
            None => self.allocate(segment_count)?,
        };

        self.stats.in_use += 1;
        self.stats.high_water = self.stats.high_water.max(self.stats.in_use);
        Ok(buffer)
    }

    /// Hide `buffer` and return it to its bucket.
    ///
    /// The caller gives up the buffer; it can only be touched again after a
    /// later [`get`](Self::get) hands it out.
    pub fn put(&mut self, mut buffer: TrailGeometryBuffer) {
        buffer.set_visible(false);
        self.stats.in_use = self.stats.in_use.saturating_sub(1);
        self.stats.free += 1;
        self.buckets
            .entry(buffer.segment_count())
            .or_default()
            .push(buffer);
    }

    /// Allocate `count` buffers for `segment_count` up front.
    ///
    /// Stops early at the ceiling and returns how many were added.
    pub fn prewarm(&mut self, segment_count: u32, count: usize) -> usize {
        let mut added = 0;
        while added < count {
            match self.allocate(segment_count) {
                Ok(buffer) => {
                    self.stats.free += 1;
                    self.buckets.entry(segment_count).or_default().push(buffer);
                    added += 1;
                }
                Err(_) => break,
            }
        }
        added
    }

    /// Drop every free buffer. Checked-out buffers are unaffected.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.stats.free = 0;
    }

    fn allocate(&mut self, segment_count: u32) -> Result<TrailGeometryBuffer, TrailError> {
        if let Some(max_buffers) = self.max_buffers {
            if self.total_buffers() >= max_buffers {
                return Err(TrailError::PoolExhausted {
                    segment_count,
                    max_buffers,
                });
            }
        }

        self.stats.allocations += 1;
        log::debug!(
            "allocating {}-segment trail buffer ({} total)",
            segment_count,
            self.total_buffers() + 1
        );
        Ok(TrailGeometryBuffer::new(segment_count))
    }
}
