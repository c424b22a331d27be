//! Simulated linear arena with free-list reuse.
//!
//! Planning runs entirely on offsets: `alloc` and `free` only move numbers
//! around, and the arena remembers the highest offset it ever handed out.
//! Once planning is done, [`Arena::get_ptr`] asks the backend for a single
//! buffer of exactly that peak size. From then on the arena is frozen.
//!
//! # Policy
//!
//! 1. `alloc` takes the smallest free block that fits (best fit). A larger
//!    block is split and its remainder stays on the free list.
//! 2. If nothing fits, it bumps the high-water mark `used`.
//! 3. `free` of the block at the tail lowers `used` and keeps swallowing free
//!    blocks that end at the new tail.
//! 4. Any other `free` goes on the free list, merged with its neighbours, so
//!    two free blocks are never adjacent.
//!
//! Misuse (planning after materialization, freeing what was never handed out)
//! is a bug in the caller and panics.

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_dtype::DType;
use tracing::{debug, trace};

use crate::allocator::{Allocator, BufferOptions};
use crate::buffer::Buffer;
use crate::error::Result;

/// Snapshot of arena usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaInfo {
    pub used: usize,
    pub peak: usize,
}

#[derive(Debug)]
pub struct Arena {
    backend: Arc<dyn Allocator>,
    alignment: usize,
    used: usize,
    peak: usize,
    /// start offset -> block size
    free_blocks: BTreeMap<usize, usize>,
    buffer: Option<Buffer>,
}

impl Arena {
    /// Arena aligned to the widest supported element type.
    pub fn new(backend: Arc<dyn Allocator>) -> Self {
        Self::with_alignment(backend, DType::max_bytes())
    }

    pub fn with_alignment(backend: Arc<dyn Allocator>, alignment: usize) -> Self {
        assert!(alignment.is_power_of_two(), "arena alignment must be a power of two, got {alignment}");
        Self { backend, alignment, used: 0, peak: 0, free_blocks: BTreeMap::new(), buffer: None }
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn is_materialized(&self) -> bool {
        self.buffer.is_some()
    }

    /// Free blocks as `(start, size)` in address order.
    pub fn free_blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.free_blocks.iter().map(|(&start, &size)| (start, size))
    }

    /// Round `size` up to the alignment. Empty requests still occupy one unit
    /// so that every allocation has a distinct offset.
    pub fn aligned_size(&self, size: usize) -> usize {
        size.max(1).div_ceil(self.alignment) * self.alignment
    }

    /// Reserve `size` bytes and return their offset.
    pub fn alloc(&mut self, size: usize) -> usize {
        assert!(self.buffer.is_none(), "arena is materialized, simulated alloc is no longer allowed");
        let size = self.aligned_size(size);

        let mut best: Option<(usize, usize)> = None;
        for (&start, &block) in &self.free_blocks {
            if block < size {
                continue;
            }
            if best.is_none_or(|(_, best_size)| block < best_size) {
                best = Some((start, block));
                if block == size {
                    break;
                }
            }
        }

        if let Some((start, block)) = best {
            self.free_blocks.remove(&start);
            if block > size {
                self.free_blocks.insert(start + size, block - size);
            }
            trace!(offset = start, size, block, "arena alloc from free list");
            return start;
        }

        let offset = self.used;
        self.used += size;
        self.peak = self.peak.max(self.used);
        trace!(offset, size, used = self.used, peak = self.peak, "arena alloc at tail");
        offset
    }

    /// Return the region `[offset, offset + size)` to the arena.
    pub fn free(&mut self, offset: usize, size: usize) {
        assert!(self.buffer.is_none(), "arena is materialized, simulated free is no longer allowed");
        let size = self.aligned_size(size);
        let end = offset + size;
        assert!(end <= self.used, "free of [{offset}, {end}) exceeds used size {}", self.used);
        if let Some((&start, &block)) = self.free_blocks.range(..end).next_back() {
            assert!(start + block <= offset, "free of [{offset}, {end}) overlaps free block [{start}, {})", start + block);
        }

        if end == self.used {
            self.used = offset;
            while let Some((&start, &block)) = self.free_blocks.range(..self.used).next_back() {
                if start + block != self.used {
                    break;
                }
                self.free_blocks.remove(&start);
                self.used = start;
            }
            trace!(offset, size, used = self.used, "arena free at tail");
            return;
        }

        let mut start = offset;
        let mut block = size;
        if let Some((&prev_start, &prev_size)) = self.free_blocks.range(..start).next_back()
            && prev_start + prev_size == start
        {
            self.free_blocks.remove(&prev_start);
            start = prev_start;
            block += prev_size;
        }
        if let Some(next_size) = self.free_blocks.remove(&end) {
            block += next_size;
        }
        self.free_blocks.insert(start, block);
        trace!(offset, size, merged_start = start, merged_size = block, "arena free to list");
    }

    /// Materialize the arena: allocate `peak` bytes from the backend on the
    /// first call, hand out the same buffer afterwards.
    pub fn get_ptr(&mut self) -> Result<Buffer> {
        if let Some(buffer) = &self.buffer {
            return Ok(buffer.clone());
        }

        let buffer = Buffer::allocate(Arc::clone(&self.backend), self.peak, BufferOptions::default())?;
        debug!(backend = self.backend.name(), bytes = self.peak, "arena materialized");
        self.buffer = Some(buffer.clone());
        Ok(buffer)
    }

    pub fn info(&self) -> ArenaInfo {
        let info = ArenaInfo { used: self.used, peak: self.peak };
        debug!(used = info.used, peak = info.peak, free_blocks = self.free_blocks.len(), "arena usage");
        info
    }
}
