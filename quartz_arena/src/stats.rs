//! Block arena statistics.
//!
//! Counters are plain integers: an arena is owned by one compiler thread.

use std::fmt;

/// Counters describing how an arena handed out blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Blocks handed out by `allocate_block`.
    pub blocks_allocated: u64,
    /// Allocations satisfied from the free list without growing storage.
    pub blocks_recycled: u64,
    /// Blocks carved out of fresh storage.
    pub blocks_created: u64,
    /// Blocks returned through `free_block`.
    pub blocks_freed: u64,
    /// Number of growth batches.
    pub batches: u64,
    /// Number of epoch resets.
    pub resets: u64,
}

impl ArenaStats {
    /// Create zeroed statistics.
    pub const fn new() -> Self {
        Self {
            blocks_allocated: 0,
            blocks_recycled: 0,
            blocks_created: 0,
            blocks_freed: 0,
            batches: 0,
            resets: 0,
        }
    }

    /// Fraction of allocations served by recycled blocks.
    pub fn reuse_ratio(&self) -> f64 {
        if self.blocks_allocated == 0 {
            return 0.0;
        }
        self.blocks_recycled as f64 / self.blocks_allocated as f64
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated={} recycled={} created={} freed={} batches={} resets={}",
            self.blocks_allocated,
            self.blocks_recycled,
            self.blocks_created,
            self.blocks_freed,
            self.batches,
            self.resets
        )
    }
}
