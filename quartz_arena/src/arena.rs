//! Block arena with an out-of-band free list.
//!
//! The arena provides:
//! - **Batch growth**: blocks are carved out `batch_size` at a time
//! - **O(1) recycling**: freed block ids go on a stack and are reused first
//! - **Epochs**: `reset()` invalidates every block at once when a new
//!   compilation starts
//!
//! Block storage is a plain vector of [`BitBlock`]s. A free block keeps its
//! storage untouched; only its id on the free list marks it as available.

use crate::block::{BitBlock, BlockId};
use crate::config::ArenaConfig;
use crate::error::ConfigResult;
use crate::stats::ArenaStats;
use std::fmt;

// =============================================================================
// Epoch
// =============================================================================

/// Identifies one arena lifetime between resets.
///
/// An epoch names both the arena and its generation, so a set built on one
/// arena is also recognised as foreign by every other live arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Epoch {
    /// Address of the owning arena's identity token.
    arena: usize,
    /// Resets seen by the owning arena.
    generation: u64,
}

impl Epoch {
    /// Get the generation number within the owning arena.
    #[inline]
    pub const fn generation(self) -> u64 {
        self.generation
    }

    fn new(identity: &u8, generation: u64) -> Self {
        Epoch {
            arena: identity as *const u8 as usize,
            generation,
        }
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch#{:x}.{}", self.arena, self.generation)
    }
}

// =============================================================================
// Block Arena
// =============================================================================

/// Allocator for [`BitBlock`]s, scoped to one compilation.
pub struct BlockArena {
    /// Every block carved out in this epoch, live or free.
    blocks: Vec<BitBlock>,
    /// Ids of free blocks; the last entry is handed out next.
    free: Vec<BlockId>,
    /// Current epoch.
    epoch: Epoch,
    /// Heap token whose address names this arena in its epochs.
    identity: Box<u8>,
    /// Configuration.
    config: ArenaConfig,
    /// Statistics.
    stats: ArenaStats,
    /// Liveness of each block, for double-free detection.
    #[cfg(debug_assertions)]
    live: Vec<bool>,
}

impl BlockArena {
    /// Create an arena with the default configuration.
    pub fn new() -> Self {
        Self::build(ArenaConfig::default())
    }

    /// Create an arena with a validated configuration.
    pub fn with_config(config: ArenaConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ArenaConfig) -> Self {
        let identity = Box::new(0u8);
        let epoch = Epoch::new(&identity, 0);
        BlockArena {
            blocks: Vec::with_capacity(config.initial_blocks),
            free: Vec::new(),
            epoch,
            identity,
            config,
            stats: ArenaStats::new(),
            #[cfg(debug_assertions)]
            live: Vec::new(),
        }
    }

    /// Hand out a zeroed block.
    ///
    /// Pops the free list; when it is empty a new batch is carved out first.
    pub fn allocate_block(&mut self) -> BlockId {
        self.stats.blocks_allocated += 1;

        let id = match self.free.pop() {
            Some(id) => {
                self.stats.blocks_recycled += 1;
                self.blocks[id.as_usize()] = BitBlock::ZERO;
                id
            }
            None => self.grow(),
        };

        #[cfg(debug_assertions)]
        {
            debug_assert!(!self.live[id.as_usize()], "{:?} handed out twice", id);
            self.live[id.as_usize()] = true;
        }

        id
    }

    /// Carve out a new batch. Returns the first new block; the rest go on
    /// the free list so they are handed out in ascending order.
    fn grow(&mut self) -> BlockId {
        let base = self.blocks.len();
        let batch = self.config.batch_size;
        debug_assert!(
            base + batch <= crate::config::MAX_BLOCKS,
            "block arena exhausted its id space"
        );

        self.blocks.resize(base + batch, BitBlock::ZERO);
        self.free
            .extend((base + 1..base + batch).rev().map(|i| BlockId::new(i as u32)));

        #[cfg(debug_assertions)]
        self.live.resize(base + batch, false);

        self.stats.blocks_created += batch as u64;
        self.stats.batches += 1;
        log::trace!(
            "block arena {}: grew by {} blocks to {}",
            self.epoch,
            batch,
            self.blocks.len()
        );

        BlockId::new(base as u32)
    }

    /// Return a block to the free list.
    ///
    /// The caller must not use `id` again until it is handed out anew.
    pub fn free_block(&mut self, id: BlockId) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.live[id.as_usize()], "{:?} freed while not live", id);
            self.live[id.as_usize()] = false;
        }

        self.stats.blocks_freed += 1;
        self.free.push(id);
    }

    /// Start a new compilation.
    ///
    /// Every block handed out so far becomes invalid, and so does every set
    /// built on them.
    pub fn reset(&mut self) {
        let previous = self.epoch;
        let released = self.live_blocks();

        self.blocks.clear();
        self.free.clear();
        #[cfg(debug_assertions)]
        self.live.clear();

        self.epoch = Epoch::new(&self.identity, previous.generation + 1);
        self.stats.resets += 1;

        log::debug!(
            "block arena reset: {} -> {}, {} live blocks released ({})",
            previous,
            self.epoch,
            released,
            self.stats
        );
    }

    /// Read a block.
    #[inline]
    pub fn block(&self, id: BlockId) -> &BitBlock {
        #[cfg(debug_assertions)]
        debug_assert!(self.live[id.as_usize()], "{:?} read while free", id);
        &self.blocks[id.as_usize()]
    }

    /// Write a block.
    #[inline]
    pub fn block_mut(&mut self, id: BlockId) -> &mut BitBlock {
        #[cfg(debug_assertions)]
        debug_assert!(self.live[id.as_usize()], "{:?} written while free", id);
        &mut self.blocks[id.as_usize()]
    }

    /// Current epoch.
    #[inline]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Blocks carved out in this epoch, live or free.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks waiting on the free list.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Blocks currently owned by sets.
    #[inline]
    pub fn live_blocks(&self) -> usize {
        self.blocks.len() - self.free.len()
    }

    /// Configuration.
    #[inline]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Statistics accumulated since the arena was created.
    #[inline]
    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }
}

impl Default for BlockArena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlockArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockArena")
            .field("epoch", &self.epoch)
            .field("capacity", &self.capacity())
            .field("free", &self.free_count())
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
