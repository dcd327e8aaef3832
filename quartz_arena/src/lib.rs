//! Quartz Block Arena
//!
//! Storage for the sparse bit sets used by the register allocator.
//!
//! # Architecture
//!
//! - **BitBlock**: 256 bits, the unit of sparse storage. A single static
//!   all-zero block ([`EMPTY_BLOCK`]) stands in for every slot that owns no
//!   storage.
//!
//! - **BlockArena**: carves blocks out in batches and recycles freed ones
//!   through a free list of block ids. One arena belongs to one compilation;
//!   `reset()` ends its epoch and invalidates every block at once.
//!
//! # Usage
//!
//! ```
//! use quartz_arena::BlockArena;
//!
//! let mut arena = BlockArena::new();
//! let id = arena.allocate_block();
//! arena.block_mut(id).insert(42);
//! assert!(arena.block(id).member(42));
//!
//! arena.free_block(id);
//! arena.reset(); // next compilation
//! ```
//!
//! # Threading
//!
//! An arena is owned by a single compiler thread and is never shared.
//! Concurrent compilations each use their own arena.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod config;
pub mod error;

mod arena;
mod stats;

pub use arena::{BlockArena, Epoch};
pub use block::{
    BITS_PER_BLOCK, BITS_PER_WORD, BLOCK_BITS, BLOCK_MASK, BitBlock, BlockId, EMPTY_BLOCK,
    WORD_BITS, WORDS_PER_BLOCK,
};
pub use config::ArenaConfig;
pub use error::{ConfigError, ConfigResult};
pub use stats::ArenaStats;
