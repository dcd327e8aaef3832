//! Fixed-size bit blocks.
//!
//! A [`BitBlock`] is the unit of storage for sparse sets: 256 bits held in
//! four 64-bit words. Blocks live in a [`BlockArena`](crate::BlockArena) and
//! are addressed by [`BlockId`]. Whether a block is free is tracked by the
//! arena, never by the block's own storage.

use std::fmt;

// =============================================================================
// Geometry
// =============================================================================

/// Bits in one storage word.
pub const BITS_PER_WORD: u32 = u64::BITS;

/// log2 of [`BITS_PER_WORD`].
pub const WORD_BITS: u32 = 6;

/// Storage words per block.
pub const WORDS_PER_BLOCK: usize = 4;

/// Bits per block.
pub const BITS_PER_BLOCK: u32 = BITS_PER_WORD * WORDS_PER_BLOCK as u32;

/// log2 of [`BITS_PER_BLOCK`].
pub const BLOCK_BITS: u32 = 8;

/// Mask selecting the bit offset within a block.
pub const BLOCK_MASK: u32 = BITS_PER_BLOCK - 1;

const WORD_MASK: u32 = BITS_PER_WORD - 1;

const _: () = assert!(1 << BLOCK_BITS == BITS_PER_BLOCK);
const _: () = assert!(1 << WORD_BITS == BITS_PER_WORD);

// =============================================================================
// Block Id
// =============================================================================

/// Index of a block inside its arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a block id from a raw index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        BlockId(index)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Get the index as usize.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blk#{}", self.0)
    }
}

// =============================================================================
// Bit Block
// =============================================================================

/// 256 bits of set membership.
///
/// Aligned to 32 bytes so a block never straddles a cache line.
#[repr(C, align(32))]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct BitBlock {
    words: [u64; WORDS_PER_BLOCK],
}

/// The shared, permanently empty block.
///
/// Set slots that own no storage read through this block. It is never
/// written and never freed.
pub static EMPTY_BLOCK: BitBlock = BitBlock::ZERO;

impl BitBlock {
    /// A block with no bits set.
    pub const ZERO: BitBlock = BitBlock {
        words: [0; WORDS_PER_BLOCK],
    };

    /// Split a block-relative bit number into a word index and a word mask.
    #[inline(always)]
    const fn locate(bit: u32) -> (usize, u64) {
        debug_assert!(bit < BITS_PER_BLOCK);
        ((bit >> WORD_BITS) as usize, 1u64 << (bit & WORD_MASK))
    }

    /// Get the storage words.
    #[inline]
    pub const fn words(&self) -> &[u64; WORDS_PER_BLOCK] {
        &self.words
    }

    /// Get one storage word.
    #[inline]
    pub const fn word(&self, index: usize) -> u64 {
        self.words[index]
    }

    /// Check whether a block-relative bit is set.
    #[inline]
    pub const fn member(&self, bit: u32) -> bool {
        let (word, mask) = Self::locate(bit);
        self.words[word] & mask != 0
    }

    /// Set a bit. Returns true if it was previously clear.
    #[inline]
    pub fn insert(&mut self, bit: u32) -> bool {
        let (word, mask) = Self::locate(bit);
        let old = self.words[word];
        self.words[word] = old | mask;
        old & mask == 0
    }

    /// Clear a bit. Returns true if it was previously set.
    #[inline]
    pub fn remove(&mut self, bit: u32) -> bool {
        let (word, mask) = Self::locate(bit);
        let old = self.words[word];
        self.words[word] = old & !mask;
        old & mask != 0
    }

    /// OR another block into this one.
    #[inline]
    pub fn union_with(&mut self, other: &BitBlock) {
        for (dst, src) in self.words.iter_mut().zip(other.words.iter()) {
            *dst |= *src;
        }
    }

    /// Clear every bit.
    #[inline]
    pub fn clear(&mut self) {
        self.words = [0; WORDS_PER_BLOCK];
    }

    /// Check if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }
}

impl fmt::Debug for BitBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitBlock[")?;
        for (i, word) in self.words.iter().enumerate().rev() {
            if i != WORDS_PER_BLOCK - 1 {
                write!(f, "_")?;
            }
            write!(f, "{:016x}", word)?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Tests
// =============================================================================
