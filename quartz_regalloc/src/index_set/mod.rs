//! Sparse Block Bit Set
//!
//! `IndexSet` tracks interference-graph neighbors. The universe
//! `[0, max_elements)` is split into 256-bit blocks; a set only owns storage
//! for the blocks it actually touches, so a live range with a handful of
//! neighbors costs a handful of blocks no matter how many live ranges the
//! method has.
//!
//! # Layout
//!
//! ```text
//! slots:  [ None | Some(blk#7) | None | Some(blk#2) | None ... ]
//!                     │                    │
//!                     ▼                    ▼
//!           arena blocks (256 bits each, 32-byte aligned)
//! ```
//!
//! A `None` slot reads through the shared [`EMPTY_BLOCK`]. `block_limit` is
//! one past the highest slot that has owned a block since the last clear, so
//! clearing and iteration never look beyond it.
//!
//! Element `0` is reserved: it is never a member and iteration uses it as
//! the "done" value.

mod iter;

pub use iter::{IndexSetIterator, Iter};

use quartz_arena::{BLOCK_BITS, BLOCK_MASK, BitBlock, BlockArena, BlockId, EMPTY_BLOCK, Epoch};
use smallvec::SmallVec;
use std::fmt;

/// Slots stored inline before spilling to the heap (16 slots = 4096 elements).
const INLINE_SLOTS: usize = 16;

// =============================================================================
// Index Set
// =============================================================================

/// A set of live range numbers backed by arena blocks.
pub struct IndexSet {
    /// One entry per 256-element block; `None` is the empty sentinel.
    slots: SmallVec<[Option<BlockId>; INLINE_SLOTS]>,
    /// Exclusive upper bound on elements.
    max_elements: u32,
    /// Exact number of members.
    count: u32,
    /// One past the highest slot allocated since the last clear.
    block_limit: u32,
    /// Arena epoch the set was built under.
    epoch: Epoch,
}

impl IndexSet {
    /// Create an empty set able to hold elements below `max_elements`.
    pub fn new(arena: &BlockArena, max_elements: u32) -> Self {
        IndexSet {
            slots: SmallVec::from_elem(None, Self::slots_for(max_elements)),
            max_elements,
            count: 0,
            block_limit: 0,
            epoch: arena.epoch(),
        }
    }

    #[inline]
    fn slots_for(max_elements: u32) -> usize {
        max_elements.div_ceil(1 << BLOCK_BITS) as usize
    }

    /// Re-initialize for a new capacity.
    ///
    /// Blocks still owned from the current epoch go back to the arena; blocks
    /// from an earlier epoch were already reclaimed by `reset()`.
    pub fn initialize(&mut self, arena: &mut BlockArena, max_elements: u32) {
        if self.epoch == arena.epoch() {
            self.clear(arena);
        }

        self.slots.clear();
        self.slots.resize(Self::slots_for(max_elements), None);
        self.max_elements = max_elements;
        self.count = 0;
        self.block_limit = 0;
        self.epoch = arena.epoch();
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Split an element into its slot index and block-relative bit.
    #[inline(always)]
    const fn locate(element: u32) -> (usize, u32) {
        ((element >> BLOCK_BITS) as usize, element & BLOCK_MASK)
    }

    /// Read the block at `slot`, or the empty sentinel.
    #[inline]
    fn block<'a>(&self, arena: &'a BlockArena, slot: usize) -> &'a BitBlock {
        match self.slots[slot] {
            Some(id) => arena.block(id),
            None => &EMPTY_BLOCK,
        }
    }

    /// Check whether `element` is in the set.
    #[inline]
    pub fn member(&self, arena: &BlockArena, element: u32) -> bool {
        self.check_epoch(arena);
        debug_assert!(
            element < self.max_elements,
            "element {} out of range (max {})",
            element,
            self.max_elements
        );

        let (slot, bit) = Self::locate(element);
        self.block(arena, slot).member(bit)
    }

    /// Add `element`. Returns true if it was not already a member.
    ///
    /// Inserting `0` is a no-op that returns false.
    pub fn insert(&mut self, arena: &mut BlockArena, element: u32) -> bool {
        self.check_epoch(arena);
        if element == 0 {
            return false;
        }
        debug_assert!(
            element < self.max_elements,
            "element {} out of range (max {})",
            element,
            self.max_elements
        );

        let (slot, bit) = Self::locate(element);
        let id = match self.slots[slot] {
            Some(id) => id,
            None => self.alloc_slot(arena, slot),
        };

        let added = arena.block_mut(id).insert(bit);
        if added {
            self.count += 1;
        }
        added
    }

    /// Give `slot` a fresh block and widen `block_limit` over it.
    fn alloc_slot(&mut self, arena: &mut BlockArena, slot: usize) -> BlockId {
        let id = arena.allocate_block();
        self.slots[slot] = Some(id);
        self.block_limit = self.block_limit.max(slot as u32 + 1);
        id
    }

    /// Remove `element`. Returns true if it was a member.
    ///
    /// A block left empty stays owned by the set until `clear()`.
    pub fn remove(&mut self, arena: &mut BlockArena, element: u32) -> bool {
        self.check_epoch(arena);
        debug_assert!(element < self.max_elements);

        let (slot, bit) = Self::locate(element);
        let Some(id) = self.slots[slot] else {
            return false;
        };

        let removed = arena.block_mut(id).remove(bit);
        if removed {
            self.count -= 1;
        }
        removed
    }

    /// Detach the block at `slot`, return it to the arena and point the slot
    /// back at the empty sentinel. Members held in the block are dropped.
    pub fn free_block(&mut self, arena: &mut BlockArena, slot: usize) {
        self.check_epoch(arena);
        if let Some(id) = self.slots[slot].take() {
            self.count -= arena.block(id).count();
            arena.free_block(id);
        }
    }

    /// Remove every member, returning all owned blocks to the arena.
    pub fn clear(&mut self, arena: &mut BlockArena) {
        self.check_epoch(arena);
        for slot in self.slots[..self.block_limit as usize].iter_mut() {
            if let Some(id) = slot.take() {
                arena.free_block(id);
            }
        }
        self.count = 0;
        self.block_limit = 0;
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Deep copy `other` into a new set with its own blocks.
    pub fn from_set(arena: &mut BlockArena, other: &IndexSet) -> Self {
        other.check_epoch(arena);
        let mut set = IndexSet::new(arena, other.max_elements);

        for (slot, src) in other.slots[..other.block_limit as usize].iter().enumerate() {
            if let Some(src) = *src {
                let copy = *arena.block(src);
                let dst = arena.allocate_block();
                *arena.block_mut(dst) = copy;
                set.slots[slot] = Some(dst);
            }
        }

        set.count = other.count;
        set.block_limit = other.block_limit;
        set
    }

    /// Exchange contents with a set of the same capacity.
    ///
    /// Only the slot prefix either set has used is touched.
    pub fn swap(&mut self, other: &mut IndexSet) {
        debug_assert_eq!(
            self.max_elements, other.max_elements,
            "swapped sets must have the same capacity"
        );
        debug_assert_eq!(self.epoch, other.epoch, "swapped sets span arena epochs");

        let limit = self.block_limit.max(other.block_limit) as usize;
        self.slots[..limit].swap_with_slice(&mut other.slots[..limit]);
        std::mem::swap(&mut self.count, &mut other.count);
        std::mem::swap(&mut self.block_limit, &mut other.block_limit);
    }

    /// Add every member of `other`. Returns true if the set grew.
    pub fn union_with(&mut self, arena: &mut BlockArena, other: &IndexSet) -> bool {
        self.check_epoch(arena);
        other.check_epoch(arena);
        debug_assert!(other.max_elements <= self.max_elements);

        let before = self.count;
        for (slot, src) in other.slots[..other.block_limit as usize].iter().enumerate() {
            let Some(src) = *src else { continue };
            let src_block = *arena.block(src);
            if src_block.is_empty() {
                continue;
            }

            let dst = match self.slots[slot] {
                Some(id) => id,
                None => self.alloc_slot(arena, slot),
            };
            let block = arena.block_mut(dst);
            let had = block.count();
            block.union_with(&src_block);
            self.count += block.count() - had;
        }
        self.count != before
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of members.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Check if the set has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Exclusive upper bound on elements.
    #[inline]
    pub fn max_elements(&self) -> u32 {
        self.max_elements
    }

    /// One past the highest slot that owned a block since the last clear.
    #[inline]
    pub fn block_limit(&self) -> u32 {
        self.block_limit
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Option<BlockId>] {
        &self.slots[..self.block_limit as usize]
    }

    #[inline]
    fn check_epoch(&self, arena: &BlockArena) {
        debug_assert_eq!(
            self.epoch,
            arena.epoch(),
            "IndexSet used after its arena was reset"
        );
    }

    /// Cursor over the members. See [`IndexSetIterator`].
    #[inline]
    pub fn iterator(&self) -> IndexSetIterator<'_> {
        IndexSetIterator::new(self)
    }

    /// Iterate the members in ascending order.
    #[inline]
    pub fn iter<'a>(&'a self, arena: &'a BlockArena) -> Iter<'a> {
        self.check_epoch(arena);
        Iter::new(self.iterator(), arena)
    }

    /// Check internal consistency, panicking on corruption.
    ///
    /// Recounts every block and verifies that no slot past `block_limit`
    /// owns storage and that the reserved element is absent.
    pub fn verify(&self, arena: &BlockArena) {
        self.check_epoch(arena);

        let mut total = 0;
        for (slot, id) in self.slots.iter().enumerate() {
            if let Some(id) = id {
                assert!(
                    (slot as u32) < self.block_limit,
                    "slot {} owns {:?} beyond block limit {}",
                    slot,
                    id,
                    self.block_limit
                );
                total += arena.block(*id).count();
            }
        }

        assert_eq!(total, self.count, "IndexSet count out of sync with blocks");
        if let Some(Some(first)) = self.slots.first() {
            assert!(!arena.block(*first).member(0), "IndexSet contains element 0");
        }
    }

    /// Format the members as `{a, b, c}`.
    pub fn display<'a>(&'a self, arena: &'a BlockArena) -> IndexSetDisplay<'a> {
        IndexSetDisplay { set: self, arena }
    }
}

impl fmt::Debug for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSet")
            .field("count", &self.count)
            .field("max_elements", &self.max_elements)
            .field("block_limit", &self.block_limit)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Display adapter returned by [`IndexSet::display`].
pub struct IndexSetDisplay<'a> {
    set: &'a IndexSet,
    arena: &'a BlockArena,
}

impl fmt::Display for IndexSetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.set.iter(self.arena)).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quartz_arena::ArenaConfig;

    fn arena() -> BlockArena {
        BlockArena::with_config(ArenaConfig::for_testing()).unwrap()
    }

    fn collect(set: &IndexSet, arena: &BlockArena) -> Vec<u32> {
        set.iter(arena).collect()
    }

    #[test]
    fn test_basic_membership() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 512);

        assert!(set.insert(&mut arena, 5));
        assert!(set.insert(&mut arena, 130));
        assert!(set.insert(&mut arena, 300));

        assert!(set.member(&arena, 5));
        assert!(!set.member(&arena, 6));
        assert_eq!(set.count(), 3);
        assert_eq!(collect(&set, &arena), vec![5, 130, 300]);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 100);

        assert!(set.insert(&mut arena, 42));
        assert!(!set.insert(&mut arena, 42));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_insert_zero_is_noop() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 100);

        assert!(!set.insert(&mut arena, 0));
        assert!(!set.member(&arena, 0));
        assert!(set.is_empty());
        assert_eq!(arena.live_blocks(), 0);
    }

    #[test]
    fn test_remove() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 1000);
        set.insert(&mut arena, 700);

        assert!(set.remove(&mut arena, 700));
        assert!(!set.remove(&mut arena, 700));
        assert!(!set.remove(&mut arena, 10)); // sentinel slot
        assert!(set.is_empty());
        // empty block stays owned until clear
        assert_eq!(arena.live_blocks(), 1);
        assert_eq!(set.block_limit(), 3);
    }

    #[test]
    fn test_blocks_allocated_lazily() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 4096);

        set.insert(&mut arena, 1);
        set.insert(&mut arena, 255);
        assert_eq!(arena.live_blocks(), 1);
        assert_eq!(set.block_limit(), 1);

        set.insert(&mut arena, 3000);
        assert_eq!(arena.live_blocks(), 2);
        assert_eq!(set.block_limit(), 12);
    }

    #[test]
    fn test_clear_returns_blocks() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 2048);
        for e in [3, 300, 600, 1500] {
            set.insert(&mut arena, e);
        }
        assert_eq!(arena.live_blocks(), 4);

        set.clear(&mut arena);

        assert!(set.is_empty());
        assert_eq!(set.block_limit(), 0);
        assert_eq!(arena.live_blocks(), 0);
        for e in [3, 300, 600, 1500] {
            assert!(!set.member(&arena, e));
        }
    }

    #[test]
    fn test_free_block_drops_members() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 1024);
        set.insert(&mut arena, 260);
        set.insert(&mut arena, 261);
        set.insert(&mut arena, 10);

        set.free_block(&mut arena, 1);

        assert_eq!(set.count(), 1);
        assert!(!set.member(&arena, 260));
        assert_eq!(collect(&set, &arena), vec![10]);
        set.verify(&arena);
    }

    #[test]
    fn test_from_set_is_deep() {
        let mut arena = arena();
        let mut a = IndexSet::new(&arena, 600);
        a.insert(&mut arena, 7);
        a.insert(&mut arena, 513);

        let mut b = IndexSet::from_set(&mut arena, &a);
        b.insert(&mut arena, 8);
        a.remove(&mut arena, 7);

        assert_eq!(collect(&a, &arena), vec![513]);
        assert_eq!(collect(&b, &arena), vec![7, 8, 513]);
        assert_eq!(b.block_limit(), a.block_limit());
    }

    #[test]
    fn test_swap() {
        let mut arena = arena();
        let mut a = IndexSet::new(&arena, 1024);
        let mut b = IndexSet::new(&arena, 1024);
        a.insert(&mut arena, 900);
        b.insert(&mut arena, 4);
        b.insert(&mut arena, 5);

        a.swap(&mut b);

        assert_eq!(collect(&a, &arena), vec![4, 5]);
        assert_eq!(collect(&b, &arena), vec![900]);
        assert_eq!((a.count(), b.count()), (2, 1));
        assert_eq!((a.block_limit(), b.block_limit()), (1, 4));
    }

    #[test]
    fn test_union_with() {
        let mut arena = arena();
        let mut a = IndexSet::new(&arena, 1024);
        let mut b = IndexSet::new(&arena, 1024);
        a.insert(&mut arena, 1);
        a.insert(&mut arena, 400);
        b.insert(&mut arena, 400);
        b.insert(&mut arena, 800);

        assert!(a.union_with(&mut arena, &b));
        assert_eq!(collect(&a, &arena), vec![1, 400, 800]);
        assert_eq!(a.count(), 3);
        assert!(!a.union_with(&mut arena, &b));
        a.verify(&arena);
    }

    #[test]
    fn test_initialize_resizes() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 100);
        set.insert(&mut arena, 50);

        set.initialize(&mut arena, 5000);

        assert!(set.is_empty());
        assert_eq!(set.max_elements(), 5000);
        assert_eq!(arena.live_blocks(), 0);
        assert!(set.insert(&mut arena, 4999));
    }

    #[test]
    fn test_initialize_after_reset() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 100);
        set.insert(&mut arena, 50);

        arena.reset();
        set.initialize(&mut arena, 100);

        assert!(set.insert(&mut arena, 50));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_display() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 512);
        assert_eq!(set.display(&arena).to_string(), "{}");

        set.insert(&mut arena, 9);
        set.insert(&mut arena, 257);
        assert_eq!(set.display(&arena).to_string(), "{9, 257}");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "after its arena was reset")]
    fn test_stale_epoch_detected() {
        let mut arena = arena();
        let set = IndexSet::new(&arena, 64);
        arena.reset();
        set.member(&arena, 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_detected() {
        let mut arena = arena();
        let mut set = IndexSet::new(&arena, 64);
        set.insert(&mut arena, 64);
    }
}
