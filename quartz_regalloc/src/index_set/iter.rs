//! Ascending iteration over an `IndexSet`.

use super::IndexSet;
use quartz_arena::{BLOCK_BITS, BlockArena, BlockId, WORD_BITS, WORDS_PER_BLOCK};
use std::iter::FusedIterator;

/// Cursor over the members of an [`IndexSet`].
///
/// The cursor borrows the set's slot table but not the arena, so the caller
/// may mutate *other* sets on the same arena between steps. Each block is
/// copied out when the cursor enters it; empty slots are skipped without
/// touching the arena.
pub struct IndexSetIterator<'s> {
    slots: &'s [Option<BlockId>],
    /// Next slot to visit.
    next_slot: usize,
    /// Copy of the block being walked.
    words: [u64; WORDS_PER_BLOCK],
    /// Next word of `words` to load.
    next_word: usize,
    /// First element of the current block.
    block_base: u32,
    /// Unvisited bits of the current word.
    current: u64,
    /// First element of the current word.
    word_base: u32,
}

impl<'s> IndexSetIterator<'s> {
    /// Create a cursor positioned before the first member. O(1).
    #[inline]
    pub fn new(set: &'s IndexSet) -> Self {
        IndexSetIterator {
            slots: set.slots(),
            next_slot: 0,
            words: [0; WORDS_PER_BLOCK],
            next_word: WORDS_PER_BLOCK,
            block_base: 0,
            current: 0,
            word_base: 0,
        }
    }

    /// Return the next member, or `0` once the set is exhausted.
    #[inline]
    pub fn next_elem(&mut self, arena: &BlockArena) -> u32 {
        if self.current == 0 && !self.advance(arena) {
            return 0;
        }

        let offset = self.current.trailing_zeros();
        self.current &= self.current - 1;
        self.word_base + offset
    }

    /// Load the next nonzero word into `current`. False when none is left.
    fn advance(&mut self, arena: &BlockArena) -> bool {
        loop {
            while self.next_word < WORDS_PER_BLOCK {
                let word = self.words[self.next_word];
                let index = self.next_word;
                self.next_word += 1;
                if word != 0 {
                    self.current = word;
                    self.word_base = self.block_base + ((index as u32) << WORD_BITS);
                    return true;
                }
            }

            // Next block that owns storage.
            loop {
                let Some(&slot) = self.slots.get(self.next_slot) else {
                    return false;
                };
                let index = self.next_slot;
                self.next_slot += 1;
                if let Some(id) = slot {
                    self.words = *arena.block(id).words();
                    self.next_word = 0;
                    self.block_base = (index as u32) << BLOCK_BITS;
                    break;
                }
            }
        }
    }
}

/// Iterator over the members of an [`IndexSet`], in ascending order.
///
/// Created by [`IndexSet::iter`].
pub struct Iter<'a> {
    cursor: IndexSetIterator<'a>,
    arena: &'a BlockArena,
}

impl<'a> Iter<'a> {
    #[inline]
    pub(super) fn new(cursor: IndexSetIterator<'a>, arena: &'a BlockArena) -> Self {
        Iter { cursor, arena }
    }
}

impl Iterator for Iter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        match self.cursor.next_elem(self.arena) {
            0 => None,
            element => Some(element),
        }
    }
}

impl FusedIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use quartz_arena::ArenaConfig;

    fn build(arena: &mut BlockArena, max: u32, elements: &[u32]) -> IndexSet {
        let mut set = IndexSet::new(arena, max);
        for &e in elements {
            set.insert(arena, e);
        }
        set
    }

    #[test]
    fn test_cursor_returns_zero_when_done() {
        let mut arena = BlockArena::new();
        let set = build(&mut arena, 300, &[17, 299]);

        let mut cursor = set.iterator();
        assert_eq!(cursor.next_elem(&arena), 17);
        assert_eq!(cursor.next_elem(&arena), 299);
        assert_eq!(cursor.next_elem(&arena), 0);
        assert_eq!(cursor.next_elem(&arena), 0);
    }

    #[test]
    fn test_empty_set() {
        let arena = BlockArena::new();
        let set = IndexSet::new(&arena, 10_000);
        assert_eq!(set.iter(&arena).next(), None);
    }

    #[test]
    fn test_word_and_block_boundaries() {
        let mut arena = BlockArena::new();
        let elements = [1, 63, 64, 127, 128, 255, 256, 511, 512, 1023];
        let set = build(&mut arena, 1024, &elements);

        let seen: Vec<u32> = set.iter(&arena).collect();
        assert_eq!(seen, elements);
    }

    #[test]
    fn test_skips_emptied_blocks() {
        let mut arena = BlockArena::with_config(ArenaConfig::for_testing()).unwrap();
        let mut set = build(&mut arena, 2048, &[3, 700, 1900]);
        set.remove(&mut arena, 700);

        let seen: Vec<u32> = set.iter(&arena).collect();
        assert_eq!(seen, vec![3, 1900]);
    }

    #[test]
    fn test_cursor_allows_mutating_other_sets() {
        let mut arena = BlockArena::new();
        let source = build(&mut arena, 512, &[2, 200, 400]);
        let mut dest = IndexSet::new(&arena, 512);

        let mut cursor = source.iterator();
        loop {
            let e = cursor.next_elem(&arena);
            if e == 0 {
                break;
            }
            dest.insert(&mut arena, e + 1);
        }

        let seen: Vec<u32> = dest.iter(&arena).collect();
        assert_eq!(seen, vec![3, 201, 401]);
    }
}
