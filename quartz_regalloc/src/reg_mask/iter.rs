//! Ascending iteration over a register mask.

use super::{LOG_WORD_BITS, OptoReg, RegMask};
use std::iter::FusedIterator;

/// Yields the locations of a [`RegMask`] in ascending order.
pub struct RegMaskIterator<'a> {
    mask: &'a RegMask,
    /// Bits of the current word not yet yielded.
    current: u64,
    /// First location of the current word.
    base: i32,
    /// Next word to load.
    next_word: usize,
}

impl<'a> RegMaskIterator<'a> {
    /// Start iterating at the mask's low watermark.
    #[inline]
    pub fn new(mask: &'a RegMask) -> Self {
        RegMaskIterator {
            mask,
            current: 0,
            base: 0,
            next_word: mask.lwm,
        }
    }
}

impl Iterator for RegMaskIterator<'_> {
    type Item = OptoReg;

    #[inline]
    fn next(&mut self) -> Option<OptoReg> {
        while self.current == 0 {
            if self.next_word > self.mask.hwm {
                return None;
            }
            self.current = self.mask.words[self.next_word];
            self.base = (self.next_word << LOG_WORD_BITS) as i32;
            self.next_word += 1;
        }

        let offset = self.current.trailing_zeros() as i32;
        self.current &= self.current - 1;
        Some(OptoReg::new(self.base + offset))
    }
}

impl FusedIterator for RegMaskIterator<'_> {}

impl<'a> IntoIterator for &'a RegMask {
    type Item = OptoReg;
    type IntoIter = RegMaskIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_ascending() {
        let mask: RegMask = [300, 3, 64, 63, 0]
            .into_iter()
            .map(OptoReg::new)
            .collect();
        let regs: Vec<i32> = mask.iter().map(OptoReg::index).collect();
        assert_eq!(regs, vec![0, 3, 63, 64, 300]);
    }

    #[test]
    fn test_empty_mask_yields_nothing() {
        assert_eq!(RegMask::new().iter().next(), None);
    }

    #[test]
    fn test_skips_removed_words() {
        let mut mask: RegMask = [5, 130, 400].into_iter().map(OptoReg::new).collect();
        mask.remove(OptoReg::new(130));
        let regs: Vec<i32> = (&mask).into_iter().map(OptoReg::index).collect();
        assert_eq!(regs, vec![5, 400]);
    }

    #[test]
    fn test_yields_all_stack_bit() {
        let mut mask = RegMask::from_reg(OptoReg::new(1));
        mask.set_all_stack();
        let last = mask.iter().last();
        assert_eq!(last, Some(RegMask::all_stack_reg()));
    }
}
