//! Register masks.
//!
//! A [`RegMask`] is a fixed-size bit set over the allocator's location
//! universe: every physical register slot followed by a span of stack slots.
//! Two watermarks bound the words that may hold set bits so bulk operations
//! only touch the interesting part of the mask.
//!
//! # Watermarks
//!
//! Every word outside `[lwm, hwm]` is zero. `insert` widens the range,
//! `remove` never narrows it, so scans must tolerate zero words inside the
//! range. An empty mask has `lwm > hwm`.
//!
//! # AllStack
//!
//! The highest bit of the universe does not name a location. When set, the
//! mask additionally contains every stack slot beyond the represented range.

mod iter;

pub use iter::RegMaskIterator;

use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, RangeInclusive, SubAssign};

// =============================================================================
// Geometry
// =============================================================================

/// Words in a mask.
pub const RM_WORDS: usize = 8;

/// Index of the last word.
const RM_MAX: usize = RM_WORDS - 1;

/// Bits per mask word.
const WORD_BITS: u32 = u64::BITS;

/// log2 of [`WORD_BITS`].
const LOG_WORD_BITS: u32 = 6;

/// Number of positions a mask can represent, including the AllStack bit.
pub const CHUNK_SIZE: u32 = RM_WORDS as u32 * WORD_BITS;

const ALL: u64 = u64::MAX;
const FIVES: u64 = 0x5555_5555_5555_5555;

/// Slots occupied by a long or double.
pub const SLOTS_PER_LONG: u32 = 2;
/// Slots occupied by a 32-bit vector.
pub const SLOTS_PER_VEC_S: u32 = 1;
/// Slots occupied by a 64-bit vector.
pub const SLOTS_PER_VEC_D: u32 = 2;
/// Slots occupied by a 128-bit vector.
pub const SLOTS_PER_VEC_X: u32 = 4;
/// Slots occupied by a 256-bit vector.
pub const SLOTS_PER_VEC_Y: u32 = 8;
/// Slots occupied by a 512-bit vector.
pub const SLOTS_PER_VEC_Z: u32 = 16;

/// Every run of `size` bits aligned to `size`, marked by its lowest bit.
///
/// `size` must divide the word width.
#[inline]
const fn low_bits(size: u32) -> u64 {
    debug_assert!(size.is_power_of_two() && size <= SLOTS_PER_VEC_Z);
    ALL / (ALL >> (WORD_BITS - size))
}

// =============================================================================
// Location Names
// =============================================================================

/// A register or stack-slot number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptoReg(i32);

impl OptoReg {
    /// No location.
    pub const BAD: OptoReg = OptoReg(-1);

    /// Create a location from its number.
    #[inline]
    pub const fn new(index: i32) -> Self {
        OptoReg(index)
    }

    /// Get the location number.
    #[inline]
    pub const fn index(self) -> i32 {
        self.0
    }

    /// Check that this names a location.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// The location `delta` slots away.
    #[inline]
    pub const fn add(self, delta: i32) -> Self {
        OptoReg(self.0 + delta)
    }
}

impl fmt::Debug for OptoReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "R{}", self.0)
        } else {
            write!(f, "BAD")
        }
    }
}

impl fmt::Display for OptoReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Ideal Register Kinds
// =============================================================================

/// Machine-independent kinds of values, used to size candidate location sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdealReg {
    /// 32-bit integer.
    Int,
    /// 32-bit float.
    Float,
    /// Pointer.
    Ptr,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// 32-bit vector.
    VecS,
    /// 64-bit vector.
    VecD,
    /// 128-bit vector.
    VecX,
    /// 256-bit vector.
    VecY,
    /// 512-bit vector.
    VecZ,
}

impl IdealReg {
    /// Check if this is a vector kind.
    #[inline]
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            IdealReg::VecS | IdealReg::VecD | IdealReg::VecX | IdealReg::VecY | IdealReg::VecZ
        )
    }

    /// Number of adjacent slots a value of this kind occupies.
    #[inline]
    pub const fn num_registers(self) -> u32 {
        match self {
            IdealReg::Int | IdealReg::Float => 1,
            IdealReg::Ptr | IdealReg::Long | IdealReg::Double => SLOTS_PER_LONG,
            IdealReg::VecS => SLOTS_PER_VEC_S,
            IdealReg::VecD => SLOTS_PER_VEC_D,
            IdealReg::VecX => SLOTS_PER_VEC_X,
            IdealReg::VecY => SLOTS_PER_VEC_Y,
            IdealReg::VecZ => SLOTS_PER_VEC_Z,
        }
    }
}

// =============================================================================
// Register Mask
// =============================================================================

/// A watermark-bounded bit set of locations.
#[derive(Clone)]
pub struct RegMask {
    words: [u64; RM_WORDS],
    /// Lowest word that may be nonzero.
    lwm: usize,
    /// Highest word that may be nonzero.
    hwm: usize,
}

impl RegMask {
    /// Create an empty mask.
    #[inline]
    pub const fn new() -> Self {
        RegMask {
            words: [0; RM_WORDS],
            lwm: RM_MAX,
            hwm: 0,
        }
    }

    /// Create a mask holding every representable location and AllStack.
    #[inline]
    pub const fn all() -> Self {
        RegMask {
            words: [ALL; RM_WORDS],
            lwm: 0,
            hwm: RM_MAX,
        }
    }

    /// Create a mask holding exactly one location.
    pub fn from_reg(reg: OptoReg) -> Self {
        let mut mask = RegMask::new();
        mask.insert(reg);
        mask
    }

    /// Create a mask from a list of locations.
    pub fn from_regs(regs: impl IntoIterator<Item = OptoReg>) -> Self {
        let mut mask = RegMask::new();
        for reg in regs {
            mask.insert(reg);
        }
        mask
    }

    #[inline(always)]
    fn locate(reg: OptoReg) -> (usize, u64) {
        debug_assert!(
            reg.is_valid() && (reg.index() as u32) < CHUNK_SIZE,
            "{} outside the mask universe",
            reg
        );
        let r = reg.index() as u32;
        ((r >> LOG_WORD_BITS) as usize, 1u64 << (r & (WORD_BITS - 1)))
    }

    #[inline(always)]
    fn range(&self) -> RangeInclusive<usize> {
        self.lwm..=self.hwm
    }

    /// Word range shared by both masks' watermarks.
    #[inline(always)]
    fn overlap_range(&self, other: &RegMask) -> RangeInclusive<usize> {
        self.lwm.max(other.lwm)..=self.hwm.min(other.hwm)
    }

    #[inline(always)]
    fn location(word: usize, bit: u32) -> OptoReg {
        OptoReg::new(((word as u32) << LOG_WORD_BITS | bit) as i32)
    }

    /// Check the watermark invariant: every word outside `[lwm, hwm]` is zero.
    pub fn valid_watermarks(&self) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, &w)| w == 0 || (self.lwm..=self.hwm).contains(&i))
    }

    /// Lowest and highest word that may hold bits.
    #[inline]
    pub fn watermarks(&self) -> (usize, usize) {
        (self.lwm, self.hwm)
    }

    /// Raw storage words.
    #[inline]
    pub fn words(&self) -> &[u64; RM_WORDS] {
        &self.words
    }

    // =========================================================================
    // Single Locations
    // =========================================================================

    /// Check if a location is in the mask.
    #[inline]
    pub fn member(&self, reg: OptoReg) -> bool {
        let (index, bit) = Self::locate(reg);
        self.words[index] & bit != 0
    }

    /// Add a location, widening the watermarks if needed.
    #[inline]
    pub fn insert(&mut self, reg: OptoReg) {
        let (index, bit) = Self::locate(reg);
        self.hwm = self.hwm.max(index);
        self.lwm = self.lwm.min(index);
        self.words[index] |= bit;
    }

    /// Remove a location. The watermarks are left alone.
    #[inline]
    pub fn remove(&mut self, reg: OptoReg) {
        let (index, bit) = Self::locate(reg);
        self.words[index] &= !bit;
    }

    /// Remove every location.
    #[inline]
    pub fn clear(&mut self) {
        *self = RegMask::new();
    }

    /// Fill the mask, AllStack included.
    #[inline]
    pub fn set_all(&mut self) {
        *self = RegMask::all();
    }

    /// Add `reg` and every location above it, AllStack included.
    pub fn set_all_from(&mut self, reg: OptoReg) {
        let (index, _) = Self::locate(reg);
        let offset = reg.index() as u32 & (WORD_BITS - 1);
        self.words[index] |= ALL << offset;
        for word in &mut self.words[index + 1..] {
            *word = ALL;
        }
        self.lwm = self.lwm.min(index);
        self.hwm = RM_MAX;
    }

    // =========================================================================
    // AllStack
    // =========================================================================

    /// The reserved AllStack bit.
    #[inline]
    pub const fn all_stack_reg() -> OptoReg {
        OptoReg::new(CHUNK_SIZE as i32 - 1)
    }

    /// Check if the mask extends to every stack slot beyond its range.
    #[inline]
    pub fn is_all_stack(&self) -> bool {
        self.words[RM_MAX] >> (WORD_BITS - 1) != 0
    }

    /// Mark the mask as extending to every stack slot beyond its range.
    #[inline]
    pub fn set_all_stack(&mut self) {
        self.insert(Self::all_stack_reg());
    }

    /// Check if a location fits in the mask without touching the AllStack bit.
    #[inline]
    pub const fn can_represent(reg: OptoReg) -> bool {
        reg.index() < CHUNK_SIZE as i32 - 1
    }

    /// Check if an argument slot fits even when it holds the widest value.
    #[inline]
    pub const fn can_represent_arg(reg: OptoReg) -> bool {
        reg.index() < (CHUNK_SIZE - SLOTS_PER_VEC_Z) as i32
    }

    // =========================================================================
    // Set Algebra
    // =========================================================================

    /// Union with another mask (self |= other).
    pub fn union_with(&mut self, other: &RegMask) {
        self.lwm = self.lwm.min(other.lwm);
        self.hwm = self.hwm.max(other.hwm);
        for i in self.range() {
            self.words[i] |= other.words[i];
        }
    }

    /// Intersect with another mask (self &= other).
    pub fn intersect_with(&mut self, other: &RegMask) {
        // Words outside our range are already zero.
        for i in self.range() {
            self.words[i] &= other.words[i];
        }
        // Narrow afterwards so words outside the overlap were zeroed above.
        self.lwm = self.lwm.max(other.lwm);
        self.hwm = self.hwm.min(other.hwm);
    }

    /// Remove every location of another mask (self -= other).
    pub fn subtract(&mut self, other: &RegMask) {
        for i in self.overlap_range(other) {
            self.words[i] &= !other.words[i];
        }
    }

    /// Check if the masks share any location.
    pub fn overlap(&self, other: &RegMask) -> bool {
        self.overlap_range(other)
            .any(|i| self.words[i] & other.words[i] != 0)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check if the mask holds any location.
    #[inline]
    pub fn is_not_empty(&self) -> bool {
        self.range().any(|i| self.words[i] != 0)
    }

    /// Check if the mask holds no location.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.is_not_empty()
    }

    /// Number of locations in the mask.
    pub fn size(&self) -> u32 {
        self.range().map(|i| self.words[i].count_ones()).sum()
    }

    /// Lowest location, or [`OptoReg::BAD`].
    pub fn find_first_elem(&self) -> OptoReg {
        for i in self.range() {
            let bits = self.words[i];
            if bits != 0 {
                return Self::location(i, bits.trailing_zeros());
            }
        }
        OptoReg::BAD
    }

    /// Highest location, or [`OptoReg::BAD`].
    pub fn find_last_elem(&self) -> OptoReg {
        for i in self.range().rev() {
            let bits = self.words[i];
            if bits != 0 {
                return Self::location(i, WORD_BITS - 1 - bits.leading_zeros());
            }
        }
        OptoReg::BAD
    }

    /// Lowest pair in a pair-aligned mask, named by its high half.
    pub fn find_first_pair(&self) -> OptoReg {
        self.find_first_set(2)
    }

    /// Lowest set of `size` in a set-aligned mask, named by its highest slot.
    pub fn find_first_set(&self, size: u32) -> OptoReg {
        match self.find_first_elem() {
            OptoReg::BAD => OptoReg::BAD,
            lo => lo.add(size as i32 - 1),
        }
    }

    /// Check that the `size` slots ending at `reg` are all in the mask.
    pub fn is_valid_reg(&self, reg: OptoReg, size: u32) -> bool {
        (0..size as i32).all(|i| {
            let slot = reg.add(-i);
            slot.is_valid() && self.member(slot)
        })
    }

    /// Iterate over locations in ascending order.
    #[inline]
    pub fn iter(&self) -> RegMaskIterator<'_> {
        RegMaskIterator::new(self)
    }

    // =========================================================================
    // Bound Predicates
    // =========================================================================

    /// Check if the mask holds exactly one location.
    pub fn is_bound1(&self) -> bool {
        !self.is_all_stack() && self.size() == 1
    }

    /// Check if the mask holds exactly one aligned pair.
    pub fn is_bound_pair(&self) -> bool {
        self.is_bound_set(2)
    }

    /// Check if the mask holds exactly one run of `size` locations aligned
    /// to `size`. An empty mask holds no run and fails.
    pub fn is_bound_set(&self, size: u32) -> bool {
        if self.is_all_stack() {
            return false;
        }
        let low = low_bits(size);

        let mut found = false;
        for i in self.range() {
            let word = self.words[i];
            if word == 0 {
                continue;
            }
            if found {
                return false;
            }
            found = true;

            let bit = 1u64 << word.trailing_zeros();
            if bit & low == 0 {
                return false;
            }
            // Aligned runs never cross a word.
            let hi_bit = bit << (size - 1);
            let set = hi_bit | ((hi_bit - 1) & !(bit - 1));
            if set != word {
                return false;
            }
        }
        found
    }

    /// Check if the mask is a single value of kind `ireg`.
    pub fn is_bound(&self, ireg: IdealReg) -> bool {
        if ireg.is_vector() {
            self.is_bound_set(ireg.num_registers())
        } else {
            self.is_bound1() || self.is_bound_pair()
        }
    }

    // =========================================================================
    // Alignment
    // =========================================================================

    /// Check that the mask holds only whole, aligned pairs.
    pub fn is_aligned_pairs(&self) -> bool {
        self.is_aligned_sets(2)
    }

    /// Check that the mask holds only whole runs of `size` aligned to `size`.
    pub fn is_aligned_sets(&self, size: u32) -> bool {
        if size == 1 {
            return true;
        }
        let low = low_bits(size);
        for i in self.range() {
            let mut bits = self.words[i];
            while bits != 0 {
                let bit = 1u64 << bits.trailing_zeros();
                if bit & low == 0 {
                    return false;
                }
                let hi_bit = bit << (size - 1);
                let set = hi_bit | (hi_bit.wrapping_sub(1) & !(bit - 1));
                if bits & set != set {
                    return false;
                }
                bits &= !set;
            }
        }
        true
    }

    /// Check for two locations that do not form an aligned pair.
    pub fn is_misaligned_pair(&self) -> bool {
        self.size() == 2 && !self.is_aligned_pairs()
    }

    /// Keep only whole, aligned pairs.
    pub fn clear_to_pairs(&mut self) {
        for i in self.range() {
            let mut bits = self.words[i];
            bits &= (bits & FIVES) << 1;
            bits |= bits >> 1;
            self.words[i] = bits;
        }
        debug_assert!(self.is_aligned_pairs());
    }

    /// Keep only whole runs of `size` aligned to `size`.
    pub fn clear_to_sets(&mut self, size: u32) {
        if size == 1 {
            return;
        }
        let low = low_bits(size);
        for i in self.range() {
            let bits = self.words[i];
            // Walk each candidate run upward; only complete runs keep their top bit.
            let mut sets = bits & low;
            for _ in 1..size {
                sets = bits & (sets << 1);
            }
            self.words[i] = smear_down(sets, size);
        }
        debug_assert!(self.is_aligned_sets(size));
    }

    /// Grow every location to the whole aligned run of `size` containing it.
    pub fn smear_to_sets(&mut self, size: u32) {
        if size == 1 {
            return;
        }
        let low = low_bits(size);
        for i in self.range() {
            let mut bits = self.words[i];
            let mut sets = 0;
            for _ in 0..size {
                sets |= bits & low;
                bits >>= 1;
            }
            self.words[i] = smear_up(sets, size);
        }
        debug_assert!(self.is_aligned_sets(size));
    }
}

/// Spread each marked top bit down over its run of `size`.
#[inline]
fn smear_down(mut sets: u64, size: u32) -> u64 {
    let mut step = 1;
    while step < size {
        sets |= sets >> step;
        step <<= 1;
    }
    sets
}

/// Spread each marked bottom bit up over its run of `size`.
#[inline]
fn smear_up(mut sets: u64, size: u32) -> u64 {
    let mut step = 1;
    while step < size {
        sets |= sets << step;
        step <<= 1;
    }
    sets
}

impl Default for RegMask {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RegMask {
    fn eq(&self, other: &Self) -> bool {
        // Watermarks are only bounds; the bits decide equality.
        self.words == other.words
    }
}

impl Eq for RegMask {}

impl BitOrAssign<&RegMask> for RegMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: &RegMask) {
        self.union_with(rhs);
    }
}

impl BitAndAssign<&RegMask> for RegMask {
    #[inline]
    fn bitand_assign(&mut self, rhs: &RegMask) {
        self.intersect_with(rhs);
    }
}

impl SubAssign<&RegMask> for RegMask {
    #[inline]
    fn sub_assign(&mut self, rhs: &RegMask) {
        self.subtract(rhs);
    }
}

impl FromIterator<OptoReg> for RegMask {
    fn from_iter<I: IntoIterator<Item = OptoReg>>(iter: I) -> Self {
        RegMask::from_regs(iter)
    }
}

impl fmt::Debug for RegMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_run(
            f: &mut fmt::Formatter<'_>,
            (lo, hi): (i32, i32),
            first: &mut bool,
        ) -> fmt::Result {
            if !*first {
                write!(f, ",")?;
            }
            *first = false;
            if lo == hi {
                write!(f, "R{}", lo)
            } else {
                write!(f, "R{}-R{}", lo, hi)
            }
        }

        write!(f, "[")?;
        let mut first = true;
        let mut run: Option<(i32, i32)> = None;
        let all_stack = Self::all_stack_reg();

        for reg in self.iter().filter(|&r| r != all_stack) {
            let r = reg.index();
            run = match run {
                Some((lo, hi)) if hi + 1 == r => Some((lo, r)),
                Some(done) => {
                    write_run(f, done, &mut first)?;
                    Some((r, r))
                }
                None => Some((r, r)),
            };
        }
        if let Some(done) = run {
            write_run(f, done, &mut first)?;
        }
        if self.is_all_stack() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "...")?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Tests
// =============================================================================
