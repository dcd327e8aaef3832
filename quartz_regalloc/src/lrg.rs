//! Live ranges.
//!
//! A [`LiveRange`] carries what the allocator knows about one virtual value:
//! where it may legally live, how many adjacent registers it needs, and its
//! current degree in the interference graph.

use crate::reg_mask::{IdealReg, RegMask};

/// Mask size reported for a live range that may live anywhere on the stack.
pub const ALL_STACK_SIZE: u32 = 65535;

bitflags::bitflags! {
    /// Properties of a live range.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LrgFlags: u8 {
        /// Fat projection: kills many registers at once.
        const FAT_PROJ = 1 << 0;
        /// Mask holds exactly one legal placement. Kept in sync with the mask.
        const IS_BOUND = 1 << 1;
        /// Holds a vector value.
        const IS_VECTOR = 1 << 2;
        /// Already split or spilled once.
        const WAS_SPILLED = 1 << 3;
    }
}

/// One live range of the register allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRange {
    mask: RegMask,
    num_regs: u32,
    flags: LrgFlags,
    degree: u32,
}

impl LiveRange {
    /// Create a live range needing `num_regs` adjacent registers.
    pub fn new(mask: RegMask, num_regs: u32) -> Self {
        debug_assert!(num_regs > 0, "live range needs at least one register");
        let mut range = LiveRange {
            mask,
            num_regs,
            flags: LrgFlags::empty(),
            degree: 0,
        };
        range.refresh_bound();
        range
    }

    /// Create a live range holding one value of kind `kind`.
    pub fn for_kind(mask: RegMask, kind: IdealReg) -> Self {
        let mut range = LiveRange::new(mask, kind.num_registers());
        if kind.is_vector() {
            range.flags.insert(LrgFlags::IS_VECTOR);
            range.refresh_bound();
        }
        range
    }

    /// Builder: add flags.
    pub fn with_flags(mut self, flags: LrgFlags) -> Self {
        self.flags.insert(flags);
        self.refresh_bound();
        self
    }

    /// Recompute [`LrgFlags::IS_BOUND`] from the mask.
    fn refresh_bound(&mut self) {
        let bound = if self.is_vector() {
            self.mask.is_bound_set(self.num_regs)
        } else {
            self.mask.is_bound1() || self.mask.is_bound_pair()
        };
        self.flags.set(LrgFlags::IS_BOUND, bound);
    }

    /// Degree this live range contributes to a neighbor `other`.
    ///
    /// A fat projection blocks every combination of registers, so the
    /// product is used; otherwise the wider of the two dominates.
    #[inline]
    pub fn compute_degree(&self, other: &LiveRange) -> u32 {
        if self.is_fat_proj() || other.is_fat_proj() {
            self.num_regs * other.num_regs
        } else {
            self.num_regs.max(other.num_regs)
        }
    }

    /// Number of legal locations; [`ALL_STACK_SIZE`] for AllStack masks.
    #[inline]
    pub fn mask_size(&self) -> u32 {
        if self.mask.is_all_stack() {
            ALL_STACK_SIZE
        } else {
            self.mask.size()
        }
    }

    /// Legal locations left once this range's own registers are taken.
    /// Negative when the mask cannot even hold the value.
    #[inline]
    pub fn degrees_of_freedom(&self) -> i32 {
        self.mask_size() as i32 - self.num_regs as i32
    }

    /// True if coloring is guaranteed whatever the neighbors pick.
    #[inline]
    pub fn lo_degree(&self) -> bool {
        (self.degree as i64) <= self.degrees_of_freedom() as i64
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Legal locations.
    #[inline]
    pub fn mask(&self) -> &RegMask {
        &self.mask
    }

    /// Replace the legal locations.
    pub fn set_mask(&mut self, mask: RegMask) {
        self.mask = mask;
        self.refresh_bound();
    }

    /// Registers needed.
    #[inline]
    pub fn num_regs(&self) -> u32 {
        self.num_regs
    }

    /// Flag bits.
    #[inline]
    pub fn flags(&self) -> LrgFlags {
        self.flags
    }

    /// Mutable flag bits.
    #[inline]
    pub fn flags_mut(&mut self) -> &mut LrgFlags {
        &mut self.flags
    }

    /// Cached effective degree.
    #[inline]
    pub fn degree(&self) -> u32 {
        self.degree
    }

    /// Store the effective degree.
    #[inline]
    pub fn set_degree(&mut self, degree: u32) {
        self.degree = degree;
    }

    #[inline]
    pub(crate) fn inc_degree(&mut self, by: u32) {
        self.degree = self.degree.saturating_add(by);
    }

    #[inline]
    pub(crate) fn dec_degree(&mut self, by: u32) {
        debug_assert!(self.degree >= by, "degree underflow");
        self.degree = self.degree.saturating_sub(by);
    }

    /// Check for a fat projection.
    #[inline]
    pub fn is_fat_proj(&self) -> bool {
        self.flags.contains(LrgFlags::FAT_PROJ)
    }

    /// Check whether the mask leaves exactly one placement.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.flags.contains(LrgFlags::IS_BOUND)
    }

    /// Check for a vector value.
    #[inline]
    pub fn is_vector(&self) -> bool {
        self.flags.contains(LrgFlags::IS_VECTOR)
    }
}

impl Default for LiveRange {
    /// A single-register range with no legal location yet.
    fn default() -> Self {
        LiveRange::new(RegMask::new(), 1)
    }
}
