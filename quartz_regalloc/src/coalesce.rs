//! Conservative Coalescing
//!
//! Two copy-related live ranges may be merged only if the merged node is
//! still guaranteed a color. The test restricts both ranges to their common
//! legal locations and asks [`IndexSet::lrg_union`] whether the union of
//! their neighbors stays below that many locations.

use crate::ifg::Interference;
use crate::index_set::IndexSet;
use crate::reg_mask::RegMask;
use quartz_arena::BlockArena;

/// Added to the size of an AllStack mask so stack-capable pairs always
/// have room.
const ALL_STACK_BONUS: u32 = 1_000_000;

/// Outcome of a coalescing test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalesceDecision {
    /// Merged node stays colorable.
    Profitable {
        /// Degree of the merged node.
        degree: u32,
    },
    /// Merged node could run out of colors.
    TooConstrained {
        /// Degree reached before giving up.
        degree: u32,
    },
    /// The ranges interfere with each other.
    Interferes,
    /// The ranges share no legal location.
    NoCommonRegister,
}

impl CoalesceDecision {
    /// Check if the pair should be merged.
    #[inline]
    pub fn is_profitable(self) -> bool {
        matches!(self, CoalesceDecision::Profitable { .. })
    }
}

/// Reusable driver for the conservative coalescing test.
///
/// Owns the scratch set the neighbor union is built in. After a profitable
/// test the scratch set holds the merged neighbors.
pub struct ConservativeCoalesce {
    scratch: IndexSet,
}

impl ConservativeCoalesce {
    /// Create a driver for live ranges below `max_lrg`.
    pub fn new(arena: &BlockArena, max_lrg: u32) -> Self {
        ConservativeCoalesce {
            scratch: IndexSet::new(arena, max_lrg),
        }
    }

    /// Re-initialize after the arena was reset or the graph grew.
    pub fn reset(&mut self, arena: &mut BlockArena, max_lrg: u32) {
        self.scratch.initialize(arena, max_lrg);
    }

    /// Decide whether `lr1` and `lr2` can be merged.
    pub fn test<G: Interference + ?Sized>(
        &mut self,
        arena: &mut BlockArena,
        ifg: &G,
        lr1: u32,
        lr2: u32,
    ) -> CoalesceDecision {
        if ifg.neighbors(lr1).member(arena, lr2) {
            log::debug!("coalesce {} + {}: ranges interfere", lr1, lr2);
            return CoalesceDecision::Interferes;
        }

        let common = Self::common_mask(ifg, lr1, lr2);
        let mut limit = common.size();
        if common.is_all_stack() {
            limit += ALL_STACK_BONUS;
        }
        if limit == 0 {
            log::debug!("coalesce {} + {}: no common register", lr1, lr2);
            return CoalesceDecision::NoCommonRegister;
        }

        let degree = self
            .scratch
            .lrg_union(arena, lr1, lr2, limit, ifg, &common);

        let decision = if degree < limit {
            CoalesceDecision::Profitable { degree }
        } else {
            CoalesceDecision::TooConstrained { degree }
        };
        log::debug!(
            "coalesce {} + {}: {:?} with {} common locations",
            lr1,
            lr2,
            decision,
            limit
        );
        decision
    }

    /// Neighbors gathered by the last test. Complete only after a
    /// profitable decision.
    #[inline]
    pub fn merged_neighbors(&self) -> &IndexSet {
        &self.scratch
    }

    /// Common mask of two live ranges.
    pub fn common_mask<G: Interference + ?Sized>(ifg: &G, lr1: u32, lr2: u32) -> RegMask {
        let mut common = ifg.mask(lr1).clone();
        common &= ifg.mask(lr2);
        common
    }
}
