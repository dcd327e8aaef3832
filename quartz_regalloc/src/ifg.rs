//! Interference Graph
//!
//! Square adjacency representation: every live range owns an [`IndexSet`]
//! of the live ranges it interferes with, and every edge is recorded in both
//! endpoints' sets. Live range `0` is reserved and never has neighbors.
//!
//! # Degrees
//!
//! Degrees are not maintained by `add_edge`. Once the graph is built,
//! [`InterferenceGraph::compute_effective_degree`] caches each live range's
//! effective degree; `remove_node`, `re_insert` and `union_neighbors` keep
//! the cache current from then on.

use crate::index_set::IndexSet;
use crate::lrg::LiveRange;
use crate::reg_mask::RegMask;
use quartz_arena::BlockArena;
use rustc_hash::FxHashSet;
use std::mem;

// =============================================================================
// Interference Trait
// =============================================================================

/// What set algorithms need to know about the interference graph.
pub trait Interference {
    /// Live ranges interfering with `lrg`.
    fn neighbors(&self, lrg: u32) -> &IndexSet;

    /// Legal locations of `lrg`.
    fn mask(&self, lrg: u32) -> &RegMask;

    /// Degree `neighbor` adds to `lrg`.
    fn degree_contribution(&self, lrg: u32, neighbor: u32) -> u32;
}

// =============================================================================
// Interference Graph
// =============================================================================

/// Interference graph over live ranges `1..max_lrg`.
pub struct InterferenceGraph {
    /// Neighbor set per live range.
    adjs: Vec<IndexSet>,
    /// Live range data, indexed like `adjs`.
    lrgs: Vec<LiveRange>,
    /// Live ranges currently yanked by `remove_node`.
    yanked: FxHashSet<u32>,
    max_lrg: u32,
}

impl InterferenceGraph {
    /// Create a graph with no edges for live ranges below `max_lrg`.
    pub fn new(arena: &BlockArena, max_lrg: u32) -> Self {
        InterferenceGraph {
            adjs: (0..max_lrg).map(|_| IndexSet::new(arena, max_lrg)).collect(),
            lrgs: vec![LiveRange::default(); max_lrg as usize],
            yanked: FxHashSet::default(),
            max_lrg,
        }
    }

    /// Exclusive upper bound on live range numbers.
    #[inline]
    pub fn max_lrg(&self) -> u32 {
        self.max_lrg
    }

    /// Live range data.
    #[inline]
    pub fn lrg(&self, lrg: u32) -> &LiveRange {
        &self.lrgs[lrg as usize]
    }

    /// Mutable live range data.
    #[inline]
    pub fn lrg_mut(&mut self, lrg: u32) -> &mut LiveRange {
        &mut self.lrgs[lrg as usize]
    }

    /// Neighbors of `lrg`.
    #[inline]
    pub fn neighbors(&self, lrg: u32) -> &IndexSet {
        &self.adjs[lrg as usize]
    }

    /// Number of neighbors of `lrg`.
    #[inline]
    pub fn neighbor_count(&self, lrg: u32) -> u32 {
        self.adjs[lrg as usize].count()
    }

    /// Record that `a` and `b` interfere. Returns true if the edge is new.
    pub fn add_edge(&mut self, arena: &mut BlockArena, a: u32, b: u32) -> bool {
        debug_assert_ne!(a, b, "live range cannot interfere with itself");
        self.adjs[a as usize].insert(arena, b);
        self.adjs[b as usize].insert(arena, a)
    }

    /// Check whether `a` and `b` interfere.
    #[inline]
    pub fn test_edge(&self, arena: &BlockArena, a: u32, b: u32) -> bool {
        self.adjs[a as usize].member(arena, b)
    }

    /// Check whether `lrg` is currently yanked.
    #[inline]
    pub fn is_yanked(&self, lrg: u32) -> bool {
        self.yanked.contains(&lrg)
    }

    /// Yank `lrg` out of its neighbors' sets, lowering their degrees.
    ///
    /// The node keeps its own neighbor set so `re_insert` can undo this.
    pub fn remove_node(&mut self, arena: &mut BlockArena, lrg: u32) -> &IndexSet {
        debug_assert!(!self.is_yanked(lrg), "lrg {} yanked twice", lrg);
        self.yanked.insert(lrg);

        let adj = self.take_adj(arena, lrg);
        let mut elements = adj.iterator();
        loop {
            let n = elements.next_elem(arena);
            if n == 0 {
                break;
            }
            self.adjs[n as usize].remove(arena, lrg);
            let lost = self.lrgs[lrg as usize].compute_degree(&self.lrgs[n as usize]);
            self.lrgs[n as usize].dec_degree(lost);
        }
        log::trace!("ifg: yanked lrg {} from {} neighbors", lrg, adj.count());
        self.adjs[lrg as usize] = adj;

        &self.adjs[lrg as usize]
    }

    /// Put a yanked `lrg` back into its neighbors' sets.
    pub fn re_insert(&mut self, arena: &mut BlockArena, lrg: u32) {
        debug_assert!(self.is_yanked(lrg), "lrg {} was not yanked", lrg);
        self.yanked.remove(&lrg);

        let adj = self.take_adj(arena, lrg);
        let mut elements = adj.iterator();
        loop {
            let n = elements.next_elem(arena);
            if n == 0 {
                break;
            }
            if self.adjs[n as usize].insert(arena, lrg) {
                let gained = self.lrgs[lrg as usize].compute_degree(&self.lrgs[n as usize]);
                self.lrgs[n as usize].inc_degree(gained);
            }
        }
        self.adjs[lrg as usize] = adj;
    }

    /// Add the edges of `b` to `a`, as when `b` is coalesced into `a`.
    ///
    /// Both endpoints of every new edge get their degree raised. An edge
    /// between `a` and `b` is not carried over.
    pub fn union_neighbors(&mut self, arena: &mut BlockArena, a: u32, b: u32) {
        debug_assert_ne!(a, b);
        let adj = self.take_adj(arena, b);

        // Reverse edges and degrees for the neighbors `a` does not have yet.
        let mut elements = adj.iterator();
        loop {
            let n = elements.next_elem(arena);
            if n == 0 {
                break;
            }
            if n == a || self.adjs[a as usize].member(arena, n) {
                continue;
            }
            self.adjs[n as usize].insert(arena, a);
            let gained = self.lrgs[a as usize].compute_degree(&self.lrgs[n as usize]);
            self.lrgs[a as usize].inc_degree(gained);
            self.lrgs[n as usize].inc_degree(gained);
        }

        let merged = &mut self.adjs[a as usize];
        merged.union_with(arena, &adj);
        merged.remove(arena, a);
        self.adjs[b as usize] = adj;
    }

    /// Sum of the degree contributions of every neighbor of `lrg`.
    pub fn effective_degree(&self, arena: &BlockArena, lrg: u32) -> u32 {
        let this = &self.lrgs[lrg as usize];
        self.adjs[lrg as usize]
            .iter(arena)
            .map(|n| this.compute_degree(&self.lrgs[n as usize]))
            .fold(0u32, u32::saturating_add)
    }

    /// Cache the effective degree of every live range that is not yanked.
    pub fn compute_effective_degree(&mut self, arena: &BlockArena) {
        for lrg in 1..self.max_lrg {
            if self.is_yanked(lrg) {
                continue;
            }
            let degree = self.effective_degree(arena, lrg);
            self.lrgs[lrg as usize].set_degree(degree);
        }
    }

    /// Drop every edge and forget yanked state. Live range data is kept.
    pub fn clear(&mut self, arena: &mut BlockArena) {
        for adj in &mut self.adjs {
            adj.clear(arena);
        }
        for lrg in &mut self.lrgs {
            lrg.set_degree(0);
        }
        self.yanked.clear();
    }

    /// Move `lrg`'s set out so other sets can be mutated while it is walked.
    /// The caller puts it back.
    fn take_adj(&mut self, arena: &BlockArena, lrg: u32) -> IndexSet {
        mem::replace(&mut self.adjs[lrg as usize], IndexSet::new(arena, 0))
    }
}

impl Interference for InterferenceGraph {
    #[inline]
    fn neighbors(&self, lrg: u32) -> &IndexSet {
        InterferenceGraph::neighbors(self, lrg)
    }

    #[inline]
    fn mask(&self, lrg: u32) -> &RegMask {
        self.lrgs[lrg as usize].mask()
    }

    #[inline]
    fn degree_contribution(&self, lrg: u32, neighbor: u32) -> u32 {
        self.lrgs[lrg as usize].compute_degree(&self.lrgs[neighbor as usize])
    }
}

impl std::fmt::Debug for InterferenceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterferenceGraph")
            .field("max_lrg", &self.max_lrg)
            .field("yanked", &self.yanked.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
