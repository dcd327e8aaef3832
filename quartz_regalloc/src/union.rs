//! Neighbor union with early bailout.
//!
//! Deciding whether two live ranges can be coalesced needs the degree of the
//! merged node. Most candidate pairs are rejected, so the union is built
//! incrementally and abandoned the moment the degree reaches the caller's
//! limit.

use crate::ifg::Interference;
use crate::index_set::IndexSet;
use crate::reg_mask::RegMask;
use quartz_arena::BlockArena;

impl IndexSet {
    /// Replace this set with the neighbors of `lr1` and `lr2` whose masks
    /// overlap `mask`, and return the merged node's degree.
    ///
    /// Neighbors restricted to AllStack masks are added to the set but never
    /// counted. Stops as soon as the degree reaches `fail_degree`, leaving the
    /// set partially filled; the returned value is then `>= fail_degree`.
    pub fn lrg_union<G: Interference + ?Sized>(
        &mut self,
        arena: &mut BlockArena,
        lr1: u32,
        lr2: u32,
        fail_degree: u32,
        ifg: &G,
        mask: &RegMask,
    ) -> u32 {
        let degree = self.union_until(arena, lr1, lr2, fail_degree, ifg, mask);
        if arena.config().verify_sets {
            self.verify(arena);
        }
        degree
    }

    fn union_until<G: Interference + ?Sized>(
        &mut self,
        arena: &mut BlockArena,
        lr1: u32,
        lr2: u32,
        fail_degree: u32,
        ifg: &G,
        mask: &RegMask,
    ) -> u32 {
        let mut one = ifg.neighbors(lr1);
        let mut two = ifg.neighbors(lr2);
        // Walk the larger set first; its inserts never collide. Only the sets
        // trade places, so the first walk is still weighed against `lr1`.
        if one.count() < two.count() {
            std::mem::swap(&mut one, &mut two);
        }

        self.clear(arena);
        let mut degree = 0u32;

        let mut elements = one.iterator();
        loop {
            let n = elements.next_elem(arena);
            if n == 0 {
                break;
            }
            let neighbor_mask = ifg.mask(n);
            if !mask.overlap(neighbor_mask) {
                continue;
            }

            self.insert(arena, n);
            if !neighbor_mask.is_all_stack() {
                degree = degree.saturating_add(ifg.degree_contribution(lr1, n));
                if degree >= fail_degree {
                    log::trace!(
                        "lrg_union({}, {}): bailed at degree {} (limit {})",
                        lr1,
                        lr2,
                        degree,
                        fail_degree
                    );
                    return degree;
                }
            }
        }

        let mut elements = two.iterator();
        loop {
            let n = elements.next_elem(arena);
            if n == 0 {
                break;
            }
            let neighbor_mask = ifg.mask(n);
            if !mask.overlap(neighbor_mask) {
                continue;
            }

            if self.insert(arena, n) && !neighbor_mask.is_all_stack() {
                degree = degree.saturating_add(ifg.degree_contribution(lr2, n));
                if degree >= fail_degree {
                    log::trace!(
                        "lrg_union({}, {}): bailed at degree {} (limit {})",
                        lr1,
                        lr2,
                        degree,
                        fail_degree
                    );
                    return degree;
                }
            }
        }

        degree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifg::InterferenceGraph;
    use crate::lrg::LiveRange;
    use crate::reg_mask::OptoReg;

    fn regs(range: std::ops::Range<i32>) -> RegMask {
        range.map(OptoReg::new).collect()
    }

    /// Candidates 1 and 2 with neighbors {3, 4} and {4, 5, 6}.
    /// Lrg 6 only fits in registers 8..16.
    fn graph(arena: &mut BlockArena) -> InterferenceGraph {
        let mut ifg = InterferenceGraph::new(arena, 16);
        for lrg in 1..16 {
            *ifg.lrg_mut(lrg) = LiveRange::new(regs(0..8), 1);
        }
        *ifg.lrg_mut(6) = LiveRange::new(regs(8..16), 1);
        for (a, b) in [(1, 3), (1, 4), (2, 4), (2, 5), (2, 6)] {
            ifg.add_edge(arena, a, b);
        }
        ifg
    }

    #[test]
    fn test_full_union_filters_by_mask() {
        let mut arena = BlockArena::new();
        let ifg = graph(&mut arena);
        let mut union = IndexSet::new(&arena, 16);

        let degree = union.lrg_union(&mut arena, 1, 2, u32::MAX, &ifg, &regs(0..8));

        let members: Vec<u32> = union.iter(&arena).collect();
        assert_eq!(members, vec![3, 4, 5]);
        assert_eq!(degree, 3);
    }

    #[test]
    fn test_shared_neighbor_counted_once() {
        let mut arena = BlockArena::new();
        let ifg = graph(&mut arena);
        let mut union = IndexSet::new(&arena, 16);

        let degree = union.lrg_union(&mut arena, 1, 2, u32::MAX, &ifg, &regs(0..16));

        assert_eq!(union.count(), 4);
        assert_eq!(degree, 4);
    }

    #[test]
    fn test_bails_out_at_fail_degree() {
        let mut arena = BlockArena::new();
        let ifg = graph(&mut arena);
        let mut union = IndexSet::new(&arena, 16);

        let degree = union.lrg_union(&mut arena, 1, 2, 2, &ifg, &regs(0..8));

        assert_eq!(degree, 2);
        assert_eq!(union.count(), 2);
    }

    #[test]
    fn test_all_stack_neighbor_not_counted() {
        let mut arena = BlockArena::new();
        let mut ifg = graph(&mut arena);
        let mut stack = regs(0..8);
        stack.set_all_stack();
        ifg.lrg_mut(5).set_mask(stack);
        let mut union = IndexSet::new(&arena, 16);

        let degree = union.lrg_union(&mut arena, 1, 2, u32::MAX, &ifg, &regs(0..8));

        assert!(union.member(&arena, 5));
        assert_eq!(degree, 2);
    }

    #[test]
    fn test_empty_neighbor_sets() {
        let mut arena = BlockArena::new();
        let ifg = InterferenceGraph::new(&arena, 8);
        let mut union = IndexSet::new(&arena, 8);
        union.insert(&mut arena, 7);

        let degree = union.lrg_union(&mut arena, 1, 2, 0, &ifg, &RegMask::all());

        assert_eq!(degree, 0);
        assert!(union.is_empty());
    }
}
