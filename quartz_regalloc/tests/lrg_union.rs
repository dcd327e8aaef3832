// Neighbor union tests
//
// Runs lrg_union against a hand-built interference oracle so the expected
// union and degree can be computed independently with plain collections.

use proptest::prelude::*;
use quartz_arena::BlockArena;
use quartz_regalloc::{IndexSet, Interference, OptoReg, RegMask};
use std::collections::BTreeSet;

const MAX_LRG: u32 = 300;

/// Interference oracle with per-node masks and widths.
struct Oracle {
    adjs: Vec<IndexSet>,
    masks: Vec<RegMask>,
    widths: Vec<u32>,
}

impl Oracle {
    fn new(arena: &BlockArena) -> Self {
        Oracle {
            adjs: (0..MAX_LRG).map(|_| IndexSet::new(arena, MAX_LRG)).collect(),
            masks: (0..MAX_LRG)
                .map(|i| RegMask::from_reg(OptoReg::new((i % 32) as i32)))
                .collect(),
            widths: vec![1; MAX_LRG as usize],
        }
    }

    fn connect(&mut self, arena: &mut BlockArena, lrg: u32, neighbors: &BTreeSet<u32>) {
        for &n in neighbors {
            self.adjs[lrg as usize].insert(arena, n);
        }
    }
}

impl Interference for Oracle {
    fn neighbors(&self, lrg: u32) -> &IndexSet {
        &self.adjs[lrg as usize]
    }

    fn mask(&self, lrg: u32) -> &RegMask {
        &self.masks[lrg as usize]
    }

    fn degree_contribution(&self, lrg: u32, neighbor: u32) -> u32 {
        self.widths[lrg as usize].max(self.widths[neighbor as usize])
    }
}

fn set(elements: impl IntoIterator<Item = u32>) -> BTreeSet<u32> {
    elements.into_iter().collect()
}

fn low_regs(count: i32) -> RegMask {
    (0..count).map(OptoReg::new).collect()
}

#[test]
fn test_empty_neighbor_sets_yield_zero() {
    let mut arena = BlockArena::new();
    let oracle = Oracle::new(&arena);
    let mut dest = IndexSet::new(&arena, MAX_LRG);

    let degree = dest.lrg_union(&mut arena, 1, 2, 10, &oracle, &RegMask::all());

    assert_eq!(degree, 0);
    assert!(dest.is_empty());
}

#[test]
fn test_zero_limit_returns_after_first_contribution() {
    let mut arena = BlockArena::new();
    let mut oracle = Oracle::new(&arena);
    oracle.connect(&mut arena, 1, &set(10..60));
    oracle.connect(&mut arena, 2, &set(40..90));
    let mut dest = IndexSet::new(&arena, MAX_LRG);

    let degree = dest.lrg_union(&mut arena, 1, 2, 0, &oracle, &RegMask::all());

    assert_eq!(degree, 1);
    assert_eq!(dest.count(), 1);
}

#[test]
fn test_wide_neighbors_weigh_more() {
    let mut arena = BlockArena::new();
    let mut oracle = Oracle::new(&arena);
    oracle.widths[20] = 4;
    oracle.connect(&mut arena, 1, &set([20, 21]));
    let mut dest = IndexSet::new(&arena, MAX_LRG);

    let degree = dest.lrg_union(&mut arena, 1, 2, u32::MAX, &oracle, &RegMask::all());

    assert_eq!(degree, 5);
}

#[test]
fn test_larger_second_set_is_charged_to_first_range() {
    let mut arena = BlockArena::new();
    let mut oracle = Oracle::new(&arena);
    oracle.widths[1] = 3;
    oracle.connect(&mut arena, 1, &set([5]));
    oracle.connect(&mut arena, 2, &set([6, 7]));
    let mut dest = IndexSet::new(&arena, MAX_LRG);

    // {6, 7} is walked first and weighed against lr1, then {5} against lr2.
    let degree = dest.lrg_union(&mut arena, 1, 2, u32::MAX, &oracle, &RegMask::all());

    assert_eq!(degree, 3 + 3 + 1);
    assert_eq!(dest.iter(&arena).collect::<Vec<_>>(), vec![5, 6, 7]);
}

#[test]
fn test_wide_second_range_weighs_smaller_set() {
    let mut arena = BlockArena::new();
    let mut oracle = Oracle::new(&arena);
    oracle.widths[2] = 3;
    oracle.connect(&mut arena, 1, &set([5]));
    oracle.connect(&mut arena, 2, &set([6, 7]));
    let mut dest = IndexSet::new(&arena, MAX_LRG);

    let degree = dest.lrg_union(&mut arena, 1, 2, u32::MAX, &oracle, &RegMask::all());

    assert_eq!(degree, 1 + 1 + 3);
}

#[test]
fn test_trait_object_oracle() {
    let mut arena = BlockArena::new();
    let mut oracle = Oracle::new(&arena);
    oracle.connect(&mut arena, 3, &set([7, 8]));
    let view: &dyn Interference = &oracle;
    let mut dest = IndexSet::new(&arena, MAX_LRG);

    let degree = dest.lrg_union(&mut arena, 3, 4, u32::MAX, view, &low_regs(32));

    assert_eq!(degree, 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: with no limit the union is exactly the mask-filtered union
    #[test]
    fn unlimited_union_is_filtered_union(
        a in prop::collection::btree_set(3..MAX_LRG, 0..80),
        b in prop::collection::btree_set(3..MAX_LRG, 0..80),
        width in 1i32..32,
    ) {
        let mut arena = BlockArena::new();
        let mut oracle = Oracle::new(&arena);
        oracle.connect(&mut arena, 1, &a);
        oracle.connect(&mut arena, 2, &b);
        let mask = low_regs(width);
        let mut dest = IndexSet::new(&arena, MAX_LRG);

        let degree = dest.lrg_union(&mut arena, 1, 2, u32::MAX, &oracle, &mask);

        let expected: Vec<u32> = a
            .union(&b)
            .copied()
            .filter(|&n| oracle.mask(n).overlap(&mask))
            .collect();
        let got: Vec<u32> = dest.iter(&arena).collect();
        prop_assert_eq!(degree as usize, expected.len());
        prop_assert_eq!(got, expected);
    }

    /// Property: a bailout reports at least the limit and never more members
    /// than the full union
    #[test]
    fn bailout_respects_limit(
        a in prop::collection::btree_set(3..MAX_LRG, 1..80),
        b in prop::collection::btree_set(3..MAX_LRG, 0..80),
        limit in 1u32..40,
    ) {
        let mut arena = BlockArena::new();
        let mut oracle = Oracle::new(&arena);
        oracle.connect(&mut arena, 1, &a);
        oracle.connect(&mut arena, 2, &b);
        let mut dest = IndexSet::new(&arena, MAX_LRG);

        let full = a.union(&b).count() as u32;
        let degree = dest.lrg_union(&mut arena, 1, 2, limit, &oracle, &RegMask::all());

        if full >= limit {
            prop_assert_eq!(degree, limit);
        } else {
            prop_assert_eq!(degree, full);
        }
        prop_assert!(dest.count() <= full);
    }
}
