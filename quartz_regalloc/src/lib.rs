//! Quartz Register Allocation Sets
//!
//! The set primitives of a graph-coloring register allocator.
//!
//! # Architecture
//!
//! - **IndexSet**: sparse bit set over live range numbers, built from
//!   256-bit arena blocks. One per live range holds its interference
//!   neighbors.
//!
//! - **RegMask**: fixed 512-bit set of machine locations with watermarks
//!   bounding the nonzero words. The top bit (AllStack) stands for every
//!   stack slot beyond the mask.
//!
//! - **Interference graph**: [`InterferenceGraph`] owns one neighbor set and
//!   one [`LiveRange`] per live range. Algorithms see it through the
//!   [`Interference`] trait.
//!
//! - **Coalescing**: [`IndexSet::lrg_union`] merges two neighbor sets and
//!   gives up once the merged degree is too high;
//!   [`ConservativeCoalesce`] turns that into a yes/no decision.
//!
//! # Usage
//!
//! ```
//! use quartz_arena::BlockArena;
//! use quartz_regalloc::{ConservativeCoalesce, InterferenceGraph, LiveRange, OptoReg, RegMask};
//!
//! let mut arena = BlockArena::new();
//! let mut ifg = InterferenceGraph::new(&arena, 8);
//! let gprs: RegMask = (0..4).map(OptoReg::new).collect();
//! for lrg in 1..8 {
//!     *ifg.lrg_mut(lrg) = LiveRange::new(gprs.clone(), 1);
//! }
//! ifg.add_edge(&mut arena, 1, 3);
//! ifg.add_edge(&mut arena, 2, 4);
//!
//! let mut coalesce = ConservativeCoalesce::new(&arena, 8);
//! assert!(coalesce.test(&mut arena, &ifg, 1, 2).is_profitable());
//! ```
//!
//! # Arenas
//!
//! Sets never own their storage. Every operation that touches block contents
//! takes the [`BlockArena`](quartz_arena::BlockArena) explicitly, and a set
//! is only valid until that arena's next `reset()`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coalesce;
pub mod ifg;
pub mod index_set;
pub mod lrg;
pub mod reg_mask;

mod union;

pub use coalesce::{CoalesceDecision, ConservativeCoalesce};
pub use ifg::{Interference, InterferenceGraph};
pub use index_set::{IndexSet, IndexSetIterator};
pub use lrg::{ALL_STACK_SIZE, LiveRange, LrgFlags};
pub use reg_mask::{IdealReg, OptoReg, RegMask, RegMaskIterator};
