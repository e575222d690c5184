//! Skip List Module
//!
//! Ordered in-memory map backing the store.
//!
//! ## Responsibilities
//! - Expected O(log n) insert, search and remove
//! - Ordered iteration (used by snapshot persistence)
//! - Probabilistic balancing with no rebalancing passes
//!
//! ## Layout
//! ```text
//!  level 3  head ───────────────────────────▶ [k7] ─────────────▶ nil
//!  level 2  head ──────────▶ [k3] ──────────▶ [k7] ─────────────▶ nil
//!  level 1  head ─▶ [k1] ──▶ [k3] ─▶ [k5] ──▶ [k7] ──────────▶ nil
//!  level 0  head ─▶ [k1] ─▶ [k2] ─▶ [k3] ─▶ [k5] ─▶ [k7] ─▶ [k9] ─▶ nil
//! ```
//!
//! Nodes live in an arena (`Vec` of slots) and link to each other by index.
//! Removing a node frees its slot for reuse by a later insert.
//!
//! ## Concurrency
//! None. The list is owned by the single reactor thread; `&mut self` is the
//! only synchronization.

mod list;

pub use list::{Iter, SkipList};

/// Maximum tower height of any node (and of the head sentinel)
pub const MAX_LEVEL: usize = 16;
