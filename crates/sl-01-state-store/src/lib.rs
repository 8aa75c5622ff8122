//! # sl-01-state-store
//!
//! Versioned copy-on-write state store for the settlement ledger.
//!
//! ## Role in System
//!
//! - **Speculative execution**: every transaction runs in a child layer; a
//!   check-only run or a rejected transaction simply discards it.
//! - **Dirty tracking**: `find` reads, `find_and_mark_updated` reads for write
//!   and records the key so persistence can diff touched entries.
//! - **Corruption**: a layer that saw a fault after mutation began is marked
//!   corrupted and can no longer be committed.
//!
//! ## Layer Model
//!
//! ```text
//!   layer 2 (tx)      { "addr-b": Live(7) }            arena_mark = 6
//!   layer 1 (block)   { "addr-a": Live(5), "c": Deleted } arena_mark = 5
//!   layer 0 (root)    { "addr-a": Live(0), "addr-b": Live(1), "c": Live(2) }
//!                      ─────────────────────────────────────────────
//!   arena             [a0, b0, c0, ..., a1, ..., b2]
//! ```
//!
//! Entries live in one arena and layers map keys to arena slots.
//! `discard` drops the top layer and truncates the arena back to its mark;
//! `commit` folds the top layer's slots into its parent. The arena is
//! compacted whenever a commit lands on the root layer.
//!
//! ## Components
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`VersionedCollection`] | Keyed entries (contracts, balances, POAs, ...) |
//! | [`VersionedLog`] | Append-only event buffers that follow the same layers |
//! | [`SnapshotStatus`] | Per-layer corruption flag |

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;
