//! # sl-02-encumbrances
//!
//! Encumbrance ledger: named, prioritised locks against an address's holding
//! of one asset.
//!
//! ## Model
//!
//! ```text
//! AddressEncumbrances (one per address, stored in the state store)
//!   └── asset id ──→ AssetEncumbrances
//!                      ├── EncumbranceEntry { reference, amount, priority, beneficiaries, administrators }
//!                      ├── EncumbranceEntry ...
//!                      └── total (cached)
//! ```
//!
//! Entries are kept sorted by priority (lower = honoured first). Availability
//! is a prefix sum computed on demand: a reference is only backed by what is
//! left of the holding once every earlier entry has been honoured.
//!
//! ## Add Semantics
//!
//! | Mode | Reference already present | Result |
//! |------|---------------------------|--------|
//! | `Exclusive` | yes | rejected (`false`), nothing changes |
//! | `Cumulative` | yes, same beneficiaries/administrators | amounts accumulate |
//! | `Cumulative` | yes, different authorisation sets | rejected |
//! | either | no | appended after existing entries (or first, if `High`) |
//!
//! Adjacent fragments of the same reference are merged, keeping the earlier
//! priority.

pub mod domain;

pub use domain::*;
