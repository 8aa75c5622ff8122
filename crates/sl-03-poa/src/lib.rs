//! # sl-03-poa
//!
//! Delegated authorization (power of attorney) for the settlement ledger.
//!
//! A grantor issues a POA under a reference, naming an attorney and a set of
//! quota items. Each item covers one transaction kind, a set of asset
//! patterns and a remaining amount.
//!
//! ## Storage Layout
//!
//! ```text
//! "grantor"            → PoaEntry::Header { reference → PoaHeader { start, expiry } }
//! "grantor|reference"  → PoaEntry::Detail { PoaDetail { attorney, items: [PoaItem] } }
//! ```
//!
//! ## Check, Then Consume
//!
//! | Step | Function | Mutates |
//! |------|----------|---------|
//! | Resolve | [`get_poa_detail_entry`] | marks the detail updated unless validate-only |
//! | Check | [`check_poa_detail`] / [`check_poa_transaction_permissions`] | no |
//! | Consume | [`consume_poa_grant`] | yes, tidies exhausted grants |
//!
//! Checks hand back a [`PoaGrant`] handle so the caller can consume the exact
//! item it validated once the whole transaction has been accepted. Legs that
//! draw on the same `(grantor, reference)` are aggregated by
//! [`PoaCheckGroup`] and checked once with the combined amount.

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;
