//! # Shared Types Crate
//!
//! Ledger primitives shared by every settlement subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: addresses, asset identifiers, balances and
//!   transaction kinds are defined once here.
//! - **Outcomes are values**: every transaction-level decision is an
//!   [`Outcome`] (`PASS`, `WARNING`, `FAIL` plus a message). Validation steps
//!   return [`Checked<T>`] so a rejection threads through `?`.
//! - **Injected collaborators**: signature verification, address derivation
//!   and message hashing are traits ([`SignatureVerifier`], [`MessageHasher`])
//!   passed into the engine, never global singletons.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | `entities` | `Address`, `Balance`, `TxType`, `AddressType`, permission bits |
//! | `outcome` | `SuccessType`, `Outcome`, `Checked<T>` |
//! | `security` | Verifier and hasher collaborator traits |
//! | `errors` | `BalanceError` |

pub mod entities;
pub mod errors;
pub mod outcome;
pub mod security;

pub use entities::*;
pub use errors::*;
pub use outcome::*;
pub use security::*;
