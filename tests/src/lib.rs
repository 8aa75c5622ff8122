//! # Settlement Ledger Test Suite
//!
//! Unified test crate exercising the engine end to end, with real Ed25519
//! keys and SHA-256 message digests.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Keyed actors, wired service, funded snapshots
//! └── integration/      # Cross-crate flows and properties
//!     ├── dvp.rs        # DvP create / commit / settle / expire
//!     ├── offers.rs     # Exchange and tokens-nominate standing offers
//!     ├── layers.rs     # Snapshot layering, encumbrances, POA quotas
//!     └── properties.rs # proptest invariants
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sl-tests
//!
//! # By category
//! cargo test -p sl-tests integration::dvp
//! cargo test -p sl-tests integration::properties
//!
//! # Benchmarks
//! cargo bench -p sl-tests
//! ```

pub mod fixtures;
pub mod integration;
