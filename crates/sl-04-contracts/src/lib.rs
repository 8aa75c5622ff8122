//! # sl-04-contracts
//!
//! Contract lifecycle engine and settlement service for the settlement
//! ledger.
//!
//! ## Contract Families
//!
//! | Family | Created by | Settles |
//! |--------|-----------|---------|
//! | DvP (`dvp_uk`) | issuer, with parties, parameters and authorisations | once every party, payment and authorisation is signed, on a settlement request |
//! | Exchange (`exchange`) | issuer, with input and output legs in blocks | inside each commit, in whole blocks |
//! | Tokens nominate (`tokens_nominate`) | issuer, with an input and an output class | inside each commit, in whole blocks |
//!
//! ## Flow
//!
//! ```text
//!   LedgerTx ──► SettlementService::apply_tx
//!                    │  child layer
//!                    ▼
//!               engine::apply_tx ──► dvp / exchange / nominate
//!                    │
//!                    ├─ events buffered in the layer
//!                    └─ settlement requests queued
//!
//!   settle_pending(now) ──► queued requests, then due time events
//!   flush_events(sink)  ──► events that reached the root layer
//! ```
//!
//! ## Collaborators
//!
//! | Trait | Purpose | Reference implementation |
//! |-------|---------|--------------------------|
//! | `SignatureVerifier` | address, key and signature checks | `shared-crypto::Ed25519Verifier` |
//! | `MessageHasher` | digests of signed leg descriptions | `shared-crypto::Sha256Hasher` |
//! | [`MathEvaluator`](ports::MathEvaluator) | formula-valued DvP amounts | [`SimpleMathEvaluator`](adapters::SimpleMathEvaluator) |
//! | [`EventSink`](ports::EventSink) | contract and life-cycle notifications | [`RecordingEventSink`](adapters::RecordingEventSink) |

pub mod adapters;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod service;

pub use domain::{LedgerTx, StateConfig, StateSnapshot};
pub use engine::Collaborators;
pub use ports::{EventSink, MathEvaluator, SettlementApi};
pub use service::{ServiceConfig, ServiceStats, SettlementService};

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adapters::{RecordingEventSink, SimpleMathEvaluator};
    pub use crate::domain::{
        AddressEntry, AssetIn, CommitData, CommitTx, ContractData, ContractEntry, ContractFamily, DvpAmount,
        DvpCommitData, DvpContract, DvpParty, DvpPayItem, DvpReceiveItem, EventKind, ExchangeCommitData,
        ExchangeContract, LedgerEvent, LedgerTx, LifeCycleKind, NamespaceEntry, NewContractTx, NominateAsset,
        NominateCommitData, SettlementError, StateConfig, StateSnapshot, TokensNominateContract, TxEnvelope,
    };
    pub use crate::engine::Collaborators;
    pub use crate::ports::{EventSink, MathError, MathEvaluator, SettlementApi};
    pub use crate::service::{ServiceConfig, ServiceStats, SettlementService};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
