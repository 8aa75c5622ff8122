//! Transactions the engine applies.

use crate::domain::commit::CommitData;
use crate::domain::contract::ContractData;
use serde::{Deserialize, Serialize};
use shared_types::{Address, PublicKey, Timestamp, TxType};

/// Grantor and reference of a POA-authored transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoaContext {
    pub address: Address,
    pub reference: String,
}

/// Fields shared by every transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnvelope {
    pub hash: String,
    pub chain_id: u32,
    pub timestamp: Timestamp,
    pub nonce: u64,
    pub authoring_address: Address,
    pub authoring_public_key: PublicKey,
    pub poa: Option<PoaContext>,
}

impl TxEnvelope {
    pub fn new(
        hash: impl Into<String>,
        chain_id: u32,
        timestamp: Timestamp,
        authoring_address: impl Into<Address>,
        authoring_public_key: impl Into<PublicKey>,
    ) -> Self {
        Self {
            hash: hash.into(),
            chain_id,
            timestamp,
            nonce: 0,
            authoring_address: authoring_address.into(),
            authoring_public_key: authoring_public_key.into(),
            poa: None,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_poa(mut self, address: impl Into<Address>, reference: impl Into<String>) -> Self {
        self.poa = Some(PoaContext {
            address: address.into(),
            reference: reference.into(),
        });
        self
    }

    pub fn is_poa(&self) -> bool {
        self.poa.is_some()
    }

    /// The address the transaction acts for: the POA grantor, else the
    /// author.
    pub fn effective_address(&self) -> &str {
        self.poa
            .as_ref()
            .map(|poa| poa.address.as_str())
            .unwrap_or(&self.authoring_address)
    }

    pub fn poa_reference(&self) -> &str {
        self.poa.as_ref().map(|poa| poa.reference.as_str()).unwrap_or("")
    }

    /// Kind of the transaction as submitted, given its non-POA kind.
    pub fn tx_type(&self, base: TxType) -> TxType {
        if self.is_poa() {
            base.poa_variant()
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContractTx {
    pub envelope: TxEnvelope,
    pub contract_address: Address,
    pub contract: ContractData,
}

/// Commit to one or more contracts. Only DvP parameter commits may name
/// more than one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitTx {
    pub envelope: TxEnvelope,
    pub contract_addresses: Vec<Address>,
    pub commitment: CommitData,
}

impl CommitTx {
    pub fn single(envelope: TxEnvelope, contract_address: impl Into<Address>, commitment: CommitData) -> Self {
        Self {
            envelope,
            contract_addresses: vec![contract_address.into()],
            commitment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerTx {
    NewContract(NewContractTx),
    Commit(CommitTx),
}

impl LedgerTx {
    pub fn envelope(&self) -> &TxEnvelope {
        match self {
            LedgerTx::NewContract(tx) => &tx.envelope,
            LedgerTx::Commit(tx) => &tx.envelope,
        }
    }
}

/// Why a contract is being processed outside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Something was committed; try to settle.
    Commit,
    /// The contract's scheduled time was reached.
    Time,
}
