//! Commitment payloads carried by commit transactions.

use crate::domain::contract::ContractFamily;
use crate::domain::dvp::{DvpAmount, ParameterValue};
use crate::domain::exchange::NominateAsset;
use serde::{Deserialize, Serialize};
use shared_types::{full_asset_id, Address, AssetId, Balance, PublicKey, Signature};

/// Party signature over the contract address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCommit {
    pub id: String,
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// Signature of one pay item, by index into the matched party's pay list.
/// The paying address is derived from `public_key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCommit {
    pub index: usize,
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// Receiving address of one receive item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptCommit {
    pub index: usize,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelCommit {
    pub public_key: PublicKey,
    pub signature: Signature,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterCommit {
    pub name: String,
    pub value: Option<ParameterValue>,
    pub public_key: PublicKey,
    pub signature: Signature,
    pub contract_specific: bool,
}

impl ParameterCommit {
    /// Text of the value as it appears in the signed message.
    pub fn value_text(&self) -> String {
        self.value.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorisationCommit {
    pub id: String,
    pub public_key: PublicKey,
    pub signature: Signature,
    pub refused: bool,
    pub contract_specific: bool,
    pub metadata: String,
}

/// Signature of one add-encumbrance, matched by asset, reference and amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncumbranceCommit {
    pub asset_id: AssetId,
    pub reference: String,
    pub amount: DvpAmount,
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// Everything a DvP commit may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpCommitData {
    pub party: Option<PartyCommit>,
    pub payments: Vec<PaymentCommit>,
    pub receipts: Vec<ReceiptCommit>,
    pub cancel: Option<CancelCommit>,
    pub parameters: Vec<ParameterCommit>,
    pub authorisations: Vec<AuthorisationCommit>,
    pub encumbrances: Vec<EncumbranceCommit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCommitData {
    pub contract_address: Address,
    /// Where the outputs go; empty means the effective author.
    pub to_address: Address,
    pub assets_in: Vec<NominateAsset>,
}

/// One client leg of a nominate commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIn {
    pub address: Address,
    pub public_key: PublicKey,
    pub amount: Balance,
    pub signature: Signature,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominateCommitData {
    pub contract_address: Address,
    pub namespace: String,
    pub class_id: String,
    pub assets_in: Vec<AssetIn>,
}

impl NominateCommitData {
    pub fn asset_id(&self) -> AssetId {
        full_asset_id(&self.namespace, &self.class_id)
    }
}

/// Family-tagged commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitData {
    Dvp(DvpCommitData),
    Exchange(ExchangeCommitData),
    Nominate(NominateCommitData),
}

impl CommitData {
    /// Family of contract this commitment is for.
    pub fn family(&self) -> ContractFamily {
        match self {
            CommitData::Dvp(_) => ContractFamily::Dvp,
            CommitData::Exchange(_) => ContractFamily::Exchange,
            CommitData::Nominate(_) => ContractFamily::TokensNominate,
        }
    }
}
