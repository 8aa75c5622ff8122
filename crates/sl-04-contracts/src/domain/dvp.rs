//! # DvP Contract Payload
//!
//! Delivery-versus-payment: every party pays and receives a list of assets
//! and the contract settles only when, per asset, payments equal receipts.
//!
//! Amounts are either fixed or a formula over the contract's parameters.
//! Formulas are resolved when the contract settles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{full_asset_id, Address, AssetId, Balance, PublicKey, Signature, Timestamp};
use sl_02_encumbrances::EncumbranceDetail;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Encumbrance references that may not be created by a contract.
pub const ISSUER_LOCK: &str = "ISSUER_LOCK";
pub const HOLDER_LOCK: &str = "HOLDER_LOCK";

/// A fixed amount or a formula over contract parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DvpAmount {
    Fixed(Balance),
    Formula(String),
}

impl DvpAmount {
    pub fn fixed(&self) -> Option<Balance> {
        match self {
            DvpAmount::Fixed(amount) => Some(*amount),
            DvpAmount::Formula(_) => None,
        }
    }
}

impl Default for DvpAmount {
    fn default() -> Self {
        DvpAmount::Fixed(Balance::ZERO)
    }
}

impl fmt::Display for DvpAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DvpAmount::Fixed(amount) => write!(f, "{amount}"),
            DvpAmount::Formula(expression) => f.write_str(expression),
        }
    }
}

/// Value of a contract parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    Number(Decimal),
    Expression(String),
}

impl Default for ParameterValue {
    fn default() -> Self {
        ParameterValue::Number(Decimal::ZERO)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(value) => write!(f, "{value}"),
            ParameterValue::Expression(expression) => f.write_str(expression),
        }
    }
}

/// A named input to the contract's formulas.
///
/// Unless `calculation_only`, a parameter is supplied and signed by the
/// holder of `address` (a key or an address).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpParameter {
    pub value: ParameterValue,
    /// Evaluation order; ties are broken by name.
    pub calculated_index: i32,
    pub calculation_only: bool,
    pub contract_specific: bool,
    pub address: String,
    pub signature: Signature,
    pub poa_public_key: PublicKey,
}

impl DvpParameter {
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// An approval the contract waits for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpAuthorisation {
    pub id: String,
    /// Public key or address of the authoriser.
    pub address: String,
    pub signature: Signature,
    pub poa_public_key: PublicKey,
    pub refused: bool,
    pub contract_specific: bool,
    pub metadata: String,
}

impl DvpAuthorisation {
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Encumbrance created for a recipient when the contract completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpAddEncumbrance {
    /// Public key or address of the holder to encumber.
    pub public_key: String,
    pub asset_id: AssetId,
    pub reference: String,
    pub amount: DvpAmount,
    pub beneficiaries: Vec<EncumbranceDetail>,
    pub administrators: Vec<EncumbranceDetail>,
    pub signature: Signature,
    pub poa_public_key: PublicKey,
}

impl DvpAddEncumbrance {
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Encumbrance the contract may draw payments from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpEncumbrance {
    /// Reference of the encumbrance; empty means the contract address.
    pub name: String,
    pub use_creator_encumbrance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpPayItem {
    pub address: Address,
    pub namespace: String,
    pub class_id: String,
    pub amount: DvpAmount,
    pub public_key: PublicKey,
    pub signature: Signature,
    /// Paid by the namespace owner straight out of issuance.
    pub issuance: bool,
    /// Encumbrance to draw from instead of the contract's.
    pub encumbrance: String,
    pub metadata: String,
}

impl DvpPayItem {
    pub fn asset_id(&self) -> AssetId {
        full_asset_id(&self.namespace, &self.class_id)
    }

    pub fn is_signed(&self) -> bool {
        !self.public_key.is_empty() && !self.signature.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpReceiveItem {
    pub address: Address,
    pub namespace: String,
    pub class_id: String,
    pub amount: DvpAmount,
}

impl DvpReceiveItem {
    pub fn asset_id(&self) -> AssetId {
        full_asset_id(&self.namespace, &self.class_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpParty {
    pub id: String,
    pub sig_address: Address,
    pub public_key: PublicKey,
    pub signature: Signature,
    pub must_sign: bool,
    pub pay_list: Vec<DvpPayItem>,
    pub receive_list: Vec<DvpReceiveItem>,
}

impl DvpParty {
    pub fn is_signed(&self) -> bool {
        !self.sig_address.is_empty() && !self.public_key.is_empty() && !self.signature.is_empty()
    }
}

/// Family payload of a DvP contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvpContract {
    pub start_date: Timestamp,
    pub expiry: Timestamp,
    pub parties: Vec<DvpParty>,
    pub parameters: BTreeMap<String, DvpParameter>,
    pub authorisations: Vec<DvpAuthorisation>,
    pub add_encumbrances: Vec<DvpAddEncumbrance>,
    pub encumbrance: Option<DvpEncumbrance>,
    pub protocol: String,
    pub metadata: String,
}

impl DvpContract {
    /// Does the contract draw payments from an encumbrance?
    pub fn uses_encumbrance(&self) -> bool {
        self.encumbrance
            .as_ref()
            .is_some_and(|enc| enc.use_creator_encumbrance)
    }

    /// Name of the encumbrance payments draw from, if any. An empty name
    /// stands for the contract address.
    pub fn encumbrance_name<'a>(&'a self, contract_address: &'a str) -> Option<&'a str> {
        let encumbrance = self.encumbrance.as_ref()?;
        if !encumbrance.use_creator_encumbrance {
            return None;
        }
        if encumbrance.name.is_empty() {
            Some(contract_address)
        } else {
            Some(encumbrance.name.as_str())
        }
    }

    /// Next time the contract needs attention after `now`, `None` once
    /// nothing is left to do.
    pub fn next_time_event(&self, now: Timestamp, completed: bool) -> Option<Timestamp> {
        if completed {
            None
        } else if self.start_date > now && self.start_date < self.expiry {
            Some(self.start_date)
        } else {
            Some(self.expiry)
        }
    }

    /// Assign ids to parties that have none: "1", "2", ... skipping ids
    /// already in use. Returns `false` if two parties share an id.
    pub fn assign_party_ids(&mut self) -> bool {
        let mut used = BTreeSet::new();
        for party in &self.parties {
            if !party.id.is_empty() && !used.insert(party.id.clone()) {
                return false;
            }
        }
        let mut next = 1u32;
        for party in self.parties.iter_mut().filter(|p| p.id.is_empty()) {
            let mut id = next.to_string();
            while used.contains(&id) {
                next += 1;
                id = next.to_string();
            }
            next += 1;
            used.insert(id.clone());
            party.id = id;
        }
        true
    }

    /// Every address named by the contract.
    pub fn addresses(&self) -> BTreeSet<Address> {
        let mut addresses = BTreeSet::new();
        for party in &self.parties {
            if !party.sig_address.is_empty() {
                addresses.insert(party.sig_address.clone());
            }
            for pay in party.pay_list.iter().filter(|p| !p.address.is_empty()) {
                addresses.insert(pay.address.clone());
            }
            for receive in party.receive_list.iter().filter(|r| !r.address.is_empty()) {
                addresses.insert(receive.address.clone());
            }
        }
        addresses
    }
}
