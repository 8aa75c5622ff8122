//! # Integration Flows
//!
//! Cross-crate flows driven through [`sl_04_contracts::SettlementService`]:
//!
//! 1. **DvP**: create, commit, settle on request, retry on shortfall, expire
//! 2. **Standing offers**: exchange and tokens-nominate commits settle in
//!    whole blocks
//! 3. **Layers**: provisional layers, encumbrance modes and POA quotas
//!    composed over one snapshot
//! 4. **Properties**: conservation and block arithmetic under proptest

pub mod dvp;
pub mod layers;
pub mod offers;
pub mod properties;
