use shared_types::TxType;

/// Address permission data the POA rules read from the ledger.
pub trait PermissionLookup {
    // === Address Permissions ===

    /// Permission bitmask of `address`, zero when the address is unknown.
    fn address_permissions(&self, address: &str) -> u64;

    /// Has `address` been explicitly authorised for `tx_type`?
    fn can_use_tx(&self, address: &str, tx_type: TxType) -> bool;

    // === Configuration ===

    /// Are on-chain address permissions enforced?
    fn authorise_by_address(&self) -> bool;
}
