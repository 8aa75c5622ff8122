use crate::ports::PermissionLookup;
use shared_types::permissions::AP_POA_EXERCISES;
use shared_types::{Checked, Outcome, TxType};

/// Direct (non-POA) permission check: the author needs either an explicit
/// authorisation for `tx_type` or one of `required` bits.
pub fn check_address_permissions<P: PermissionLookup + ?Sized>(
    lookup: &P,
    address: &str,
    tx_type: TxType,
    required: u64,
) -> Checked<()> {
    let has_permission = lookup.can_use_tx(address, tx_type);
    if !has_permission && lookup.address_permissions(address) & required == 0 {
        return Err(Outcome::fail("Inadequate Address permissioning"));
    }
    Ok(())
}

/// Permission check for a POA-authored transaction.
///
/// The attorney must be allowed to exercise POAs, and the grantor must hold
/// the permission the underlying transaction needs. Skipped entirely unless
/// address permissions are enforced.
pub fn check_poa_address_permissions<P: PermissionLookup + ?Sized>(
    lookup: &P,
    attorney: &str,
    poa_address: &str,
    poa_tx: TxType,
    effective_tx: TxType,
    required: u64,
) -> Checked<()> {
    if !lookup.authorise_by_address() {
        return Ok(());
    }

    let attorney_permissions = lookup.address_permissions(attorney);
    if !lookup.can_use_tx(attorney, poa_tx) && attorney_permissions & AP_POA_EXERCISES == 0 {
        return Err(Outcome::fail(format!(
            "No POA_Exercise permission for Attorney Address {attorney}"
        )));
    }

    let grantor_permissions = if poa_address.eq_ignore_ascii_case(attorney) {
        attorney_permissions
    } else {
        lookup.address_permissions(poa_address)
    };
    if !lookup.can_use_tx(poa_address, effective_tx) && grantor_permissions & required == 0 {
        return Err(Outcome::fail(format!(
            "No Tx permission for POA Address {poa_address}"
        )));
    }
    Ok(())
}
