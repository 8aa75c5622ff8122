//! POA resolution, checking, consumption and tidying.

use crate::domain::entry::{full_reference, PoaDetail, PoaEntry};
use crate::domain::errors::PoaError;
use ledger_telemetry::{log_event, subsystems};
use shared_types::{Address, Balance, Checked, Outcome, Timestamp, TxType};
use sl_01_state_store::KeyedStore;

/// What a transaction wants to do under a POA.
#[derive(Debug, Clone, Copy)]
pub struct PoaRequest<'a> {
    /// The grantor whose authority is being exercised.
    pub poa_address: &'a str,
    pub reference: &'a str,
    /// The author of the transaction.
    pub attorney: &'a str,
    pub tx_type: TxType,
    /// Every asset the transaction touches; empty ids match any item.
    pub assets: &'a [&'a str],
    pub amount: Balance,
}

/// Handle to the exact item a check matched, for consumption after the
/// transaction has been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoaGrant {
    pub address: Address,
    pub reference: String,
    pub tx_type: TxType,
    pub item_index: usize,
}

/// Resolve the detail record of `reference` granted by `poa_address`.
///
/// The header must hold the reference and be valid at `now`. The detail is
/// read for write unless `check_only`.
pub fn get_poa_detail_entry<S>(
    store: &mut S,
    now: Timestamp,
    poa_address: &str,
    reference: &str,
    check_only: bool,
) -> Checked<PoaDetail>
where
    S: KeyedStore<PoaEntry> + ?Sized,
{
    let header = store.find(poa_address).ok_or_else(|| {
        Outcome::fail_or_warn(check_only, format!("No POAs for POA Address {poa_address}"))
    })?;

    let window = header.reference(reference).ok_or_else(|| {
        Outcome::fail_or_warn(
            check_only,
            format!("POA `{reference}` is null for address {poa_address}."),
        )
    })?;
    if !window.is_valid_at(now) {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!("POA `{reference}` for address {poa_address} is not valid at time {now}."),
        ));
    }

    let key = full_reference(poa_address, reference);
    let entry = if check_only {
        store.find(&key).cloned()
    } else {
        store.find_and_mark_updated(&key).map(|entry| entry.clone())
    };
    let entry = entry.ok_or_else(|| {
        Outcome::fail_or_warn(
            check_only,
            format!("No POA detail entry for reference {reference}"),
        )
    })?;

    entry.poa_detail().cloned().ok_or_else(|| {
        Outcome::fail_or_warn(check_only, format!("No POA detail for reference {reference}"))
    })
}

fn format_assets(assets: &[&str]) -> String {
    format!("[{}]", assets.join(", "))
}

/// Find the first item of `detail` that covers the request.
///
/// An item covers it when it is for the transaction kind, matches every
/// non-empty asset id and still has at least `amount` left. Returns the item's
/// index.
pub fn check_poa_detail(detail: &PoaDetail, request: &PoaRequest<'_>) -> Checked<usize> {
    let reference = request.reference;
    if request.assets.is_empty() {
        return Err(Outcome::fail(format!(
            "Can not match empty Asset ID to poa item `{reference}`"
        )));
    }
    if request.attorney != detail.attorney {
        return Err(Outcome::fail(format!(
            "This POA `{reference}` is not for this attorney address {}",
            request.attorney
        )));
    }

    let candidates = detail.items_for(request.tx_type);
    if candidates.is_empty() {
        return Err(Outcome::fail(format!(
            "No POA item for this effective TX Type : {}",
            request.tx_type
        )));
    }

    let mut no_allowance = false;
    for index in candidates {
        let item = &detail.items[index];
        let matches_all = request
            .assets
            .iter()
            .all(|asset| asset.is_empty() || item.match_asset(asset));
        if !matches_all {
            continue;
        }
        if item.amount < request.amount {
            no_allowance = true;
        } else {
            return Ok(index);
        }
    }

    if no_allowance {
        return Err(Outcome::fail(format!(
            "No remaining allowance for {} in PoA `{reference}`",
            format_assets(request.assets)
        )));
    }
    Err(Outcome::fail(format!(
        "Asset ID(s) `{}` do(es) not match poa item `{reference}`",
        format_assets(request.assets)
    )))
}

/// Resolve and check a POA without consuming anything.
pub fn check_poa_transaction_permissions<S>(
    store: &mut S,
    now: Timestamp,
    request: &PoaRequest<'_>,
    check_only: bool,
) -> Checked<PoaGrant>
where
    S: KeyedStore<PoaEntry> + ?Sized,
{
    let detail = get_poa_detail_entry(
        store,
        now,
        request.poa_address,
        request.reference,
        check_only,
    )?;
    let item_index = check_poa_detail(&detail, request)?;
    Ok(PoaGrant {
        address: request.poa_address.to_string(),
        reference: request.reference.to_string(),
        tx_type: request.tx_type,
        item_index,
    })
}

/// Consume `amount` from a previously checked grant and tidy the reference
/// once the item is used up. Returns the item's remaining allowance.
pub fn consume_poa_grant<S>(
    store: &mut S,
    grant: &PoaGrant,
    amount: Balance,
    now: Timestamp,
) -> Result<Balance, PoaError>
where
    S: KeyedStore<PoaEntry> + ?Sized,
{
    let key = full_reference(&grant.address, &grant.reference);
    let detail = store
        .find_and_mark_updated(&key)
        .and_then(PoaEntry::poa_detail_mut)
        .ok_or_else(|| PoaError::DetailMissing {
            address: grant.address.clone(),
            reference: grant.reference.clone(),
        })?;

    let item = detail
        .items
        .get_mut(grant.item_index)
        .filter(|item| item.tx_type == grant.tx_type)
        .ok_or_else(|| PoaError::ItemMissing {
            reference: grant.reference.clone(),
            tx_type: grant.tx_type,
            index: grant.item_index,
        })?;

    let remaining = item.consume(amount);
    let consumed = item.consumed();
    log_event!(
        debug,
        subsystems::POA,
        "POA allowance consumed",
        grantor = %grant.address,
        reference = %grant.reference,
        amount = %amount,
        remaining = %remaining
    );

    if consumed {
        tidy_poa_reference(store, now, &grant.reference, &grant.address);
    }
    Ok(remaining)
}

/// Remove whatever is left of a reference that can no longer be used.
///
/// Expired references, references without a detail record and fully consumed
/// grants are removed; a header left without references is deleted too.
pub fn tidy_poa_reference<S>(store: &mut S, now: Timestamp, reference: &str, poa_address: &str)
where
    S: KeyedStore<PoaEntry> + ?Sized,
{
    let key = full_reference(poa_address, reference);
    let (drop_reference, delete_detail) = {
        let Some(header) = store.find(poa_address) else {
            return;
        };
        match header.reference(reference) {
            None => (false, false),
            Some(window) if window.expiry < now => (true, true),
            Some(_) => match store.find(&key) {
                None => (true, false),
                Some(entry) => match entry.poa_detail() {
                    None => (true, true),
                    Some(detail) => {
                        let exhausted = detail.sum_amounts().is_ok_and(|sum| sum.is_zero());
                        (exhausted, exhausted)
                    }
                },
            },
        }
    };

    if delete_detail {
        store.delete(&key);
    }
    let remaining = match store.find_and_mark_updated(poa_address) {
        Some(header) => {
            if drop_reference {
                header.remove_reference(reference);
            }
            header.reference_count()
        }
        None => return,
    };
    if drop_reference {
        log_event!(
            debug,
            subsystems::POA,
            "POA reference removed",
            grantor = %poa_address,
            reference = %reference
        );
    }
    if remaining == 0 {
        store.delete(poa_address);
    }
}
