//! # Layered State Flows
//!
//! Provisional layers over a whole snapshot, composed with the encumbrance
//! ledger and POA quotas.

#[cfg(test)]
mod tests {
    use crate::fixtures::{fund, holding, service, Actor, NOW};
    use shared_crypto::{Ed25519Verifier, Sha256Hasher};
    use shared_types::{Balance, Outcome, TxType};
    use sl_01_state_store::Layered;
    use sl_02_encumbrances::{AddMode, AddressEncumbrances, EncumbranceDetail, EncumbranceEntry, Priority};
    use sl_03_poa::{
        check_poa_transaction_permissions, consume_poa_grant, PoaDetail, PoaEntry, PoaHeader, PoaItem, PoaRequest,
    };
    use sl_04_contracts::adapters::SimpleMathEvaluator;
    use sl_04_contracts::domain::{ContractData, ExchangeContract, LedgerTx, NewContractTx, NominateAsset};
    use sl_04_contracts::engine::{self, Collaborators};
    use sl_04_contracts::{SettlementApi, StateSnapshot};

    fn exchange(issuer: &Actor) -> LedgerTx {
        LedgerTx::NewContract(NewContractTx {
            envelope: issuer.envelope("offer", 0),
            contract_address: issuer.contract_address(0),
            contract: ContractData::Exchange(ExchangeContract {
                inputs: vec![NominateAsset::new("NS", "CASH").with_block_size(10)],
                outputs: vec![NominateAsset::new("NS", "BOND").with_block_size(1)],
                expiry: NOW + 600,
                ..Default::default()
            }),
        })
    }

    fn encumbrance(reference: &str, amount: i128, beneficiary: &str) -> EncumbranceEntry {
        EncumbranceEntry::new(
            reference,
            Balance::new(amount),
            vec![EncumbranceDetail::open(beneficiary)],
            Vec::new(),
        )
    }

    // =============================================================================
    // CHECK-ONLY
    // =============================================================================

    #[test]
    fn test_check_only_contract_is_never_stored() {
        let issuer = Actor::from_seed(30);
        let mut service = service();
        let mut snapshot = service.new_snapshot();

        let outcome = service.apply_tx(&mut snapshot, &exchange(&issuer), NOW, true);
        assert_eq!(outcome, Outcome::check_only());
        assert_eq!(outcome.message, "Check Only.");
        assert!(snapshot.contracts.find(&issuer.contract_address(0)).is_none());
        assert!(snapshot.events.is_empty());
    }

    #[test]
    fn test_engine_check_only_without_service_layer() {
        let issuer = Actor::from_seed(31);
        let verifier = Ed25519Verifier::new();
        let math = SimpleMathEvaluator::new();
        let ctx = Collaborators::new(&verifier, &Sha256Hasher, &math);
        let mut snapshot = StateSnapshot::new(Default::default());

        let outcome = engine::apply_tx(&ctx, &mut snapshot, &exchange(&issuer), NOW, true);
        assert_eq!(outcome, Outcome::check_only());
        assert!(snapshot.contracts.is_empty());

        let outcome = engine::apply_tx(&ctx, &mut snapshot, &exchange(&issuer), NOW, false);
        assert!(outcome.is_pass(), "{outcome:?}");
        assert!(snapshot.contracts.find(&issuer.contract_address(0)).is_some());
    }

    #[test]
    fn test_other_chain_is_ignored() {
        let issuer = Actor::from_seed(32);
        let mut service = service();
        let mut snapshot = service.new_snapshot();

        let LedgerTx::NewContract(mut tx) = exchange(&issuer) else {
            unreachable!()
        };
        tx.envelope.chain_id = 99;
        let outcome = service.apply_tx(&mut snapshot, &LedgerTx::NewContract(tx), NOW, false);
        assert_eq!(outcome, Outcome::pass("Transaction for another chain ignored."));
        assert!(snapshot.contracts.is_empty());
    }

    // =============================================================================
    // LAYERS
    // =============================================================================

    #[test]
    fn test_discarded_layer_rolls_back_every_collection() {
        let alice = Actor::from_seed(33);
        let mut snapshot = service().new_snapshot();
        fund(&mut snapshot, &alice.address, "NS|X", 10);

        snapshot.create_snapshot();
        fund(&mut snapshot, &alice.address, "NS|X", 99);
        let mut locks = AddressEncumbrances::new(alice.address.clone());
        assert!(locks
            .set_encumbrance_entry("NS|X", encumbrance("R1", 5, "beneficiary"), Priority::Normal, AddMode::Cumulative)
            .unwrap());
        snapshot.encumbrances.add(locks);
        snapshot.lock_asset("NS|X");
        assert_eq!(snapshot.depth(), 2);

        snapshot.discard().unwrap();
        assert_eq!(snapshot.depth(), 1);
        assert_eq!(holding(&snapshot, &alice.address, "NS|X"), 10);
        assert!(snapshot.encumbrances.find(&alice.address).is_none());
        assert!(!snapshot.is_asset_locked("NS|X"));
    }

    #[test]
    fn test_nested_layers_fold_into_parent() {
        let alice = Actor::from_seed(34);
        let mut snapshot = service().new_snapshot();
        fund(&mut snapshot, &alice.address, "NS|X", 10);

        snapshot.create_snapshot();
        fund(&mut snapshot, &alice.address, "NS|X", 20);
        snapshot.create_snapshot();
        fund(&mut snapshot, &alice.address, "NS|X", 30);
        snapshot.commit().unwrap();
        assert_eq!(holding(&snapshot, &alice.address, "NS|X"), 30);
        snapshot.discard().unwrap();
        assert_eq!(holding(&snapshot, &alice.address, "NS|X"), 10);
    }

    #[test]
    fn test_corrupted_layer_cannot_be_kept() {
        let mut snapshot = service().new_snapshot();
        snapshot.create_snapshot();
        snapshot.set_corrupted("simulated fault");
        assert!(snapshot.commit().is_err());
        snapshot.discard().unwrap();
        assert!(!snapshot.is_corrupted());
    }

    #[test]
    fn test_corrupted_state_rejects_new_contract() {
        let issuer = Actor::from_seed(38);
        let mut service = service();
        let mut snapshot = service.new_snapshot();
        snapshot.set_corrupted("earlier-tx");

        let outcome = service.apply_tx(&mut snapshot, &exchange(&issuer), NOW, false);
        assert!(outcome.is_fail());
        assert!(snapshot.contracts.find(&issuer.contract_address(0)).is_none());
        assert!(snapshot.is_corrupted());
        assert_eq!(service.stats().accepted, 0);
    }

    // =============================================================================
    // ENCUMBRANCES
    // =============================================================================

    #[test]
    fn test_exclusive_duplicate_reference_is_refused() {
        let alice = Actor::from_seed(35);
        let mut snapshot = service().new_snapshot();
        snapshot.encumbrances.add(AddressEncumbrances::new(alice.address.clone()));

        let locks = snapshot.encumbrances.find_and_mark_updated(&alice.address).unwrap();
        let first = locks
            .set_encumbrance_entry("NS|X", encumbrance("R1", 100, "bank"), Priority::Normal, AddMode::Exclusive)
            .unwrap();
        let second = locks
            .set_encumbrance_entry("NS|X", encumbrance("R1", 50, "bank"), Priority::Normal, AddMode::Exclusive)
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(locks.encumbrance_total("NS|X"), Balance::new(100));

        let cumulative = locks
            .set_encumbrance_entry("NS|X", encumbrance("R1", 50, "bank"), Priority::Normal, AddMode::Cumulative)
            .unwrap();
        assert!(cumulative);
        assert_eq!(locks.encumbrance_total("NS|X"), Balance::new(150));
    }

    // =============================================================================
    // POA QUOTAS
    // =============================================================================

    #[test]
    fn test_poa_quota_is_checked_then_consumed() {
        let grantor = Actor::from_seed(36);
        let attorney = Actor::from_seed(37);
        let mut snapshot = service().new_snapshot();

        let mut header = PoaEntry::header(grantor.address.clone());
        header.set_reference(PoaHeader {
            reference: "q".to_string(),
            start: NOW - 1,
            expiry: NOW + 60,
        });
        snapshot.poas.add(header);
        snapshot.poas.add(PoaEntry::detail(
            &grantor.address,
            PoaDetail {
                reference: "q".to_string(),
                issuer: grantor.address.clone(),
                attorney: attorney.address.clone(),
                start: NOW - 1,
                end: NOW + 60,
                items: vec![PoaItem::new(TxType::CommitToContract, Balance::new(10), ["NS|A"])],
            },
        ));

        let request = |amount: i128| PoaRequest {
            poa_address: &grantor.address,
            reference: "q",
            attorney: &attorney.address,
            tx_type: TxType::CommitToContract,
            assets: &["NS|A"],
            amount: Balance::new(amount),
        };

        let refused = check_poa_transaction_permissions(&mut snapshot.poas, NOW, &request(15), false);
        assert_eq!(
            refused.unwrap_err().message,
            "No remaining allowance for [NS|A] in PoA `q`"
        );

        let grant = check_poa_transaction_permissions(&mut snapshot.poas, NOW, &request(10), false).unwrap();
        let remaining = consume_poa_grant(&mut snapshot.poas, &grant, Balance::new(10), NOW).unwrap();
        assert_eq!(remaining, Balance::ZERO);
        assert!(snapshot.poas.find(&grantor.address).is_none());
        assert!(check_poa_transaction_permissions(&mut snapshot.poas, NOW, &request(1), false).is_err());
    }
}
