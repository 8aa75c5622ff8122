//! # Standing Offer Flows
//!
//! Exchange and tokens-nominate contracts settle inside each commitment,
//! in whole blocks, against the issuer's holdings.

#[cfg(test)]
mod tests {
    use crate::fixtures::{fund, holding, register_namespace, service, Actor, NOW};
    use shared_crypto::Sha256Hasher;
    use shared_types::{Balance, TxType};
    use sl_03_poa::{PoaDetail, PoaEntry, PoaHeader, PoaItem};
    use sl_04_contracts::domain::signing::{asset_in_message, nominate_asset_message};
    use sl_04_contracts::domain::{
        AssetIn, CommitData, CommitTx, ContractData, ExchangeCommitData, ExchangeContract, LedgerTx,
        NewContractTx, NominateAsset, NominateCommitData, TokensNominateContract, TxEnvelope,
    };
    use sl_04_contracts::{SettlementApi, SettlementService, StateSnapshot};

    // =============================================================================
    // EXCHANGE
    // =============================================================================

    struct Desk {
        issuer: Actor,
        bob: Actor,
        carol: Actor,
        address: String,
    }

    impl Desk {
        fn new() -> Self {
            let issuer = Actor::from_seed(10);
            let address = issuer.contract_address(7);
            Self {
                issuer,
                bob: Actor::from_seed(11),
                carol: Actor::from_seed(12),
                address,
            }
        }

        /// 10 CASH buys 5 BOND, at least one block, no upper limit.
        fn create(&self) -> LedgerTx {
            LedgerTx::NewContract(NewContractTx {
                envelope: self.issuer.envelope("offer", 7),
                contract_address: self.address.clone(),
                contract: ContractData::Exchange(ExchangeContract {
                    inputs: vec![NominateAsset::new("NS", "CASH").with_block_size(10)],
                    outputs: vec![NominateAsset::new("NS", "BOND").with_block_size(5)],
                    min_blocks: Balance::ONE,
                    max_blocks: Balance::ZERO,
                    start_date: NOW,
                    expiry: NOW + 86_400,
                    ..Default::default()
                }),
            })
        }

        fn take(&self, envelope: TxEnvelope, legs: Vec<NominateAsset>) -> LedgerTx {
            LedgerTx::Commit(CommitTx::single(
                envelope,
                self.address.clone(),
                CommitData::Exchange(ExchangeCommitData {
                    assets_in: legs,
                    ..Default::default()
                }),
            ))
        }

        fn opened(&self, service: &mut SettlementService) -> StateSnapshot {
            let mut snapshot = service.new_snapshot();
            fund(&mut snapshot, &self.issuer.address, "NS|BOND", 100);
            fund(&mut snapshot, &self.bob.address, "NS|CASH", 100);
            fund(&mut snapshot, &self.carol.address, "NS|CASH", 40);
            let created = service.apply_tx(&mut snapshot, &self.create(), NOW, false);
            assert!(created.is_pass(), "{created:?}");
            snapshot
        }
    }

    #[test]
    fn test_exchange_settles_whole_blocks_only() {
        let desk = Desk::new();
        let mut service = service();
        let mut snapshot = desk.opened(&mut service);

        let cash = |amount| NominateAsset::new("NS", "CASH").with_amount(amount);
        let partial = service.apply_tx(&mut snapshot, &desk.take(desk.bob.envelope("t1", 0), vec![cash(25)]), NOW, false);
        assert!(partial.is_fail());
        assert!(partial
            .message
            .starts_with("Exchange Commit : Input Asset amount is not a multiple of the Contract block size"));
        assert_eq!(holding(&snapshot, &desk.bob.address, "NS|CASH"), 100);

        let whole = service.apply_tx(&mut snapshot, &desk.take(desk.bob.envelope("t2", 1), vec![cash(30)]), NOW, false);
        assert!(whole.is_pass(), "{whole:?}");
        assert_eq!(holding(&snapshot, &desk.bob.address, "NS|CASH"), 70);
        assert_eq!(holding(&snapshot, &desk.bob.address, "NS|BOND"), 15);
        assert_eq!(holding(&snapshot, &desk.issuer.address, "NS|CASH"), 30);
        assert_eq!(holding(&snapshot, &desk.issuer.address, "NS|BOND"), 85);
    }

    #[test]
    fn test_exchange_input_signed_by_third_party() {
        let desk = Desk::new();
        let mut service = service();
        let mut snapshot = desk.opened(&mut service);

        let mut leg = NominateAsset::new("NS", "CASH")
            .with_amount(20)
            .with_address(desk.carol.address.clone());
        leg.public_key = desk.carol.public_key.clone();
        leg.signature = desk.carol.sign(&nominate_asset_message(&Sha256Hasher, &desk.address, &leg));

        let outcome = service.apply_tx(&mut snapshot, &desk.take(desk.bob.envelope("t1", 0), vec![leg.clone()]), NOW, false);
        assert!(outcome.is_pass(), "{outcome:?}");
        assert_eq!(holding(&snapshot, &desk.carol.address, "NS|CASH"), 20);
        assert_eq!(holding(&snapshot, &desk.bob.address, "NS|CASH"), 100);
        assert_eq!(holding(&snapshot, &desk.bob.address, "NS|BOND"), 10);

        leg.signature = desk.bob.sign(&nominate_asset_message(&Sha256Hasher, &desk.address, &leg));
        let forged = service.apply_tx(&mut snapshot, &desk.take(desk.bob.envelope("t2", 1), vec![leg]), NOW, false);
        assert!(forged.message.starts_with("Exchange Commit : Invalid input signature"));
        assert_eq!(holding(&snapshot, &desk.carol.address, "NS|CASH"), 20);
    }

    #[test]
    fn test_exchange_rejects_commit_before_creation() {
        let desk = Desk::new();
        let mut service = service();
        let mut snapshot = service.new_snapshot();
        fund(&mut snapshot, &desk.bob.address, "NS|CASH", 100);

        let leg = NominateAsset::new("NS", "CASH").with_amount(10);
        let outcome = service.apply_tx(&mut snapshot, &desk.take(desk.bob.envelope("t1", 0), vec![leg]), NOW, false);
        assert_eq!(outcome.message, "Contract Address must exist");
        assert!(outcome.is_fail());
    }

    // =============================================================================
    // TOKENS NOMINATE
    // =============================================================================

    struct Nomination {
        issuer: Actor,
        alice: Actor,
        dave: Actor,
        address: String,
    }

    impl Nomination {
        fn new() -> Self {
            let issuer = Actor::from_seed(20);
            let address = issuer.contract_address(0);
            Self {
                issuer,
                alice: Actor::from_seed(21),
                dave: Actor::from_seed(22),
                address,
            }
        }

        /// 5 IN converts into 1 OUT, minted by the namespace owner.
        fn opened(&self, service: &mut SettlementService) -> StateSnapshot {
            let mut snapshot = service.new_snapshot();
            register_namespace(&mut snapshot, "NS", &self.issuer.address, &["IN", "OUT"]);
            fund(&mut snapshot, &self.issuer.address, "NS|IN", 0);
            fund(&mut snapshot, &self.alice.address, "NS|IN", 37);

            let create = LedgerTx::NewContract(NewContractTx {
                envelope: self.issuer.envelope("nominate", 0),
                contract_address: self.address.clone(),
                contract: ContractData::TokensNominate(TokensNominateContract {
                    namespace: "NS".to_string(),
                    input_class: "IN".to_string(),
                    output_class: "OUT".to_string(),
                    block_size_in: Balance::new(5),
                    block_size_out: Balance::ONE,
                    expiry: NOW + 86_400,
                    ..Default::default()
                }),
            });
            let created = service.apply_tx(&mut snapshot, &create, NOW, false);
            assert!(created.is_pass(), "{created:?}");
            snapshot
        }

        fn commit(&self, envelope: TxEnvelope, legs: Vec<AssetIn>) -> LedgerTx {
            LedgerTx::Commit(CommitTx::single(
                envelope,
                self.address.clone(),
                CommitData::Nominate(NominateCommitData {
                    contract_address: self.address.clone(),
                    namespace: "NS".to_string(),
                    class_id: "IN".to_string(),
                    assets_in: legs,
                }),
            ))
        }
    }

    fn own(amount: i128) -> AssetIn {
        AssetIn {
            amount: Balance::new(amount),
            ..Default::default()
        }
    }

    #[test]
    fn test_nominate_converts_whole_blocks_and_mints() {
        let nomination = Nomination::new();
        let mut service = service();
        let mut snapshot = nomination.opened(&mut service);

        let outcome = service.apply_tx(
            &mut snapshot,
            &nomination.commit(nomination.alice.envelope("n1", 0), vec![own(37)]),
            NOW,
            false,
        );
        assert!(outcome.is_pass(), "{outcome:?}");
        assert_eq!(holding(&snapshot, &nomination.alice.address, "NS|IN"), 2);
        assert_eq!(holding(&snapshot, &nomination.alice.address, "NS|OUT"), 7);
        assert_eq!(holding(&snapshot, &nomination.issuer.address, "NS|IN"), 35);
        assert_eq!(holding(&snapshot, &nomination.issuer.address, "NS|OUT"), -7);
    }

    #[test]
    fn test_nominate_leg_signed_for_another_client() {
        let nomination = Nomination::new();
        let mut service = service();
        let mut snapshot = nomination.opened(&mut service);
        fund(&mut snapshot, &nomination.dave.address, "NS|IN", 0);

        let envelope = nomination.dave.envelope("n1", 4);
        let mut leg = AssetIn {
            address: nomination.alice.address.clone(),
            public_key: nomination.alice.public_key.clone(),
            amount: Balance::new(10),
            signature: String::new(),
        };
        leg.signature = nomination.alice.sign(&asset_in_message(
            &nomination.address,
            &leg,
            &envelope.authoring_address,
            envelope.nonce,
        ));

        let outcome = service.apply_tx(&mut snapshot, &nomination.commit(envelope, vec![leg.clone()]), NOW, false);
        assert!(outcome.is_pass(), "{outcome:?}");
        assert_eq!(holding(&snapshot, &nomination.alice.address, "NS|IN"), 27);
        assert_eq!(holding(&snapshot, &nomination.alice.address, "NS|OUT"), 2);

        // The signature binds the author's nonce.
        let replay = nomination.commit(nomination.dave.envelope("n2", 5), vec![leg]);
        let outcome = service.apply_tx(&mut snapshot, &replay, NOW, false);
        assert_eq!(outcome.message, "Nominate : Commitment signature invalid.");
        assert_eq!(holding(&snapshot, &nomination.alice.address, "NS|IN"), 27);
    }

    #[test]
    fn test_nominate_under_poa_consumes_quota() {
        let nomination = Nomination::new();
        let mut service = service();
        let mut snapshot = nomination.opened(&mut service);

        let grantor = nomination.alice.address.as_str();
        let mut header = PoaEntry::header(grantor);
        header.set_reference(PoaHeader {
            reference: "r1".to_string(),
            start: NOW - 60,
            expiry: NOW + 3_600,
        });
        snapshot.poas.add(header);
        snapshot.poas.add(PoaEntry::detail(
            grantor,
            PoaDetail {
                reference: "r1".to_string(),
                issuer: grantor.to_string(),
                attorney: nomination.dave.address.clone(),
                start: NOW - 60,
                end: NOW + 3_600,
                items: vec![PoaItem::new(
                    TxType::CommitToContract,
                    Balance::new(10),
                    [nomination.address.clone()],
                )],
            },
        ));
        let on_behalf = |hash: &str| nomination.dave.envelope(hash, 0).with_poa(grantor, "r1");

        let over = service.apply_tx(&mut snapshot, &nomination.commit(on_behalf("p1"), vec![own(15)]), NOW, false);
        assert!(over.is_fail());
        assert!(over.message.starts_with("No remaining allowance for"), "{over:?}");
        assert_eq!(holding(&snapshot, grantor, "NS|IN"), 37);

        let within = service.apply_tx(&mut snapshot, &nomination.commit(on_behalf("p2"), vec![own(10)]), NOW, false);
        assert!(within.is_pass(), "{within:?}");
        assert_eq!(holding(&snapshot, grantor, "NS|IN"), 27);
        assert_eq!(holding(&snapshot, grantor, "NS|OUT"), 2);
        assert!(snapshot.poas.find(grantor).is_none());

        let spent = service.apply_tx(&mut snapshot, &nomination.commit(on_behalf("p3"), vec![own(5)]), NOW, false);
        assert_eq!(spent.message, format!("No POAs for POA Address {grantor}"));
    }
}
