//! # DvP Flows
//!
//! A two-party swap created by an issuer, completed by the second party's
//! commitment and settled from the service queue.

#[cfg(test)]
mod tests {
    use crate::fixtures::{fund, holding, service, Actor, NOW};
    use shared_crypto::Sha256Hasher;
    use shared_types::{Balance, Outcome};
    use sl_04_contracts::adapters::RecordingEventSink;
    use sl_04_contracts::domain::signing::pay_item_message;
    use sl_04_contracts::domain::{
        CommitData, CommitTx, ContractData, DvpAmount, DvpCommitData, DvpContract, DvpParty, DvpPayItem,
        DvpReceiveItem, LedgerTx, LifeCycleKind, NewContractTx, PartyCommit, PaymentCommit,
    };
    use sl_04_contracts::{ServiceStats, SettlementApi, SettlementService, StateSnapshot};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Swap {
        issuer: Actor,
        alice: Actor,
        bob: Actor,
        address: String,
    }

    impl Swap {
        fn new() -> Self {
            let issuer = Actor::from_seed(1);
            let address = issuer.contract_address(0);
            Self {
                issuer,
                alice: Actor::from_seed(2),
                bob: Actor::from_seed(3),
                address,
            }
        }

        fn pay(&self, who: &Actor, class_id: &str, amount: i128) -> DvpPayItem {
            DvpPayItem {
                address: who.address.clone(),
                namespace: "NS".to_string(),
                class_id: class_id.to_string(),
                amount: DvpAmount::Fixed(Balance::new(amount)),
                ..Default::default()
            }
        }

        fn signed_pay(&self, who: &Actor, class_id: &str, amount: i128) -> DvpPayItem {
            let mut item = self.pay(who, class_id, amount);
            item.public_key = who.public_key.clone();
            item.signature = who.sign(&pay_item_message(&Sha256Hasher, &self.address, &item));
            item
        }

        fn receive(&self, who: &Actor, class_id: &str, amount: i128) -> DvpReceiveItem {
            DvpReceiveItem {
                address: who.address.clone(),
                namespace: "NS".to_string(),
                class_id: class_id.to_string(),
                amount: DvpAmount::Fixed(Balance::new(amount)),
            }
        }

        /// Alice pays 50 X for 50 Y from Bob. Alice signs up front when
        /// `alice_signs`; Bob signs only when `bob_signs`.
        fn contract(&self, alice_signs: bool, bob_signs: bool) -> DvpContract {
            let party = |id: &str, who: &Actor, signs: bool, pay: DvpPayItem, receive: DvpReceiveItem| DvpParty {
                id: id.to_string(),
                sig_address: who.address.clone(),
                public_key: if signs { who.public_key.clone() } else { String::new() },
                signature: if signs { who.sign(&self.address) } else { String::new() },
                pay_list: vec![pay],
                receive_list: vec![receive],
                ..Default::default()
            };
            let alice_pay = if alice_signs {
                self.signed_pay(&self.alice, "X", 50)
            } else {
                self.pay(&self.alice, "X", 50)
            };
            let bob_pay = if bob_signs {
                self.signed_pay(&self.bob, "Y", 50)
            } else {
                self.pay(&self.bob, "Y", 50)
            };
            DvpContract {
                start_date: NOW,
                expiry: NOW + 3_600,
                parties: vec![
                    party("A", &self.alice, alice_signs, alice_pay, self.receive(&self.alice, "Y", 50)),
                    party("B", &self.bob, bob_signs, bob_pay, self.receive(&self.bob, "X", 50)),
                ],
                ..Default::default()
            }
        }

        fn create(&self, contract: DvpContract) -> LedgerTx {
            LedgerTx::NewContract(NewContractTx {
                envelope: self.issuer.envelope("create", 0),
                contract_address: self.address.clone(),
                contract: ContractData::Dvp(contract),
            })
        }

        fn bob_commit(&self) -> LedgerTx {
            let item = self.pay(&self.bob, "Y", 50);
            let commitment = DvpCommitData {
                party: Some(PartyCommit {
                    id: "B".to_string(),
                    public_key: self.bob.public_key.clone(),
                    signature: self.bob.sign(&self.address),
                }),
                payments: vec![PaymentCommit {
                    index: 0,
                    public_key: self.bob.public_key.clone(),
                    signature: self.bob.sign(&pay_item_message(&Sha256Hasher, &self.address, &item)),
                }],
                ..Default::default()
            };
            LedgerTx::Commit(CommitTx::single(
                self.bob.envelope("commit", 0),
                self.address.clone(),
                CommitData::Dvp(commitment),
            ))
        }

        fn funded(&self, service: &SettlementService, alice_x: i128) -> StateSnapshot {
            let mut snapshot = service.new_snapshot();
            fund(&mut snapshot, &self.alice.address, "NS|X", alice_x);
            fund(&mut snapshot, &self.bob.address, "NS|Y", 50);
            snapshot
        }
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[test]
    fn test_swap_settles_after_last_commitment() {
        let swap = Swap::new();
        let mut service = service();
        let mut snapshot = swap.funded(&service, 50);

        let created = service.apply_tx(&mut snapshot, &swap.create(swap.contract(true, false)), NOW, false);
        assert!(created.is_pass(), "{created:?}");
        assert_eq!(service.pending().count(), 0);

        let committed = service.apply_tx(&mut snapshot, &swap.bob_commit(), NOW, false);
        assert!(committed.is_pass(), "{committed:?}");
        assert_eq!(service.pending().collect::<Vec<_>>(), vec![swap.address.as_str()]);

        let runs = service.settle_pending(&mut snapshot, NOW);
        assert_eq!(runs[0], (swap.address.clone(), Outcome::pass("Contract completed")));

        assert_eq!(holding(&snapshot, &swap.alice.address, "NS|X"), 0);
        assert_eq!(holding(&snapshot, &swap.alice.address, "NS|Y"), 50);
        assert_eq!(holding(&snapshot, &swap.bob.address, "NS|X"), 50);
        assert_eq!(holding(&snapshot, &swap.bob.address, "NS|Y"), 0);
        assert!(snapshot.contracts.find(&swap.address).unwrap().is_completed());

        let mut sink = RecordingEventSink::new();
        service.flush_events(&mut snapshot, &mut sink);
        let kinds = sink.life_cycle(&swap.address);
        assert_eq!(kinds.first(), Some(&LifeCycleKind::New));
        assert_eq!(kinds.last(), Some(&LifeCycleKind::Complete));
    }

    #[test]
    fn test_fully_signed_swap_settles_without_commitments() {
        let swap = Swap::new();
        let mut service = service();
        let mut snapshot = swap.funded(&service, 50);

        let created = service.apply_tx(&mut snapshot, &swap.create(swap.contract(true, true)), NOW, false);
        assert!(created.is_pass(), "{created:?}");
        assert_eq!(service.pending().count(), 1);

        service.settle_pending(&mut snapshot, NOW);
        assert_eq!(holding(&snapshot, &swap.bob.address, "NS|X"), 50);
        assert_eq!(service.pending().count(), 0);
    }

    #[test]
    fn test_forged_party_signature_is_rejected() {
        let swap = Swap::new();
        let mut service = service();
        let mut snapshot = swap.funded(&service, 50);

        let mut contract = swap.contract(true, false);
        contract.parties[0].signature = swap.bob.sign(&swap.address);
        let outcome = service.apply_tx(&mut snapshot, &swap.create(contract), NOW, false);

        assert_eq!(outcome, Outcome::fail("DVP : failed party sig : (sig,msg,pub)"));
        assert!(snapshot.contracts.find(&swap.address).is_none());
        assert_eq!(
            service.stats(),
            &ServiceStats {
                accepted: 0,
                warnings: 0,
                rejected: 1,
                corrupted: 0,
            }
        );
    }

    #[test]
    fn test_commit_signed_by_wrong_key_is_rejected() {
        let swap = Swap::new();
        let mut service = service();
        let mut snapshot = swap.funded(&service, 50);
        service.apply_tx(&mut snapshot, &swap.create(swap.contract(true, false)), NOW, false);

        let LedgerTx::Commit(mut commit) = swap.bob_commit() else {
            unreachable!()
        };
        if let CommitData::Dvp(data) = &mut commit.commitment {
            data.payments[0].signature = swap.bob.sign("something else");
        }
        let outcome = service.apply_tx(&mut snapshot, &LedgerTx::Commit(commit), NOW, false);
        assert_eq!(outcome, Outcome::fail("DVP : Payment Signature not valid"));
        assert_eq!(service.pending().count(), 0);
    }

    #[test]
    fn test_shortfall_retries_on_next_time_event() {
        let swap = Swap::new();
        let mut service = service();
        let mut snapshot = swap.funded(&service, 20);
        service.apply_tx(&mut snapshot, &swap.create(swap.contract(true, true)), NOW, false);

        let runs = service.settle_pending(&mut snapshot, NOW);
        assert!(runs[0].1.message.starts_with("Insufficient Asset"), "{runs:?}");
        assert!(!snapshot.contracts.find(&swap.address).unwrap().is_completed());
        assert_eq!(holding(&snapshot, &swap.bob.address, "NS|Y"), 50);

        fund(&mut snapshot, &swap.alice.address, "NS|X", 50);
        let retry_at = NOW + snapshot.config().dvp_retry_delay;
        let runs = service.settle_pending(&mut snapshot, retry_at);
        assert_eq!(runs, vec![(swap.address.clone(), Outcome::pass("Contract completed"))]);
        assert_eq!(holding(&snapshot, &swap.alice.address, "NS|Y"), 50);
    }

    #[test]
    fn test_unsettled_swap_expires() {
        let swap = Swap::new();
        let mut service = service();
        let mut snapshot = swap.funded(&service, 50);
        service.apply_tx(&mut snapshot, &swap.create(swap.contract(true, false)), NOW, false);

        let runs = service.settle_pending(&mut snapshot, NOW + 3_600);
        assert_eq!(runs, vec![(swap.address.clone(), Outcome::pass("Expired."))]);
        assert!(snapshot.contracts.find(&swap.address).unwrap().is_completed());
        assert_eq!(holding(&snapshot, &swap.alice.address, "NS|X"), 50);

        let mut sink = RecordingEventSink::new();
        service.flush_events(&mut snapshot, &mut sink);
        assert_eq!(sink.life_cycle(&swap.address).last(), Some(&LifeCycleKind::Expire));
    }
}
