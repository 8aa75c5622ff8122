//! # Settlement Properties
//!
//! Whatever the amounts, settlement moves holdings between addresses and
//! never creates or destroys them, except where a namespace owner issues.

#[cfg(test)]
mod tests {
    use crate::fixtures::{fund, holding, register_namespace, service, Actor, NOW};
    use proptest::prelude::*;
    use shared_crypto::Sha256Hasher;
    use shared_types::Balance;
    use sl_04_contracts::domain::signing::pay_item_message;
    use sl_04_contracts::domain::{
        AssetIn, CommitData, CommitTx, ContractData, DvpAmount, DvpContract, DvpParty, DvpPayItem, DvpReceiveItem,
        ExchangeCommitData, ExchangeContract, LedgerTx, NewContractTx, NominateAsset, NominateCommitData,
        TokensNominateContract,
    };
    use sl_04_contracts::SettlementApi;

    fn fixed(amount: i128) -> DvpAmount {
        DvpAmount::Fixed(Balance::new(amount))
    }

    /// A fully signed swap: `payer` pays `amount` of `pays` and receives
    /// `gets` from the other side.
    fn signed_party(
        contract: &str,
        id: &str,
        payer: &Actor,
        pays: (&str, i128),
        gets: (&str, i128),
    ) -> DvpParty {
        let mut item = DvpPayItem {
            address: payer.address.clone(),
            namespace: "NS".to_string(),
            class_id: pays.0.to_string(),
            amount: fixed(pays.1),
            public_key: payer.public_key.clone(),
            ..Default::default()
        };
        item.signature = payer.sign(&pay_item_message(&Sha256Hasher, contract, &item));
        DvpParty {
            id: id.to_string(),
            sig_address: payer.address.clone(),
            public_key: payer.public_key.clone(),
            signature: payer.sign(contract),
            pay_list: vec![item],
            receive_list: vec![DvpReceiveItem {
                address: payer.address.clone(),
                namespace: "NS".to_string(),
                class_id: gets.0.to_string(),
                amount: fixed(gets.1),
            }],
            ..Default::default()
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn dvp_settlement_conserves_holdings(
            x in 1i128..1_000,
            y in 1i128..1_000,
            alice_x in 0i128..1_500,
            bob_y in 0i128..1_500,
        ) {
            let issuer = Actor::from_seed(40);
            let alice = Actor::from_seed(41);
            let bob = Actor::from_seed(42);
            let address = issuer.contract_address(0);

            let mut service = service();
            let mut snapshot = service.new_snapshot();
            fund(&mut snapshot, &alice.address, "NS|X", alice_x);
            fund(&mut snapshot, &bob.address, "NS|Y", bob_y);

            let contract = DvpContract {
                start_date: NOW,
                expiry: NOW + 3_600,
                parties: vec![
                    signed_party(&address, "A", &alice, ("X", x), ("Y", y)),
                    signed_party(&address, "B", &bob, ("Y", y), ("X", x)),
                ],
                ..Default::default()
            };
            let create = LedgerTx::NewContract(NewContractTx {
                envelope: issuer.envelope("create", 0),
                contract_address: address.clone(),
                contract: ContractData::Dvp(contract),
            });
            prop_assert!(service.apply_tx(&mut snapshot, &create, NOW, false).is_pass());
            service.settle_pending(&mut snapshot, NOW);

            let total_x = holding(&snapshot, &alice.address, "NS|X") + holding(&snapshot, &bob.address, "NS|X");
            let total_y = holding(&snapshot, &alice.address, "NS|Y") + holding(&snapshot, &bob.address, "NS|Y");
            prop_assert_eq!(total_x, alice_x);
            prop_assert_eq!(total_y, bob_y);

            let completed = snapshot.contracts.find(&address).unwrap().is_completed();
            prop_assert_eq!(completed, alice_x >= x && bob_y >= y);
            if completed {
                prop_assert_eq!(holding(&snapshot, &bob.address, "NS|X"), x);
                prop_assert_eq!(holding(&snapshot, &alice.address, "NS|Y"), y);
            } else {
                prop_assert_eq!(holding(&snapshot, &alice.address, "NS|X"), alice_x);
            }
        }

        #[test]
        fn exchange_settles_only_whole_blocks(
            block_in in 1i128..20,
            block_out in 1i128..10,
            amount in 1i128..400,
        ) {
            let issuer = Actor::from_seed(43);
            let bob = Actor::from_seed(44);
            let address = issuer.contract_address(0);

            let mut service = service();
            let mut snapshot = service.new_snapshot();
            fund(&mut snapshot, &issuer.address, "NS|BOND", 10_000);
            fund(&mut snapshot, &bob.address, "NS|CASH", 1_000);

            let create = LedgerTx::NewContract(NewContractTx {
                envelope: issuer.envelope("offer", 0),
                contract_address: address.clone(),
                contract: ContractData::Exchange(ExchangeContract {
                    inputs: vec![NominateAsset::new("NS", "CASH").with_block_size(block_in)],
                    outputs: vec![NominateAsset::new("NS", "BOND").with_block_size(block_out)],
                    expiry: NOW + 600,
                    ..Default::default()
                }),
            });
            prop_assert!(service.apply_tx(&mut snapshot, &create, NOW, false).is_pass());

            let take = LedgerTx::Commit(CommitTx::single(
                bob.envelope("take", 0),
                address,
                CommitData::Exchange(ExchangeCommitData {
                    assets_in: vec![NominateAsset::new("NS", "CASH").with_amount(amount)],
                    ..Default::default()
                }),
            ));
            let accepted = service.apply_tx(&mut snapshot, &take, NOW, false).is_pass();
            prop_assert_eq!(accepted, amount % block_in == 0);

            let cash = holding(&snapshot, &bob.address, "NS|CASH") + holding(&snapshot, &issuer.address, "NS|CASH");
            let bond = holding(&snapshot, &bob.address, "NS|BOND") + holding(&snapshot, &issuer.address, "NS|BOND");
            prop_assert_eq!(cash, 1_000);
            prop_assert_eq!(bond, 10_000);
            let expected = if accepted { amount / block_in * block_out } else { 0 };
            prop_assert_eq!(holding(&snapshot, &bob.address, "NS|BOND"), expected);
        }

        #[test]
        fn nominate_mints_exactly_what_it_takes(
            block_in in 1i128..20,
            block_out in 1i128..5,
            held in 0i128..500,
            offered in 1i128..500,
        ) {
            let issuer = Actor::from_seed(45);
            let alice = Actor::from_seed(46);
            let address = issuer.contract_address(0);

            let mut service = service();
            let mut snapshot = service.new_snapshot();
            register_namespace(&mut snapshot, "NS", &issuer.address, &["IN", "OUT"]);
            fund(&mut snapshot, &issuer.address, "NS|IN", 0);
            fund(&mut snapshot, &alice.address, "NS|IN", held);

            let create = LedgerTx::NewContract(NewContractTx {
                envelope: issuer.envelope("nominate", 0),
                contract_address: address.clone(),
                contract: ContractData::TokensNominate(TokensNominateContract {
                    namespace: "NS".to_string(),
                    input_class: "IN".to_string(),
                    output_class: "OUT".to_string(),
                    block_size_in: Balance::new(block_in),
                    block_size_out: Balance::new(block_out),
                    expiry: NOW + 600,
                    ..Default::default()
                }),
            });
            prop_assert!(service.apply_tx(&mut snapshot, &create, NOW, false).is_pass());

            let commit = LedgerTx::Commit(CommitTx::single(
                alice.envelope("convert", 0),
                address.clone(),
                CommitData::Nominate(NominateCommitData {
                    contract_address: address,
                    namespace: "NS".to_string(),
                    class_id: "IN".to_string(),
                    assets_in: vec![AssetIn {
                        amount: Balance::new(offered),
                        ..Default::default()
                    }],
                }),
            ));
            let accepted = service.apply_tx(&mut snapshot, &commit, NOW, false).is_pass();
            let blocks = offered / block_in;
            prop_assert_eq!(accepted, blocks * block_in <= held);

            let total_in = holding(&snapshot, &alice.address, "NS|IN") + holding(&snapshot, &issuer.address, "NS|IN");
            let net_out = holding(&snapshot, &alice.address, "NS|OUT") + holding(&snapshot, &issuer.address, "NS|OUT");
            prop_assert_eq!(total_in, held);
            prop_assert_eq!(net_out, 0);
            if accepted {
                prop_assert_eq!(holding(&snapshot, &alice.address, "NS|OUT"), blocks * block_out);
            }
        }
    }
}
