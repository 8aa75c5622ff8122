//! # Settlement Benchmarks
//!
//! | Operation | Path measured |
//! |-----------|---------------|
//! | Exchange commit | validate, whole-block transfers, layer fold |
//! | DvP round trip | signed creation, queued settlement |
//! | Layer churn | create / discard over a funded snapshot |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_crypto::Sha256Hasher;
use shared_types::Balance;
use sl_01_state_store::Layered;
use sl_04_contracts::domain::signing::pay_item_message;
use sl_04_contracts::domain::{
    CommitData, CommitTx, ContractData, DvpAmount, DvpContract, DvpParty, DvpPayItem, DvpReceiveItem,
    ExchangeCommitData, ExchangeContract, LedgerTx, NewContractTx, NominateAsset,
};
use sl_04_contracts::SettlementApi;
use sl_tests::fixtures::{fund, service, Actor, NOW};
use std::time::Duration;

// ============================================================================
// Exchange: commits against one standing offer
// ============================================================================

fn bench_exchange_commits(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange");
    group.measurement_time(Duration::from_secs(5));

    let issuer = Actor::from_seed(1);
    let taker = Actor::from_seed(2);
    let address = issuer.contract_address(0);
    let offer = LedgerTx::NewContract(NewContractTx {
        envelope: issuer.envelope("offer", 0),
        contract_address: address.clone(),
        contract: ContractData::Exchange(ExchangeContract {
            inputs: vec![NominateAsset::new("NS", "CASH").with_block_size(10)],
            outputs: vec![NominateAsset::new("NS", "BOND").with_block_size(1)],
            expiry: NOW + 600,
            ..Default::default()
        }),
    });

    for batch in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("commit", batch), &batch, |b, &batch| {
            let mut rng = rand::thread_rng();
            let commits: Vec<LedgerTx> = (0..batch)
                .map(|i| {
                    let amount = 10 * rng.gen_range(1..=5);
                    LedgerTx::Commit(CommitTx::single(
                        taker.envelope(&format!("take-{i}"), i as u64),
                        address.clone(),
                        CommitData::Exchange(ExchangeCommitData {
                            assets_in: vec![NominateAsset::new("NS", "CASH").with_amount(amount)],
                            ..Default::default()
                        }),
                    ))
                })
                .collect();

            b.iter_batched(
                || {
                    let mut service = service();
                    let mut snapshot = service.new_snapshot();
                    fund(&mut snapshot, &issuer.address, "NS|BOND", 1_000_000);
                    fund(&mut snapshot, &taker.address, "NS|CASH", 1_000_000);
                    service.apply_tx(&mut snapshot, &offer, NOW, false);
                    (service, snapshot)
                },
                |(mut service, mut snapshot)| {
                    for commit in &commits {
                        black_box(service.apply_tx(&mut snapshot, commit, NOW, false));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// ============================================================================
// DvP: signed creation followed by queued settlement
// ============================================================================

fn signed_party(contract: &str, id: &str, payer: &Actor, pays: &str, gets: &str) -> DvpParty {
    let mut item = DvpPayItem {
        address: payer.address.clone(),
        namespace: "NS".to_string(),
        class_id: pays.to_string(),
        amount: DvpAmount::Fixed(Balance::new(100)),
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
            class_id: gets.to_string(),
            amount: DvpAmount::Fixed(Balance::new(100)),
        }],
        ..Default::default()
    }
}

fn bench_dvp_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("dvp");
    group.measurement_time(Duration::from_secs(5));

    let issuer = Actor::from_seed(3);
    let alice = Actor::from_seed(4);
    let bob = Actor::from_seed(5);
    let address = issuer.contract_address(0);
    let create = LedgerTx::NewContract(NewContractTx {
        envelope: issuer.envelope("create", 0),
        contract_address: address.clone(),
        contract: ContractData::Dvp(DvpContract {
            start_date: NOW,
            expiry: NOW + 3_600,
            parties: vec![
                signed_party(&address, "A", &alice, "X", "Y"),
                signed_party(&address, "B", &bob, "Y", "X"),
            ],
            ..Default::default()
        }),
    });

    group.bench_function("create_and_settle", |b| {
        b.iter_batched(
            || {
                let service = service();
                let mut snapshot = service.new_snapshot();
                fund(&mut snapshot, &alice.address, "NS|X", 100);
                fund(&mut snapshot, &bob.address, "NS|Y", 100);
                (service, snapshot)
            },
            |(mut service, mut snapshot)| {
                service.apply_tx(&mut snapshot, &create, NOW, false);
                black_box(service.settle_pending(&mut snapshot, NOW))
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

// ============================================================================
// Layers: provisional layer churn over a funded snapshot
// ============================================================================

fn bench_layer_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("layers");

    for holders in [10usize, 1_000] {
        let actors: Vec<Actor> = (0..holders).map(|_| Actor::random()).collect();
        let mut snapshot = service().new_snapshot();
        for actor in &actors {
            fund(&mut snapshot, &actor.address, "NS|X", 1_000);
        }

        group.bench_with_input(BenchmarkId::new("update_and_discard", holders), &holders, |b, _| {
            b.iter(|| {
                snapshot.create_snapshot();
                for actor in actors.iter().take(10) {
                    fund(&mut snapshot, &actor.address, "NS|X", 0);
                }
                black_box(snapshot.discard())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exchange_commits, bench_dvp_round_trip, bench_layer_churn);
criterion_main!(benches);
