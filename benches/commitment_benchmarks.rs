//! Performance Benchmarks for the prediction client
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use electionbet::commitment::{commit, MarketId};
use electionbet::fhe::{AdapterCell, Address, CiphertextHandle, InMemoryRelayer, RelayerConfig};
use electionbet::ledger::{InMemoryLedger, StakeAmount};
use electionbet::wallet::{validate, PredictionForm, PredictionSubmitter, SubmissionConfig};
use std::sync::Arc;

// =============================================================================
// COMMITMENT BENCHMARKS
// =============================================================================

fn bench_commit(c: &mut Criterion) {
    let submitter = Address::from_bytes([0xA1; 20]);
    let candidate = CiphertextHandle::from_bytes([0x11; 32]);
    let stake = CiphertextHandle::from_bytes([0x22; 32]);

    c.bench_function("commitment_generate", |b| {
        b.iter(|| {
            commit(
                black_box(&submitter),
                black_box(MarketId(1)),
                black_box(&candidate),
                black_box(&stake),
            )
        })
    });

    let commitment = commit(&submitter, MarketId(1), &candidate, &stake);
    c.bench_function("commitment_verify", |b| {
        b.iter(|| commitment.verify(&submitter, MarketId(1), &candidate, &stake))
    });
}

// =============================================================================
// STAKE PARSING BENCHMARKS
// =============================================================================

fn bench_stake_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("stake_parse");

    for input in ["1", "0.05", "1234.567890", "0.000000000000000001", "12.3456789012345678901234"] {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(input), &input, |b, input| {
            b.iter(|| black_box(input).parse::<StakeAmount>())
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let identity = Address::from_bytes([0xA1; 20]);
    let min: StakeAmount = "0.01".parse().unwrap();

    c.bench_function("validation_gate", |b| {
        b.iter(|| validate(Some(&identity), Some(1), black_box("0.05"), &min))
    });
}

// =============================================================================
// LIFECYCLE BENCHMARKS
// =============================================================================

fn bench_submit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let relayer = Arc::new(InMemoryRelayer::new());
    let adapter = Arc::new(AdapterCell::ready(relayer, RelayerConfig::default()));
    let ledger = Arc::new(InMemoryLedger::new());
    let submitter = PredictionSubmitter::new(SubmissionConfig::default(), adapter, ledger);
    let identity = Address::from_bytes([0xA1; 20]);

    c.bench_function("submit_in_memory", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut form = PredictionForm::new();
            form.select(1);
            form.set_stake("0.05");
            submitter.submit(Some(&identity), &mut form).await
        })
    });
}

criterion_group!(
    benches,
    bench_commit,
    bench_stake_parsing,
    bench_validation,
    bench_submit,
);

criterion_main!(benches);
