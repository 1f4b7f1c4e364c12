//! # NockBridge Benchmarks
//!
//! Hot paths of a signing round:
//!
//! | Path | Runs |
//! |------|------|
//! | nb-03 threshold signature set | once per finalize instruction |
//! | nb-03 fee computation | once per transfer |
//! | nb-04 seal / open | once per store write / read |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nb_03_bridge_protocol::{
    compute_fee, deposit_message, verify_signature_set, DepositInstruction, SourceEventId,
    SourceProof, UNITS_PER_NOCK,
};
use shared_crypto::{open, seal, Ed25519KeyPair, SecretKey};
use shared_types::{PublicKey, ValidatorSignature};
use std::collections::BTreeSet;

fn sample_deposit() -> DepositInstruction {
    DepositInstruction {
        amount: 250 * UNITS_PER_NOCK,
        recipient: [0xA1; 32],
        proof: SourceProof {
            event: SourceEventId {
                tx_hash: [0x7C; 32],
                log_index: 3,
            },
            source_height: 42_000,
        },
    }
}

// ============================================================================
// NB-03: Threshold signature sets
// ============================================================================

fn bench_signature_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("nb-03-signature-set");
    let message = deposit_message(&sample_deposit());

    for validators in [3usize, 7, 15] {
        let keys: Vec<Ed25519KeyPair> = (0..validators)
            .map(|i| Ed25519KeyPair::from_seed([i as u8 + 1; 32]))
            .collect();
        let set: BTreeSet<PublicKey> = keys.iter().map(|k| *k.public_key().as_bytes()).collect();
        let threshold = validators.div_ceil(2) as u8;
        let signatures: Vec<ValidatorSignature> = keys
            .iter()
            .take(usize::from(threshold))
            .map(|k| ValidatorSignature::new(*k.public_key().as_bytes(), *k.sign(&message).as_bytes()))
            .collect();

        group.throughput(Throughput::Elements(signatures.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("verify_threshold", validators),
            &signatures,
            |b, signatures| {
                b.iter(|| {
                    black_box(verify_signature_set(&message, signatures, &set, threshold).is_ok())
                })
            },
        );
    }
    group.finish();
}

fn bench_fees(c: &mut Criterion) {
    c.bench_function("nb-03-compute-fee", |b| {
        b.iter(|| black_box(compute_fee(black_box(123_456 * UNITS_PER_NOCK), black_box(50))))
    });
}

// ============================================================================
// NB-04: Sealed store values
// ============================================================================

fn bench_sealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("nb-04-envelope");
    let key = SecretKey::from_bytes([0x5E; 32]);
    let aad = b"nockbridge:consensus:round:validator";

    for size in [256usize, 1024, 4096] {
        let plaintext = vec![0x42u8; size];
        let sealed = seal(&key, &plaintext, aad).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("seal", size), &plaintext, |b, p| {
            b.iter(|| black_box(seal(&key, p, aad).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("open", size), &sealed, |b, s| {
            b.iter(|| black_box(open(&key, s, aad).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_signature_sets, bench_fees, bench_sealing);
criterion_main!(benches);
