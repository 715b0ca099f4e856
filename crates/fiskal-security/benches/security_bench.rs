// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for trailer signing and serial-number hashing in the
// fiskal-security crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use fiskal_core::TseConfig;
use fiskal_core::types::SignatureScheme;
use fiskal_security::{EcdsaKey, SigningCore, serial_number};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark producing one signed trailer per iteration for both schemes.
///
/// Each iteration advances the signature counter, reads the simulated clock,
/// encodes the trailer TLVs and runs one ECDSA signature.
fn bench_sign_trailer(c: &mut Criterion) {
    let payload = vec![0x42u8; 512];

    let mut group = c.benchmark_group("sign_trailer");
    for scheme in [SignatureScheme::EcdsaPlainSha256, SignatureScheme::EcdsaPlainSha384] {
        let key = EcdsaKey::generate(scheme).expect("key generation failed");
        let mut core = SigningCore::new(Box::new(key), TseConfig::default().certificate, 0, 0)
            .expect("signing core");

        group.bench_function(scheme.name(), |b| {
            b.iter(|| {
                let trailer = core.sign(black_box(&payload)).expect("sign failed");
                black_box(trailer);
            });
        });
    }
    group.finish();
}

/// Benchmark the serial number derivation (SHA-256 over the key point).
fn bench_serial_number(c: &mut Criterion) {
    let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha384).expect("key generation");
    let public_key = fiskal_security::SignatureAlgorithm::public_key(&key).to_vec();

    c.bench_function("serial_number (P-384 point)", |b| {
        b.iter(|| {
            let serial = serial_number(black_box(&public_key)).expect("serial");
            black_box(serial);
        });
    });
}

criterion_group!(benches, bench_sign_trailer, bench_serial_number);
criterion_main!(benches);
