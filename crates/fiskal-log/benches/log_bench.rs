// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the transaction lifecycle and record verification.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use fiskal_core::TseConfig;
use fiskal_core::types::SignatureScheme;
use fiskal_log::{ParsedRecord, Tse, verify_record};
use fiskal_security::{EcdsaKey, SigningCore};

fn tse() -> Tse {
    let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).expect("key generation");
    let signer = SigningCore::new(Box::new(key), TseConfig::default().certificate, 0, 0)
        .expect("signing core");
    Tse::new(signer, 16, 0).expect("tse")
}

/// One start/update/finish cycle: three signatures per iteration.
fn bench_transaction_cycle(c: &mut Criterion) {
    let tse = tse();
    let process_data = vec![0x42u8; 256];

    c.bench_function("transaction_cycle", |b| {
        b.iter(|| {
            let start = tse
                .start_transaction("POS-1", black_box(&process_data), "Kassenbeleg-V1", None)
                .expect("start");
            let number = ParsedRecord::parse(&start)
                .expect("parse")
                .transaction_number
                .expect("number");
            tse.update_transaction("POS-1", number, &process_data, "Kassenbeleg-V1")
                .expect("update");
            let finish = tse
                .finish_transaction("POS-1", number, &process_data, "Kassenbeleg-V1", None)
                .expect("finish");
            black_box(finish);
        });
    });
}

fn bench_verify_record(c: &mut Criterion) {
    let tse = tse();
    let record = tse
        .start_transaction("POS-1", &[0x42u8; 256], "Kassenbeleg-V1", None)
        .expect("start");
    let public_key = tse.public_key().expect("public key");

    c.bench_function("verify_record", |b| {
        b.iter(|| {
            let valid = verify_record(black_box(&record), &public_key).expect("verify");
            black_box(valid);
        });
    });
}

criterion_group!(benches, bench_transaction_cycle, bench_verify_record);
criterion_main!(benches);
