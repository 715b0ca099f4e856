// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for TLV encoding, flat decoding, and OID conversion in
// the fiskal-der crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use fiskal_der::{TlvNode, decode_all, encode_all, oid_bytes_to_string, oid_string_to_bytes};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Field layout of a typical start-transaction record, without the trailer.
fn record_fields(process_data_len: usize) -> Vec<TlvNode> {
    vec![
        TlvNode::integer(2),
        TlvNode::oid("0.4.0.127.0.7.3.7.1.1").expect("oid"),
        TlvNode::context(0, b"StartTransaction".to_vec()).expect("ctx"),
        TlvNode::context(1, b"client-1".to_vec()).expect("ctx"),
        TlvNode::context(2, vec![0x5A; process_data_len]).expect("ctx"),
        TlvNode::context(3, b"sale".to_vec()).expect("ctx"),
        TlvNode::context(5, vec![0x01]).expect("ctx"),
        TlvNode::octet_string(vec![0xCD; 32]),
        TlvNode::sequence(&[TlvNode::oid("0.4.0.127.0.7.1.1.4.1.3").expect("oid")])
            .expect("sequence"),
    ]
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Encode the field list of a record at a few process-data sizes.
fn bench_encode_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_record");
    for &(label, size) in &[("64 B", 64usize), ("4 KiB", 4096), ("64 KiB", 65_536)] {
        let fields = record_fields(size);
        group.bench_function(label, |b| {
            b.iter(|| {
                let bytes = encode_all(black_box(&fields)).expect("encode");
                black_box(bytes);
            });
        });
    }
    group.finish();
}

/// Decode the same records back into the flat node list.
fn bench_decode_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_all");
    for &(label, size) in &[("64 B", 64usize), ("4 KiB", 4096), ("64 KiB", 65_536)] {
        let bytes = encode_all(&record_fields(size)).expect("encode");
        group.bench_function(label, |b| {
            b.iter(|| {
                let nodes = decode_all(black_box(&bytes)).expect("decode");
                black_box(nodes);
            });
        });
    }
    group.finish();
}

/// OID text -> bytes -> text for the signature algorithm identifier.
fn bench_oid_round_trip(c: &mut Criterion) {
    c.bench_function("oid_round_trip", |b| {
        b.iter(|| {
            let bytes = oid_string_to_bytes(black_box("0.4.0.127.0.7.1.1.4.1.3")).expect("oid");
            let text = oid_bytes_to_string(&bytes).expect("oid");
            black_box(text);
        });
    });
}

criterion_group!(benches, bench_encode_record, bench_decode_all, bench_oid_round_trip);
criterion_main!(benches);
