//! Codec benchmarks for beacon-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use beacon_protocol::{codec, ServerFrame};

fn publish_frame(sdp_len: usize) -> String {
    format!(
        r#"{{"type":"publish","topic":"room:lobby","kind":"offer","sdp":"{}"}}"#,
        "a".repeat(sdp_len)
    )
}

fn bench_decode_publish(c: &mut Criterion) {
    let small = publish_frame(256);
    let large = publish_frame(4096);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_function("publish_256B", |b| {
        b.iter(|| codec::decode(black_box(&small)))
    });
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("publish_4KB", |b| {
        b.iter(|| codec::decode(black_box(&large)))
    });
    group.finish();
}

fn bench_decode_membership(c: &mut Criterion) {
    let raw = r#"{"type":"subscribe","topics":["room:one","room:two","room:three"]}"#;

    c.bench_function("decode_subscribe", |b| b.iter(|| codec::decode(black_box(raw))));
}

fn bench_encode_pong(c: &mut Criterion) {
    c.bench_function("encode_pong", |b| {
        b.iter(|| codec::encode(black_box(&ServerFrame::Pong)))
    });
}

criterion_group!(
    benches,
    bench_decode_publish,
    bench_decode_membership,
    bench_encode_pong
);
criterion_main!(benches);
