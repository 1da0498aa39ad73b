//! Codec benchmarks for roomcast-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use roomcast_protocol::{codec, Msg, Resp};
use serde_json::json;

fn say_event() -> Resp {
    Resp::event(
        "say",
        json!({"chat_id": 100, "from": 200, "name": "alice", "text": "x".repeat(64)}),
    )
}

fn bench_encode_payload(c: &mut Criterion) {
    let resp = say_event();

    c.bench_function("encode_payload_say", |b| {
        b.iter(|| codec::encode_payload(black_box(&resp)))
    });
}

fn bench_encode_envelope(c: &mut Criterion) {
    let msg = Msg::new(1, codec::encode_payload(&say_event()).unwrap());

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(msg.payload_size() as u64));
    group.bench_function("envelope", |b| b.iter(|| codec::encode(black_box(&msg))));
    group.finish();
}

fn bench_decode_envelope(c: &mut Criterion) {
    let msg = Msg::new(1, codec::encode_payload(&say_event()).unwrap());
    let encoded = codec::encode(&msg).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("envelope", |b| {
        b.iter(|| codec::decode(black_box(&encoded)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_encode_payload,
    bench_encode_envelope,
    bench_decode_envelope
);
criterion_main!(benches);
