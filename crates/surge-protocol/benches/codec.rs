//! Codec benchmarks for surge-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use surge_protocol::{codec, OutboundMessage};

fn bench_encode_channel_event(c: &mut Criterion) {
    let message = OutboundMessage::channel_event(
        "client-typing",
        "private-chat",
        Some(json!({ "body": "x".repeat(64) })),
        Some("u1".to_string()),
    );

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("channel_event_64B", |b| {
        b.iter(|| codec::encode(black_box(&message)))
    });
    group.finish();
}

fn bench_decode_subscribe(c: &mut Criterion) {
    let frame = r#"{"event":"pusher:subscribe","data":{"channel":"presence-room","auth":"key:0000","channel_data":"{\"user_id\":\"u1\"}"}}"#;

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(frame.len() as u64));
    group.bench_function("subscribe", |b| b.iter(|| codec::decode(black_box(frame))));
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let message = OutboundMessage::channel_event(
        "new-message",
        "chat-room",
        Some(json!({ "body": "x".repeat(256) })),
        None,
    );

    c.bench_function("roundtrip_256B", |b| {
        b.iter(|| {
            let encoded = codec::encode(black_box(&message)).unwrap();
            codec::decode(black_box(&encoded))
        })
    });
}

criterion_group!(
    benches,
    bench_encode_channel_event,
    bench_decode_subscribe,
    bench_roundtrip
);
criterion_main!(benches);
