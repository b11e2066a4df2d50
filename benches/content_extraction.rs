//! Benchmarks for content extraction
//!
//! This benchmark measures:
//! - Field lookup on flat responses
//! - Wrapper traversal for pipeline state payloads
//! - Bounded depth-first search on responses without known fields
//! - Progress frame decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use generation_gateway::normalize::extract;
use generation_gateway::ChannelMessage;
use serde_json::{json, Value};

const FRAMES: &[&str] = &[
    r#"{"type":"status_update","generation_id":"gen-1","status":"drafting","progress":35,"current_step":"outline"}"#,
    r#"{"type":"agent_update","agent":"writer","action":"drafted","timestamp":"2026-01-01T00:00:00Z","result":"1200 words"}"#,
    r#"{"type":"ping"}"#,
    r#"{"type":"completion","result":{"generation_id":"gen-1","content":"Final article"}}"#,
];

fn article() -> String {
    "Ownership makes resource lifetimes explicit. ".repeat(40)
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    let flat = json!({"generation_id": "gen-1", "content": article(), "status": "completed"});
    group.bench_function("top_level_field", |b| b.iter(|| extract(black_box(&flat))));

    let wrapped = json!({
        "metadata": {"model": "writer-v2"},
        "result_state": {"final_content": article()},
    });
    group.bench_function("state_wrapper", |b| b.iter(|| extract(black_box(&wrapped))));

    let unknown: Value = json!({
        "trace": (0..50).map(|i| json!({"step": i, "note": "short"})).collect::<Vec<_>>(),
        "payload": {"sections": {"body": article()}},
    });
    group.bench_function("deep_search", |b| b.iter(|| extract(black_box(&unknown))));

    let empty = json!({"status": "ok", "progress": 100});
    group.bench_function("nothing_found", |b| b.iter(|| extract(black_box(&empty))));

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("progress_frames");
    let total: usize = FRAMES.iter().map(|f| f.len()).sum();
    group.throughput(Throughput::Bytes(total as u64));

    group.bench_function("decode_all", |b| {
        b.iter(|| {
            for frame in FRAMES {
                black_box(ChannelMessage::parse(black_box(frame)));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_extraction, bench_frames);
criterion_main!(benches);
