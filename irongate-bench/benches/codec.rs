//! Codec benchmarks over the NTG dictionary.
//!
//! Run with: cargo bench -p irongate-bench --bench codec

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use irongate_bench::{execution_report, heartbeat, new_order, ntg_codec};
use std::hint::black_box;

fn benchmark_encode(c: &mut Criterion) {
    let codec = ntg_codec();
    let mut group = c.benchmark_group("encode");

    for (name, message) in [
        ("heartbeat", heartbeat()),
        ("new_order", new_order()),
        ("execution_report", execution_report()),
    ] {
        let size = codec.encode(&message).map(|b| b.len()).unwrap_or_default();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &message, |b, message| {
            let mut dst = BytesMut::with_capacity(256);
            b.iter(|| {
                dst.clear();
                codec.encode_into(black_box(message), &mut dst).unwrap();
            })
        });
    }
    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let codec = ntg_codec();
    let mut group = c.benchmark_group("decode");

    for (name, message) in [
        ("heartbeat", heartbeat()),
        ("new_order", new_order()),
        ("execution_report", execution_report()),
    ] {
        let frame = codec.encode(&message).unwrap();
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &frame, |b, frame| {
            b.iter(|| {
                let mut src = BytesMut::from(&frame[..]);
                black_box(codec.decode(&mut src).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
