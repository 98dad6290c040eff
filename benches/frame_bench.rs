//! Frame codec and morphing benchmarks.
//!
//! Frame throughput bounds relay bandwidth; profile sampling sits on the
//! morphed write path once per frame.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use reflex::codec::{Frame, FrameDecoder, FrameEncoder, MAX_FRAME_PAYLOAD};
use reflex::crypto::AeadKey;
use reflex::morphing::TrafficProfile;

fn bench_frame_encode(c: &mut Criterion) {
    let key = AeadKey::from_bytes([0x42; 32]);

    let mut group = c.benchmark_group("frame_encode");
    for size in [1400usize, MAX_FRAME_PAYLOAD] {
        let mut encoder = FrameEncoder::new(&key);
        let frame = Frame::data(vec![0u8; size]);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{size}B"), |b| {
            b.iter(|| black_box(encoder.encode(&frame).unwrap()))
        });
    }
    group.finish();
}

fn bench_frame_roundtrip(c: &mut Criterion) {
    let key = AeadKey::from_bytes([0x42; 32]);

    let mut group = c.benchmark_group("frame_roundtrip");
    group.throughput(Throughput::Bytes(1400));
    group.bench_function("1400B", |b| {
        let mut encoder = FrameEncoder::new(&key);
        let mut decoder = FrameDecoder::new(&key);
        let frame = Frame::data(vec![0u8; 1400]);

        b.iter(|| {
            let encoded = encoder.encode(&frame).unwrap();
            black_box(decoder.decode(&encoded).unwrap())
        })
    });
    group.finish();
}

fn bench_profile_sampling(c: &mut Criterion) {
    let profile = TrafficProfile::http2_api();

    c.bench_function("profile_sample_size", |b| {
        b.iter(|| black_box(profile.sample_size()))
    });
    c.bench_function("profile_sample_delay", |b| {
        b.iter(|| black_box(profile.sample_delay()))
    });
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_roundtrip,
    bench_profile_sampling
);
criterion_main!(benches);
