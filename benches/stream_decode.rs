//! Benchmarks for frame stream decoding
//!
//! Measures:
//! - Frame header decode/encode for a single 1024-byte block
//! - Whole-stream decoding throughput across raster widths
//! - Resynchronization cost when every other frame header is corrupt
//!
//! Platform: Cross-platform (synthetic recordings, CI-safe)

use arisfile::test_utils::{RecordingBuilder, frame_header};
use arisfile::{ConversionPipeline, FrameHeader, FrameStreamReader, MemorySink};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::io::Cursor;

const FRAMES: u32 = 64;

fn recording(ping_mode: u32, samples_per_beam: u32, corrupt_every: Option<u32>) -> Vec<u8> {
    let mut builder = RecordingBuilder::new();
    for index in 0..FRAMES {
        builder = match corrupt_every {
            Some(n) if index > 0 && index % n == 0 => {
                builder.corrupt_frame(index, ping_mode, samples_per_beam)
            }
            _ => builder.frame(index, ping_mode, samples_per_beam),
        };
    }
    builder.build()
}

fn bench_header_codec(c: &mut Criterion) {
    let block = frame_header(42, 9, 1500).encode();

    c.bench_function("frame_header_decode", |b| {
        b.iter(|| FrameHeader::decode(black_box(&block)))
    });

    let header = FrameHeader::decode(&block).unwrap();
    c.bench_function("frame_header_encode", |b| b.iter(|| black_box(&header).encode()));
}

fn bench_stream_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decode");

    for (ping_mode, beams) in [(1u32, 48u64), (3, 96), (9, 128)] {
        let bytes = recording(ping_mode, 1000, None);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("beams", beams), &bytes, |b, bytes| {
            b.iter(|| {
                let (_, reader) = FrameStreamReader::from_stream(Cursor::new(bytes.as_slice())).unwrap();
                reader.map(|outcome| outcome.unwrap()).count()
            })
        });
    }

    group.finish();
}

fn bench_resync(c: &mut Criterion) {
    let bytes = recording(1, 1000, Some(2));

    c.bench_function("pipeline_with_resync", |b| {
        b.iter(|| {
            let mut sink = MemorySink::new();
            ConversionPipeline::new().run(Cursor::new(bytes.as_slice()), &mut sink).unwrap()
        })
    });
}

criterion_group!(benches, bench_header_codec, bench_stream_decode, bench_resync);
criterion_main!(benches);
