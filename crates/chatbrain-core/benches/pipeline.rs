//! Benchmarks for the Chatbrain input and progress paths.
//!
//! Run with: cargo bench -p chatbrain-core

use chatbrain_core::config::{LimitsConfig, ProgressConfig};
use chatbrain_core::input::decode;
use chatbrain_core::input::Normalizer;
use chatbrain_core::pipeline::ProgressCurve;
use chatbrain_core::{InputItem, Stage};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::time::Duration;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("encode fixture");
    buffer.into_inner()
}

fn benchmark_decode(c: &mut Criterion) {
    let bytes = png_bytes(1080, 2400);

    c.bench_function("decode_screenshot", |b| {
        b.iter(|| {
            let _ = decode::decode_bytes(black_box(&bytes), "shot.png");
        })
    });
}

fn benchmark_downscale(c: &mut Criterion) {
    let bytes = png_bytes(1080, 2400);
    let decoded = decode::decode_bytes(&bytes, "shot.png").expect("decode fixture");

    c.bench_function("downscale_to_1000px", |b| {
        b.iter(|| {
            let _ = decode::downscale(black_box(&decoded), 1000, "shot.png");
        })
    });
}

fn benchmark_normalize_batch(c: &mut Criterion) {
    let items: Vec<InputItem> = (0..4)
        .map(|i| InputItem::new(format!("shot{i}.png"), "image/png", png_bytes(720, 1600)))
        .collect();
    let normalizer = Normalizer::new(&LimitsConfig::default());
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("normalize_4_screenshots", |b| {
        b.iter(|| {
            let _ = rt.block_on(normalizer.normalize(black_box(items.clone())));
        })
    });
}

fn benchmark_progress_curve(c: &mut Criterion) {
    let curve = ProgressCurve::for_stage(&ProgressConfig::default(), Stage::Structural, 3);

    c.bench_function("progress_curve_sweep", |b| {
        b.iter(|| {
            for ms in (0..10_000).step_by(50) {
                black_box(curve.percent_at(Duration::from_millis(ms)));
            }
        })
    });
}

criterion_group!(
    benches,
    benchmark_decode,
    benchmark_downscale,
    benchmark_normalize_batch,
    benchmark_progress_curve,
);
criterion_main!(benches);
