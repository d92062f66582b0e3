//! Criterion microbenches for berryscan hot paths.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - class-list merging with name normalization (merge_class_names)
//! - label text remapping (remap_label_text)
//! - region compositing over a full-size frame (composite_regions)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::path::Path;

use berryscan::dataset::label::remap_label_text;
use berryscan::dataset::{merge_class_names, IndexMapping, RemapPolicy};
use berryscan::geometry::PixelRect;
use berryscan::pipeline::composite_regions;
use image::{Rgb, RgbImage};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Benchmark merging a Kaggle-style class list into a Roboflow-style one.
fn bench_merge_names(c: &mut Criterion) {
    let target = names(&[
        "Angular Leafspot",
        "Anthracnose Fruit Rot",
        "Blossom Blight",
        "Gray Mold",
        "Leaf Spot",
        "Powdery Mildew Fruit",
        "Powdery Mildew Leaf",
    ]);
    let source = names(&[
        "angular_leafspot",
        "leaf-scorch",
        "gray_mold",
        "leaf_blight",
        "powdery-mildew-leaf",
        "healthy",
    ]);

    let mut group = c.benchmark_group("manifest");
    group.bench_function("merge_class_names", |b| {
        b.iter(|| {
            let merge = merge_class_names(black_box(&target), black_box(&source)).unwrap();
            black_box(merge)
        })
    });
    group.finish();
}

/// Benchmark remapping a label file with a few hundred box lines.
fn bench_label_remap(c: &mut Criterion) {
    let mut content = String::new();
    for i in 0..400 {
        content.push_str(&format!(
            "{} 0.{:06} 0.{:06} 0.{:06} 0.{:06}\n",
            i % 6,
            (i * 7919) % 1_000_000,
            (i * 104_729) % 1_000_000,
            (i * 31) % 1_000_000,
            (i * 17) % 1_000_000
        ));
    }
    let mapping: IndexMapping = (0..6).map(|i| (i, (i + 3) % 9)).collect();

    let mut group = c.benchmark_group("label");
    group.throughput(Throughput::Bytes(content.len() as u64));
    group.bench_function("remap_label_text", |b| {
        b.iter(|| {
            let out = remap_label_text(
                black_box(&content),
                &mapping,
                RemapPolicy::Strict,
                Path::new("bench.txt"),
            )
            .unwrap();
            black_box(out)
        })
    });
    group.finish();
}

/// Benchmark pasting eight region patches, half of which need resizing.
fn bench_composite(c: &mut Criterion) {
    let canvas = RgbImage::from_pixel(1280, 960, Rgb([20, 90, 20]));
    let regions: Vec<(PixelRect, RgbImage)> = (0..8u32)
        .map(|i| {
            let rect = PixelRect::clip(
                &berryscan::geometry::BBoxXYXY::from_xyxy(
                    f64::from(i * 150),
                    f64::from(i * 100),
                    f64::from(i * 150 + 140),
                    f64::from(i * 100 + 120),
                ),
                1280,
                960,
            )
            .unwrap();
            let (w, h) = if i % 2 == 0 {
                (rect.width(), rect.height())
            } else {
                (rect.width() / 2, rect.height() / 2)
            };
            (rect, RgbImage::from_pixel(w, h, Rgb([200, 30, 30])))
        })
        .collect();

    let mut group = c.benchmark_group("composite");
    group.bench_function("composite_regions", |b| {
        b.iter(|| {
            let out = composite_regions(
                black_box(canvas.clone()),
                regions.iter().map(|(rect, patch)| (rect, patch)),
            );
            black_box(out)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_merge_names,
    bench_label_remap,
    bench_composite
);
criterion_main!(benches);
