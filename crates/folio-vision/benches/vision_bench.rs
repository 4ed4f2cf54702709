// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for page detection and dewarping in folio-vision.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use folio_core::config::{DetectorConfig, DetectorKind, DewarpConfig};
use folio_core::types::CancelFlag;
use folio_vision::{QuadrilateralDetector, TextDewarper, build_detector};
use image::{DynamicImage, GrayImage, Luma};

// ---------------------------------------------------------------------------
// Synthetic inputs
// ---------------------------------------------------------------------------

/// 640x480 frame: dark background with a bright page between (64, 48) and
/// (576, 432).
fn page_frame() -> DynamicImage {
    let img = GrayImage::from_fn(640, 480, |x, y| {
        if (64..576).contains(&x) && (48..432).contains(&y) {
            Luma([235u8])
        } else {
            Luma([25u8])
        }
    });
    DynamicImage::ImageLuma8(img)
}

/// 600x800 page with gently curved rows of word-sized blocks.
fn curved_page() -> DynamicImage {
    let mut img = GrayImage::from_pixel(600, 800, Luma([255u8]));
    for line in 0..11 {
        let y0 = 150.0 + line as f64 * 50.0;
        let mut x0 = 60u32;
        while x0 + 40 <= 540 {
            let cx = x0 as f64 + 20.0 - 300.0;
            let cy = (y0 + 10.0 * cx * cx / 57_600.0).round() as u32;
            for y in cy - 5..cy + 5 {
                for x in x0..x0 + 40 {
                    img.put_pixel(x, y, Luma([20u8]));
                }
            }
            x0 += 54;
        }
    }
    DynamicImage::ImageLuma8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// One detection per frame is the live-preview hot path.
fn bench_detection(c: &mut Criterion) {
    let frame = page_frame();
    for kind in [DetectorKind::Contour, DetectorKind::Hough] {
        let detector = build_detector(&DetectorConfig {
            kind,
            ..DetectorConfig::default()
        });
        c.bench_function(&format!("detect_{} (640x480)", detector.name()), |b| {
            b.iter(|| black_box(detector.detect(black_box(&frame))));
        });
    }
}

/// Full analysis, fit and remap on a rectified page.
fn bench_dewarp(c: &mut Criterion) {
    let page = curved_page();
    let dewarper = TextDewarper::new(DewarpConfig::default());
    let cancel = CancelFlag::new();
    c.bench_function("dewarp (600x800)", |b| {
        b.iter(|| black_box(dewarper.dewarp(black_box(&page), &cancel)));
    });
}

criterion_group!(benches, bench_detection, bench_dewarp);
criterion_main!(benches);
