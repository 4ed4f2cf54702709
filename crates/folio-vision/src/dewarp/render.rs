// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic renderings of each dewarp stage.

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::DewarpAnalysis;

const RED: Rgb<u8> = Rgb([220, 30, 30]);
const BLUE: Rgb<u8> = Rgb([30, 60, 220]);
const GREEN: Rgb<u8> = Rgb([20, 160, 60]);

/// Colours cycled through for per-span renderings.
const PALETTE: [Rgb<u8>; 6] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 190, 190]),
];

/// A renderable stage of the dewarp analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DewarpStage {
    Threshold,
    Dilated,
    Closed,
    Contours,
    Spans,
    KeyPoints,
    Curves,
    Correspondence,
    Output,
}

impl DewarpStage {
    pub const ALL: [DewarpStage; 9] = [
        Self::Threshold,
        Self::Dilated,
        Self::Closed,
        Self::Contours,
        Self::Spans,
        Self::KeyPoints,
        Self::Curves,
        Self::Correspondence,
        Self::Output,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Dilated => "dilated",
            Self::Closed => "closed",
            Self::Contours => "contours",
            Self::Spans => "spans",
            Self::KeyPoints => "keypoints",
            Self::Curves => "curves",
            Self::Correspondence => "correspondence",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for DewarpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DewarpStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|st| st.as_str()).collect();
                format!("unknown stage '{s}', expected one of: {}", names.join(", "))
            })
    }
}

fn mask_image(mask: &GrayImage) -> DynamicImage {
    DynamicImage::ImageLuma8(mask.clone())
}

fn canvas(analysis: &DewarpAnalysis) -> RgbImage {
    DynamicImage::ImageLuma8(analysis.page.clone()).to_rgb8()
}

fn polyline(img: &mut RgbImage, points: &[(f32, f32)], colour: Rgb<u8>) {
    for pair in points.windows(2) {
        draw_line_segment_mut(img, pair[0], pair[1], colour);
    }
}

fn dot(img: &mut RgbImage, x: f64, y: f64, colour: Rgb<u8>) {
    draw_filled_circle_mut(img, (x.round() as i32, y.round() as i32), 2, colour);
}

/// Render one analysis stage. `Output` is not an analysis stage and is
/// produced by the caller from the dewarped page.
pub(crate) fn render_stage(analysis: &DewarpAnalysis, stage: DewarpStage) -> DynamicImage {
    match stage {
        DewarpStage::Threshold => mask_image(&analysis.thresholded),
        DewarpStage::Dilated => mask_image(&analysis.dilated),
        DewarpStage::Closed => mask_image(&analysis.closed),
        DewarpStage::Contours => {
            let mut img = canvas(analysis);
            for c in &analysis.contours {
                let b = c.bounds;
                let rect = Rect::at(b.min_x as i32, b.min_y as i32).of_size(b.width() as u32, b.height() as u32);
                draw_hollow_rect_mut(&mut img, rect, GREEN);
            }
            DynamicImage::ImageRgb8(img)
        }
        DewarpStage::Spans => {
            let mut img = canvas(analysis);
            for (k, span) in analysis.spans.iter().enumerate() {
                let colour = PALETTE[k % PALETTE.len()];
                for &i in &span.contours {
                    let b = analysis.contours[i].bounds;
                    let rect =
                        Rect::at(b.min_x as i32, b.min_y as i32).of_size(b.width() as u32, b.height() as u32);
                    draw_hollow_rect_mut(&mut img, rect, colour);
                }
            }
            DynamicImage::ImageRgb8(img)
        }
        DewarpStage::KeyPoints => {
            let mut img = canvas(analysis);
            for (k, span) in analysis.spans.iter().enumerate() {
                let colour = PALETTE[k % PALETTE.len()];
                for p in &span.key_points {
                    dot(&mut img, p.x, p.y, colour);
                }
            }
            DynamicImage::ImageRgb8(img)
        }
        DewarpStage::Curves => {
            let mut img = canvas(analysis);
            for (k, span) in analysis.spans.iter().enumerate() {
                let points: Vec<(f32, f32)> = span
                    .sample_curve(4)
                    .iter()
                    .map(|p| (p.x as f32, p.y as f32))
                    .collect();
                polyline(&mut img, &points, PALETTE[k % PALETTE.len()]);
            }
            DynamicImage::ImageRgb8(img)
        }
        DewarpStage::Correspondence => {
            let mut img = canvas(analysis);
            let interval = analysis.sampling_interval;
            for (k, span) in analysis.spans.iter().enumerate() {
                for observed in span.sample_curve(interval) {
                    dot(&mut img, observed.x, observed.y, RED);
                    if let Ok(model) = &analysis.model {
                        let (px, _) = analysis.frame.to_page(&observed);
                        if let Some(py) = model.predict(k, px) {
                            let predicted = analysis.frame.to_pixel(px, py);
                            dot(&mut img, predicted.x, predicted.y, BLUE);
                        }
                    }
                }
            }
            DynamicImage::ImageRgb8(img)
        }
        DewarpStage::Output => canvas(analysis).into(),
    }
}
