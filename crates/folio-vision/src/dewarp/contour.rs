// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text blobs: outer contours of the closed ink mask and their shape statistics.

use std::collections::BTreeMap;

use folio_core::config::DewarpConfig;
use folio_core::geometry::{Pixel, Point};
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use tracing::debug;

/// Axis-aligned bounds in inclusive pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x + 1.0
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y + 1.0
    }

    fn of(points: &[Point<Pixel>]) -> Self {
        points.iter().fold(
            Self {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, p| Self {
                min_x: b.min_x.min(p.x),
                min_y: b.min_y.min(p.y),
                max_x: b.max_x.max(p.x),
                max_y: b.max_y.max(p.y),
            },
        )
    }
}

/// One word-sized blob of ink. Immutable once built.
#[derive(Debug, Clone)]
pub struct TextContour {
    pub points: Vec<Point<Pixel>>,
    pub bounds: Bounds,
    /// Bounding-box area.
    pub area: f64,
    /// Bounding-box height / width.
    pub aspect: f64,
    pub center: Point<Pixel>,
    /// Principal axis angle in radians, `None` for blobs too round to have one.
    pub angle: Option<f64>,
}

impl TextContour {
    pub fn from_points(points: Vec<Point<Pixel>>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let bounds = Bounds::of(&points);
        let n = points.len() as f64;
        let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
        let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for p in &points {
            let (dx, dy) = (p.x - cx, p.y - cy);
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        // Eigenvalues of the 2x2 covariance.
        let half_trace = (sxx + syy) * 0.5;
        let root = (((sxx - syy) * 0.5).powi(2) + sxy * sxy).sqrt();
        let (major, minor) = (half_trace + root, half_trace - root);
        let angle = (major > 2.0 * minor.max(0.0) && major > 0.0)
            .then(|| 0.5 * (2.0 * sxy).atan2(sxx - syy));

        Some(Self {
            area: bounds.width() * bounds.height(),
            aspect: bounds.height() / bounds.width(),
            center: Point::new(cx, cy),
            angle,
            bounds,
            points,
        })
    }

    /// Midline samples every `interval` pixels across the blob: the middle of
    /// the boundary's vertical extent in that column.
    pub fn midline_samples(&self, interval: u32) -> Vec<Point<Pixel>> {
        let mut columns: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
        for p in &self.points {
            let entry = columns.entry(p.x.round() as i64).or_insert((p.y, p.y));
            entry.0 = entry.0.min(p.y);
            entry.1 = entry.1.max(p.y);
        }
        let step = interval.max(1) as i64;
        let start = self.bounds.min_x.round() as i64;
        columns
            .into_iter()
            .filter(|(x, _)| (x - start) % step == 0)
            .map(|(x, (lo, hi))| Point::new(x as f64, (lo + hi) * 0.5))
            .collect()
    }
}

/// Outer contours of `mask` that look like words on a text line.
pub fn text_contours(mask: &GrayImage, config: &DewarpConfig) -> Vec<TextContour> {
    let page_area = mask.width() as f64 * mask.height() as f64;
    let traced = find_contours::<i32>(mask);
    let total = traced.len();

    let kept: Vec<TextContour> = traced
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer))
        .take(config.max_contours)
        .filter_map(|c| {
            TextContour::from_points(
                c.points
                    .iter()
                    .map(|p| Point::new(p.x as f64, p.y as f64))
                    .collect(),
            )
        })
        .filter(|c| accept(c, page_area, config))
        .collect();

    debug!(traced = total, kept = kept.len(), "Text contours extracted");
    kept
}

fn accept(c: &TextContour, page_area: f64, config: &DewarpConfig) -> bool {
    let (w, h) = (c.bounds.width(), c.bounds.height());
    c.aspect <= config.max_aspect
        && w >= config.min_width as f64
        && h >= config.min_height as f64
        && h <= config.max_height as f64
        && c.area <= config.max_area_fraction * page_area
}
