// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-based page detector: the page border as four dominant Hough lines.

use folio_core::config::DetectorConfig;
use folio_core::geometry::{Pixel, Point, QuadOutline, Size};
use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use nalgebra::{Matrix2, Vector2};
use tracing::{debug, instrument};

use super::polygon::rectangularity;
use super::{Candidate, Detection, QuadrilateralDetector, finish, passes_filters};
use crate::image::gray_working_copy;

/// Detects the page from its straight borders.
///
/// ## Pipeline
///
/// 1. Downscale, grayscale, Gaussian blur
/// 2. Canny edge detection
/// 3. Hough line detection; the vote threshold scales with the image
///    diagonal so detection is resolution independent
/// 4. Classify lines as roughly horizontal or roughly vertical
/// 5. Take the outermost line on each side
/// 6. Corners from pairwise intersections
///
/// Works on pages whose borders are partly occluded, where the contour
/// detector loses the closed outline.
pub struct HoughDetector {
    config: DetectorConfig,
}

impl HoughDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let blurred = gaussian_blur_f32(gray, self.config.blur_sigma);
        canny(&blurred, self.config.canny_low, self.config.canny_high)
    }
}

impl QuadrilateralDetector for HoughDetector {
    fn name(&self) -> &'static str {
        "hough"
    }

    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    fn detect(&self, frame: &DynamicImage) -> Option<Detection> {
        if frame.width() < 8 || frame.height() < 8 {
            return None;
        }
        let (gray, _) = gray_working_copy(frame, self.config.working_max_dimension);
        let (w, h) = gray.dimensions();
        let size = Size::from_dimensions(w, h);
        let edges = self.edge_map(&gray);

        let diagonal = (w as f64).hypot(h as f64);
        let vote_threshold = ((diagonal * 0.25) as u32).max(self.config.hough_vote_threshold);
        let options = LineDetectionOptions {
            vote_threshold,
            suppression_radius: self.config.hough_suppression_radius,
        };
        let lines = detect_lines(&edges, options);
        debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");
        if lines.len() < 4 {
            return finish(self.name(), Vec::new(), size, &self.config);
        }

        let (horizontal, vertical) = classify_lines(&lines);
        let quad = outermost_quad(
            &horizontal,
            &vertical,
            w as f64,
            h as f64,
            self.config.hough_min_corner_degrees,
        );
        let candidates = quad
            .filter(|q| passes_filters(q, size, &self.config))
            .map(|q| Candidate {
                outline: q,
                confidence: rectangularity(&q),
            })
            .into_iter()
            .collect();

        finish(self.name(), candidates, size, &self.config)
    }

    fn preprocess(&self, frame: &DynamicImage) -> Option<GrayImage> {
        if frame.width() == 0 || frame.height() == 0 {
            return None;
        }
        let (gray, _) = gray_working_copy(frame, self.config.working_max_dimension);
        Some(self.edge_map(&gray))
    }
}

/// Split lines into roughly horizontal and roughly vertical sets.
///
/// `angle_in_degrees` is the direction of the line's normal: near 90 the
/// line itself is horizontal, near 0 or 180 it is vertical. Lines within
/// 30 degrees of the diagonal are discarded.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }

    (horizontal, vertical)
}

/// Unit normal of a Hough line; the line is `normal · p = r`.
fn normal(line: &PolarLine) -> Vector2<f64> {
    let (sin, cos) = (line.angle_in_degrees as f64).to_radians().sin_cos();
    Vector2::new(cos, sin)
}

/// Y where a roughly horizontal line crosses `x`.
fn y_at(line: &PolarLine, x: f64) -> f64 {
    let n = normal(line);
    (line.r as f64 - x * n.x) / n.y
}

/// X where a roughly vertical line crosses `y`.
fn x_at(line: &PolarLine, y: f64) -> f64 {
    let n = normal(line);
    (line.r as f64 - y * n.y) / n.x
}

fn extreme_by(lines: &[PolarLine], key: impl Fn(&PolarLine) -> f64, largest: bool) -> Option<PolarLine> {
    let cmp = |a: &&PolarLine, b: &&PolarLine| key(a).total_cmp(&key(b));
    if largest {
        lines.iter().max_by(cmp).copied()
    } else {
        lines.iter().min_by(cmp).copied()
    }
}

/// Intersect the outermost top, bottom, left and right lines.
fn outermost_quad(
    horizontal: &[PolarLine],
    vertical: &[PolarLine],
    width: f64,
    height: f64,
    min_corner_degrees: f64,
) -> Option<QuadOutline<Pixel>> {
    if horizontal.len() < 2 || vertical.len() < 2 {
        debug!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            "Insufficient horizontal/vertical lines"
        );
        return None;
    }
    let (mid_x, mid_y) = (width * 0.5, height * 0.5);
    let top = extreme_by(horizontal, |l| y_at(l, mid_x), false)?;
    let bottom = extreme_by(horizontal, |l| y_at(l, mid_x), true)?;
    let left = extreme_by(vertical, |l| x_at(l, mid_y), false)?;
    let right = extreme_by(vertical, |l| x_at(l, mid_y), true)?;

    let at = |a: &PolarLine, b: &PolarLine| corner(a, b, min_corner_degrees);
    Some(QuadOutline::new(
        at(&top, &left)?,
        at(&top, &right)?,
        at(&bottom, &right)?,
        at(&bottom, &left)?,
    ))
}

/// Where two border lines meet.
///
/// Solves `[n_a; n_b] p = [r_a; r_b]`. The determinant of that system is the
/// sine of the angle between the lines, so lines closer than
/// `min_corner_degrees` to parallel give `None`.
fn corner(a: &PolarLine, b: &PolarLine, min_corner_degrees: f64) -> Option<Point<Pixel>> {
    let (na, nb) = (normal(a), normal(b));
    let system = Matrix2::new(na.x, na.y, nb.x, nb.y);
    if system.determinant().abs() < min_corner_degrees.to_radians().sin().max(f64::EPSILON) {
        return None;
    }
    let p = system.try_inverse()? * Vector2::new(a.r as f64, b.r as f64);
    Some(Point::new(p.x, p.y))
}
