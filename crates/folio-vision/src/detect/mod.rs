// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral detection: find the page outline in a single frame.
//
// Every detector answers the same question for one frame and keeps no state
// between frames. A frame without a confident page is `None`, not an error.

pub mod contour;
pub mod external;
pub mod hough;
pub mod overlay;
pub mod polygon;

use folio_core::config::{DetectorConfig, DetectorKind};
use folio_core::geometry::{Normalized, Pixel, QuadOutline, Size};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use contour::ContourDetector;
pub use external::{ExternalDetector, RectangleObservation, RectangleProvider};
pub use hough::HoughDetector;
pub use overlay::render_outline;

/// A page outline found in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Corners as fractions of the frame width and height.
    pub outline: QuadOutline<Normalized>,
    /// In `[0, 1]`.
    pub confidence: f32,
}

/// Locates a document-shaped quadrilateral in a frame.
pub trait QuadrilateralDetector: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Best page outline in `frame`, or `None` when nothing qualifies.
    fn detect(&self, frame: &DynamicImage) -> Option<Detection>;

    /// The detector's processed view of `frame` (e.g. its edge map), for the
    /// live preview. Detectors without one return `None`.
    fn preprocess(&self, _frame: &DynamicImage) -> Option<GrayImage> {
        None
    }
}

impl<D: QuadrilateralDetector + ?Sized> QuadrilateralDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&self, frame: &DynamicImage) -> Option<Detection> {
        (**self).detect(frame)
    }

    fn preprocess(&self, frame: &DynamicImage) -> Option<GrayImage> {
        (**self).preprocess(frame)
    }
}

/// Construct the built-in detector named by `config.kind`.
pub fn build_detector(config: &DetectorConfig) -> Box<dyn QuadrilateralDetector> {
    match config.kind {
        DetectorKind::Contour => Box::new(ContourDetector::new(config.clone())),
        DetectorKind::Hough => Box::new(HoughDetector::new(config.clone())),
    }
}

/// A quad that survived a detector's own checks, in the pixel space of the
/// image it was found in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub outline: QuadOutline<Pixel>,
    pub confidence: f64,
}

/// Shared geometric filters: valid shape, area fraction and aspect bounds.
pub(crate) fn passes_filters(quad: &QuadOutline<Pixel>, image: Size<Pixel>, config: &DetectorConfig) -> bool {
    if !quad.is_valid() {
        return false;
    }
    let fraction = quad.area() / image.area();
    if fraction < config.min_area_fraction || fraction > config.max_area_fraction {
        return false;
    }
    let (w, h) = quad.estimated_dimensions();
    let (short, long) = if w < h { (w, h) } else { (h, w) };
    long > f64::EPSILON && short / long >= config.min_aspect_ratio
}

/// Largest candidate wins. Candidates whose area is within `tie_tolerance`
/// (relative) of the largest are ranked by how close their long/short ratio
/// is to `target_aspect`.
pub(crate) fn select_best(candidates: &[Candidate], tie_tolerance: f64, target_aspect: f64) -> Option<Candidate> {
    let max_area = candidates
        .iter()
        .map(|c| c.outline.area())
        .fold(0.0, f64::max);
    if max_area <= 0.0 {
        return None;
    }

    let aspect_error = |c: &Candidate| -> f64 {
        match c.outline.estimated_aspect_ratio() {
            Some(r) if r > 0.0 => (r.max(1.0 / r) - target_aspect).abs(),
            _ => f64::INFINITY,
        }
    };

    candidates
        .iter()
        .filter(|c| (max_area - c.outline.area()) / max_area <= tie_tolerance)
        .min_by(|a, b| aspect_error(a).total_cmp(&aspect_error(b)))
        .copied()
}

/// Apply the confidence threshold and selection rule, then express the
/// winner in normalized coordinates of `image`.
pub(crate) fn finish(
    detector: &'static str,
    candidates: Vec<Candidate>,
    image: Size<Pixel>,
    config: &DetectorConfig,
) -> Option<Detection> {
    let confident: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.confidence >= config.min_confidence as f64)
        .collect();
    let best = select_best(&confident, config.tie_tolerance, config.target_aspect);
    match best {
        Some(best) => {
            debug!(
                detector,
                candidates = confident.len(),
                confidence = best.confidence,
                "Page outline detected"
            );
            Some(Detection {
                outline: best.outline.normalize(image),
                confidence: best.confidence.clamp(0.0, 1.0) as f32,
            })
        }
        None => {
            debug!(detector, "No page outline in frame");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    use image::{DynamicImage, GrayImage, Luma};

    /// Dark background with a bright axis-aligned page between the given
    /// normalized corners.
    pub fn page_on_dark(width: u32, height: u32, x0: f64, y0: f64, x1: f64, y1: f64) -> DynamicImage {
        let (px0, py0) = ((x0 * width as f64) as u32, (y0 * height as f64) as u32);
        let (px1, py1) = ((x1 * width as f64) as u32, (y1 * height as f64) as u32);
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (px0..px1).contains(&x) && (py0..py1).contains(&y) {
                Luma([235u8])
            } else {
                Luma([25u8])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    pub fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([128u8])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::geometry::Point;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> QuadOutline<Pixel> {
        QuadOutline::from_corners([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    fn candidate(outline: QuadOutline<Pixel>) -> Candidate {
        Candidate {
            outline,
            confidence: 1.0,
        }
    }

    #[test]
    fn largest_area_wins() {
        let small = candidate(rect(0.0, 0.0, 100.0, 140.0));
        let big = candidate(rect(0.0, 0.0, 200.0, 200.0));
        let best = select_best(&[small, big], 0.02, 1.4).unwrap();
        assert_eq!(best.outline, big.outline);
    }

    #[test]
    fn ties_prefer_page_aspect() {
        // Equal areas: 100x196 (ratio 1.96) vs 140x140 vs 118.3x165.6 (~1.4).
        let tall = candidate(rect(0.0, 0.0, 100.0, 196.0));
        let square = candidate(rect(0.0, 0.0, 140.0, 140.0));
        let page = candidate(rect(0.0, 0.0, 118.3, 165.62));
        let best = select_best(&[tall, square, page], 0.02, 1.4).unwrap();
        assert_eq!(best.outline, page.outline);
    }

    #[test]
    fn filters_reject_tiny_and_sliver_quads() {
        let config = DetectorConfig::default();
        let frame = Size::from_dimensions(400, 400);
        assert!(passes_filters(&rect(40.0, 40.0, 360.0, 360.0), frame, &config));
        assert!(!passes_filters(&rect(0.0, 0.0, 20.0, 20.0), frame, &config));
        assert!(!passes_filters(&rect(0.0, 0.0, 400.0, 40.0), frame, &config));
        assert!(!passes_filters(&QuadOutline::zero(), frame, &config));
    }

    #[test]
    fn built_detector_matches_configured_kind() {
        let mut config = DetectorConfig::default();
        assert_eq!(build_detector(&config).name(), "contour");
        config.kind = DetectorKind::Hough;
        assert_eq!(build_detector(&config).name(), "hough");
    }
}
