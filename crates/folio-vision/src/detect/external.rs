// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detector backed by an external rectangle-detection service.

use folio_core::config::DetectorConfig;
use folio_core::error::Result;
use folio_core::geometry::{Normalized, Point, QuadOutline, Size};
use image::DynamicImage;
use tracing::debug;

use super::{Candidate, Detection, QuadrilateralDetector, finish, passes_filters};

/// One rectangle reported by an external detection primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleObservation {
    /// Corners in any order, as fractions of the frame.
    pub corners: [Point<Normalized>; 4],
    pub confidence: f32,
}

/// A platform rectangle detector (e.g. a vision framework on the device).
pub trait RectangleProvider: Send + Sync {
    fn observe(&self, frame: &DynamicImage) -> Result<Vec<RectangleObservation>>;
}

/// Applies the usual ordering, validation, confidence and selection rules
/// to whatever a [`RectangleProvider`] reports.
pub struct ExternalDetector<P> {
    provider: P,
    config: DetectorConfig,
}

impl<P: RectangleProvider> ExternalDetector<P> {
    pub fn new(provider: P, config: DetectorConfig) -> Self {
        Self { provider, config }
    }
}

impl<P: RectangleProvider> QuadrilateralDetector for ExternalDetector<P> {
    fn name(&self) -> &'static str {
        "external"
    }

    fn detect(&self, frame: &DynamicImage) -> Option<Detection> {
        let size = Size::from_dimensions(frame.width(), frame.height());
        if !size.is_usable() {
            return None;
        }
        let observations = match self.provider.observe(frame) {
            Ok(obs) => obs,
            Err(err) => {
                debug!(error = %err, "Rectangle provider failed; treating frame as empty");
                return None;
            }
        };

        // Aspect and convexity only make sense in real pixels.
        let candidates = observations
            .iter()
            .filter(|o| o.corners.iter().all(Point::is_finite))
            .map(|o| Candidate {
                outline: QuadOutline::from_unordered(o.corners.map(|c| c.denormalize(size))),
                confidence: o.confidence as f64,
            })
            .filter(|c| passes_filters(&c.outline, size, &self.config))
            .collect();

        finish(self.name(), candidates, size, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::error::FolioError;
    use image::GrayImage;

    struct Fixed(Vec<RectangleObservation>);

    impl RectangleProvider for Fixed {
        fn observe(&self, _frame: &DynamicImage) -> Result<Vec<RectangleObservation>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl RectangleProvider for Failing {
        fn observe(&self, _frame: &DynamicImage) -> Result<Vec<RectangleObservation>> {
            Err(FolioError::ResourceUnavailable("vision service offline".into()))
        }
    }

    fn frame() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::new(300, 400))
    }

    fn obs(x0: f64, y0: f64, x1: f64, y1: f64, confidence: f32) -> RectangleObservation {
        RectangleObservation {
            // Deliberately scrambled order.
            corners: [
                Point::new(x1, y1),
                Point::new(x0, y0),
                Point::new(x0, y1),
                Point::new(x1, y0),
            ],
            confidence,
        }
    }

    #[test]
    fn orders_and_selects_largest_confident_rectangle() {
        let detector = ExternalDetector::new(
            Fixed(vec![
                obs(0.2, 0.2, 0.6, 0.6, 0.9),
                obs(0.1, 0.1, 0.9, 0.9, 0.8),
                obs(0.05, 0.05, 0.95, 0.95, 0.2),
            ]),
            DetectorConfig::default(),
        );
        let detection = detector.detect(&frame()).unwrap();
        assert!((detection.confidence - 0.8).abs() < 1e-6);
        assert!(detection.outline.top_left.distance(&Point::new(0.1, 0.1)) < 1e-9);
        assert!(detection.outline.bottom_right.distance(&Point::new(0.9, 0.9)) < 1e-9);
    }

    #[test]
    fn provider_failure_is_no_detection() {
        let detector = ExternalDetector::new(Failing, DetectorConfig::default());
        assert!(detector.detect(&frame()).is_none());
    }

    #[test]
    fn degenerate_observation_is_rejected() {
        let flat = RectangleObservation {
            corners: [
                Point::new(0.1, 0.5),
                Point::new(0.5, 0.5),
                Point::new(0.9, 0.5),
                Point::new(0.5, 0.5),
            ],
            confidence: 1.0,
        };
        let detector = ExternalDetector::new(Fixed(vec![flat]), DetectorConfig::default());
        assert!(detector.detect(&frame()).is_none());
    }
}
