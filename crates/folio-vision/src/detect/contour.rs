// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour-based page detector.

use folio_core::config::DetectorConfig;
use folio_core::geometry::{Pixel, Point, Size};
use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};
use tracing::{instrument, trace};

use super::polygon::{approximate_quad, polygon_area, rectangularity};
use super::{Candidate, Detection, QuadrilateralDetector, finish, passes_filters};
use crate::image::gray_working_copy;

/// Finds the page as the largest convex four-cornered contour of the edge map.
///
/// ## Pipeline
///
/// 1. Downscale to `working_max_dimension` and convert to grayscale
/// 2. Gaussian blur
/// 3. Canny edge detection
/// 4. Dilate then erode to bridge small gaps in the page border
/// 5. Trace outer contours (at most `max_contours`)
/// 6. Douglas-Peucker simplification down to four corners
/// 7. Shape, area and aspect filters, then confidence from rectangularity
///    times the fraction of the quad the contour actually fills
pub struct ContourDetector {
    config: DetectorConfig,
}

impl ContourDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let blurred = gaussian_blur_f32(gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        match self.config.close_radius {
            0 => edges,
            k => erode(&dilate(&edges, Norm::LInf, k), Norm::LInf, k),
        }
    }
}

impl QuadrilateralDetector for ContourDetector {
    fn name(&self) -> &'static str {
        "contour"
    }

    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    fn detect(&self, frame: &DynamicImage) -> Option<Detection> {
        if frame.width() < 8 || frame.height() < 8 {
            return None;
        }
        let (gray, _) = gray_working_copy(frame, self.config.working_max_dimension);
        let size = Size::from_dimensions(gray.width(), gray.height());
        let edges = self.edge_map(&gray);

        let mut candidates = Vec::new();
        for contour in find_contours::<i32>(&edges)
            .iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.points.len() >= 8)
            .take(self.config.max_contours)
        {
            let points: Vec<Point<Pixel>> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect();

            let Some(quad) = approximate_quad(&points, self.config.approx_epsilon) else {
                continue;
            };
            if !passes_filters(&quad, size, &self.config) {
                continue;
            }

            let fill = (polygon_area(&points) / quad.area()).clamp(0.0, 1.0);
            let confidence = rectangularity(&quad) * fill;
            trace!(?quad, confidence, "Quad candidate");
            candidates.push(Candidate {
                outline: quad,
                confidence,
            });
        }

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
