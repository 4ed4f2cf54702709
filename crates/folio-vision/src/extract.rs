// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective extraction: warp the page inside an outline to a flat rectangle.

use folio_core::config::ExtractConfig;
use folio_core::error::{FolioError, Result};
use folio_core::geometry::{Pixel, QuadOutline};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;

/// Rectifies the quadrilateral page region of a frame.
///
/// The output keeps the page's estimated proportions: width is the mean of
/// the top and bottom edges, height the mean of the left and right edges,
/// scaled down uniformly to `max_output_dimension`.
pub struct PerspectiveExtractor {
    config: ExtractConfig,
}

impl PerspectiveExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Size of the rectified page for `outline`, or `None` when the outline
    /// has no usable extent.
    pub fn output_dimensions(&self, outline: &QuadOutline<Pixel>) -> Option<(u32, u32)> {
        let (w, h) = outline.estimated_dimensions();
        if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
            return None;
        }
        let cap = self.config.max_output_dimension.max(1) as f64;
        let scale = (cap / w.max(h)).min(1.0);
        Some((
            ((w * scale).round() as u32).max(1),
            ((h * scale).round() as u32).max(1),
        ))
    }

    /// Rectify `outline` (in `frame` pixels), falling back to an unmodified
    /// copy of `frame` when the outline is the sentinel or cannot be mapped.
    pub fn extract(&self, outline: &QuadOutline<Pixel>, frame: &DynamicImage) -> DynamicImage {
        match self.try_extract(outline, frame) {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "Perspective extraction failed; keeping original frame");
                frame.clone()
            }
        }
    }

    /// As [`extract`](Self::extract) but reports why extraction failed.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn try_extract(&self, outline: &QuadOutline<Pixel>, frame: &DynamicImage) -> Result<DynamicImage> {
        if outline.is_zero() {
            return Err(FolioError::Extraction("no outline to extract".into()));
        }
        if !outline.is_valid() {
            return Err(FolioError::Extraction(format!(
                "outline is not a convex clockwise quad: {outline:?}"
            )));
        }
        let (out_w, out_h) = self
            .output_dimensions(outline)
            .ok_or_else(|| FolioError::Extraction("outline has no extent".into()))?;

        let src = outline
            .corners()
            .map(|p| (p.x as f32, p.y as f32));
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];
        let projection = Projection::from_control_points(src, dest)
            .ok_or_else(|| FolioError::Extraction("singular homography".into()))?;

        let page = match frame {
            DynamicImage::ImageLuma8(gray) => {
                let mut out = GrayImage::new(out_w, out_h);
                warp_into(gray, &projection, Interpolation::Bilinear, Luma([255u8]), &mut out);
                DynamicImage::ImageLuma8(out)
            }
            other => {
                let rgba = other.to_rgba8();
                let mut out = RgbaImage::new(out_w, out_h);
                warp_into(
                    &rgba,
                    &projection,
                    Interpolation::Bilinear,
                    Rgba([255u8, 255, 255, 255]),
                    &mut out,
                );
                DynamicImage::ImageRgba8(out)
            }
        };
        info!(out_w, out_h, "Perspective extraction applied");

        if self.config.post_process {
            debug!("Binarizing extracted page");
            return Ok(ImageProcessor::from_dynamic(page)
                .binarize(self.config.block_radius, self.config.threshold_offset)
                .into_dynamic());
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::geometry::Point;

    fn frame() -> DynamicImage {
        let img = RgbaImage::from_fn(320, 240, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255]));
        DynamicImage::ImageRgba8(img)
    }

    fn trapezoid() -> QuadOutline<Pixel> {
        QuadOutline::from_corners([
            Point::new(60.0, 30.0),
            Point::new(260.0, 40.0),
            Point::new(290.0, 220.0),
            Point::new(30.0, 210.0),
        ])
    }

    #[test]
    fn zero_outline_returns_identical_frame() {
        let extractor = PerspectiveExtractor::new(ExtractConfig::default());
        let f = frame();
        let out = extractor.extract(&QuadOutline::zero(), &f);
        assert_eq!(out.as_bytes(), f.as_bytes());
        assert_eq!(out.color(), f.color());
    }

    #[test]
    fn collinear_outline_falls_back() {
        let extractor = PerspectiveExtractor::new(ExtractConfig::default());
        let flat = QuadOutline::from_corners([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(0.0, 10.0),
        ]);
        let f = frame();
        assert!(matches!(extractor.try_extract(&flat, &f), Err(FolioError::Extraction(_))));
        assert_eq!(extractor.extract(&flat, &f).as_bytes(), f.as_bytes());
    }

    #[test]
    fn output_aspect_matches_outline_estimate() {
        let extractor = PerspectiveExtractor::new(ExtractConfig::default());
        let outline = trapezoid();
        let page = extractor.try_extract(&outline, &frame()).unwrap();
        let expected = outline.estimated_aspect_ratio().unwrap();
        let actual = page.width() as f64 / page.height() as f64;
        assert!((actual / expected - 1.0).abs() < 0.05, "{actual} vs {expected}");
    }

    #[test]
    fn output_is_capped() {
        let extractor = PerspectiveExtractor::new(ExtractConfig {
            max_output_dimension: 100,
            ..ExtractConfig::default()
        });
        let (w, h) = extractor.output_dimensions(&trapezoid()).unwrap();
        assert!(w.max(h) <= 100);
    }

    #[test]
    fn post_processing_binarizes() {
        let extractor = PerspectiveExtractor::new(ExtractConfig {
            post_process: true,
            ..ExtractConfig::default()
        });
        let page = extractor.try_extract(&trapezoid(), &frame()).unwrap();
        let gray = page.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
