// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-line dewarping: straighten curved text on an already rectified page.
//
// The page is thresholded and closed into word blobs, the blobs are chained
// into text lines, and a thin polynomial surface fitted to the lines drives a
// per-pixel vertical remap. Analysis runs at a working resolution; the model
// lives in page coordinates normalized to [-1, 1], so it applies unchanged
// to the full-resolution page.

pub mod contour;
pub mod fit;
pub mod mask;
pub mod remap;
pub mod render;
pub mod span;

use folio_core::config::DewarpConfig;
use folio_core::error::Result;
use folio_core::types::CancelFlag;
use image::{DynamicImage, GrayImage};
use tracing::{debug, info, instrument, warn};

use crate::image::{gray_working_copy, ink_mask};

pub use contour::{Bounds, TextContour};
pub use fit::{DewarpModel, PageFrame, Polynomial};
pub use remap::{RemapGrid, remap_page};
pub use render::DewarpStage;
pub use span::TextSpan;

/// Every intermediate product of one dewarp analysis, in working pixels.
#[derive(Debug)]
pub struct DewarpAnalysis {
    /// Grayscale working copy of the page.
    pub page: GrayImage,
    pub frame: PageFrame,
    pub thresholded: GrayImage,
    pub dilated: GrayImage,
    pub closed: GrayImage,
    pub contours: Vec<TextContour>,
    pub spans: Vec<TextSpan>,
    /// The fitted model, or why none could be fitted.
    pub model: Result<DewarpModel>,
    pub(crate) sampling_interval: u32,
}

/// Result of [`TextDewarper::dewarp`].
#[derive(Debug, Clone)]
pub struct DewarpOutput {
    pub image: DynamicImage,
    /// `false` when the input was passed through unchanged.
    pub applied: bool,
}

/// Removes page curvature using the text lines on the page.
#[derive(Debug, Clone)]
pub struct TextDewarper {
    config: DewarpConfig,
}

impl TextDewarper {
    pub fn new(config: DewarpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DewarpConfig {
        &self.config
    }

    /// Run every analysis stage on `page`, checking `cancel` between stages.
    ///
    /// A failed model fit is recorded in [`DewarpAnalysis::model`] rather
    /// than returned, so the earlier stages stay available for rendering.
    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    pub fn analyze(&self, page: &DynamicImage, cancel: &CancelFlag) -> Result<DewarpAnalysis> {
        let c = &self.config;
        cancel.check()?;
        let (gray, _) = gray_working_copy(page, c.working_max_dimension);
        let frame = PageFrame {
            width: gray.width() as f64,
            height: gray.height() as f64,
        };

        let thresholded = ink_mask(&gray, c.block_radius, c.threshold_offset, c.margin_x, c.margin_y);
        cancel.check()?;
        let dilated = mask::dilate_horizontal(&thresholded, c.dilate_width);
        let closed = mask::erode_vertical(&dilated, c.erode_height);
        cancel.check()?;

        let contours = contour::text_contours(&closed, c);
        cancel.check()?;
        let spans = span::group_spans(&contours, c);
        cancel.check()?;

        let model = fit::fit_model(&spans, frame, c);
        debug!(
            contours = contours.len(),
            spans = spans.len(),
            fitted = model.is_ok(),
            "Dewarp analysis complete"
        );

        Ok(DewarpAnalysis {
            page: gray,
            frame,
            thresholded,
            dilated,
            closed,
            contours,
            spans,
            model,
            sampling_interval: c.sampling_interval,
        })
    }

    /// Dewarp `page`, failing when no usable model can be fitted.
    pub fn try_dewarp(&self, page: &DynamicImage, cancel: &CancelFlag) -> Result<DynamicImage> {
        let model = self.analyze(page, cancel)?.model?;
        cancel.check()?;
        let out = remap_page(page, &model, self.config.grid_step);
        info!(
            spans = model.offsets.len(),
            max_shift = model.max_displacement() * 0.5,
            "Page dewarped"
        );
        Ok(out)
    }

    /// Dewarp `page`, passing it through unchanged when the text does not
    /// support a model. Only cancellation and non-recoverable errors are
    /// returned.
    pub fn dewarp(&self, page: &DynamicImage, cancel: &CancelFlag) -> Result<DewarpOutput> {
        match self.try_dewarp(page, cancel) {
            Ok(image) => Ok(DewarpOutput { image, applied: true }),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Dewarp skipped, keeping rectified page");
                Ok(DewarpOutput {
                    image: page.clone(),
                    applied: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Render one diagnostic stage for `page`.
    pub fn render(&self, page: &DynamicImage, stage: DewarpStage, cancel: &CancelFlag) -> Result<DynamicImage> {
        let analysis = self.analyze(page, cancel)?;
        if stage == DewarpStage::Output {
            return Ok(match &analysis.model {
                Ok(model) => remap_page(page, model, self.config.grid_step),
                Err(_) => page.clone(),
            });
        }
        Ok(render::render_stage(&analysis, stage))
    }
}

#[cfg(test)]
pub(crate) mod test_pages {
    use image::{DynamicImage, GrayImage, Luma};

    /// 600x800 white page with eleven lines of dark 40x10 "words". Each
    /// line follows `y = y0 + k (x - 300)^2`, sagging `sag` px at 240 px
    /// from the center.
    pub fn curved_text_page(sag: f64) -> DynamicImage {
        let mut img = GrayImage::from_pixel(600, 800, Luma([255]));
        let k = sag / (240.0 * 240.0);
        for line in 0..11 {
            let y0 = 150.0 + line as f64 * 50.0;
            let mut x0 = 60u32;
            while x0 + 40 <= 540 {
                let cx = x0 as f64 + 20.0;
                let cy = (y0 + k * (cx - 300.0).powi(2)).round() as u32;
                for y in cy - 5..cy + 5 {
                    for x in x0..x0 + 40 {
                        img.put_pixel(x, y, Luma([20]));
                    }
                }
                x0 += 54;
            }
        }
        DynamicImage::ImageLuma8(img)
    }
}

#[cfg(test)]
mod tests {
    use super::test_pages::curved_text_page;
    use super::*;
    use folio_core::error::FolioError;
    use image::Luma;

    #[test]
    fn curved_page_fits_a_model() {
        let dewarper = TextDewarper::new(DewarpConfig::default());
        let analysis = dewarper.analyze(&curved_text_page(10.0), &CancelFlag::new()).unwrap();
        assert_eq!(analysis.spans.len(), 11);
        let model = analysis.model.as_ref().unwrap();
        let shift = model.displacement(0.8, 0.0);
        assert!((0.02..0.045).contains(&shift), "displacement {shift}");
    }

    #[test]
    fn curved_page_dewarps_at_full_size() {
        let dewarper = TextDewarper::new(DewarpConfig::default());
        let page = curved_text_page(10.0);
        let out = dewarper.dewarp(&page, &CancelFlag::new()).unwrap();
        assert!(out.applied);
        assert_eq!((out.image.width(), out.image.height()), (600, 800));
    }

    #[test]
    fn blank_page_is_degenerate_and_passes_through() {
        let dewarper = TextDewarper::new(DewarpConfig::default());
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 400, Luma([250])));

        let err = dewarper.try_dewarp(&page, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, FolioError::DewarpDegenerate { spans: 0, required: 2 }));

        let out = dewarper.dewarp(&page, &CancelFlag::new()).unwrap();
        assert!(!out.applied);
        assert_eq!(out.image.as_bytes(), page.as_bytes());
    }

    #[test]
    fn cancelled_analysis_stops() {
        let dewarper = TextDewarper::new(DewarpConfig::default());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = dewarper.dewarp(&curved_text_page(10.0), &cancel).unwrap_err();
        assert!(matches!(err, FolioError::Cancelled));
    }

    #[test]
    fn every_stage_renders() {
        let dewarper = TextDewarper::new(DewarpConfig::default());
        let page = curved_text_page(10.0);
        for stage in DewarpStage::ALL {
            let img = dewarper.render(&page, stage, &CancelFlag::new()).unwrap();
            assert_eq!((img.width(), img.height()), (600, 800), "{stage}");
        }
    }
}
