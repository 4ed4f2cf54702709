// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture-time processing: perspective extraction followed by dewarping.

use folio_core::config::ScanConfig;
use folio_core::error::Result;
use folio_core::geometry::{Pixel, QuadOutline};
use folio_core::types::CancelFlag;
use image::DynamicImage;
use tracing::{info, instrument, warn};

use crate::dewarp::TextDewarper;
use crate::extract::PerspectiveExtractor;

/// The processed page and which steps actually changed it.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub image: DynamicImage,
    /// `false` when extraction fell back to the full frame.
    pub extracted: bool,
    /// `false` when dewarping was disabled or fell back.
    pub dewarped: bool,
}

/// Turns a captured frame and its committed outline into a flat page.
///
/// Runs on the blocking pool; implementations should check `cancel` between
/// expensive steps.
pub trait PageProcessor: Send + Sync {
    fn process(&self, frame: &DynamicImage, outline: &QuadOutline<Pixel>, cancel: &CancelFlag) -> Result<ProcessedPage>;
}

/// Perspective extraction followed by optional text-line dewarping.
pub struct PagePipeline {
    extractor: PerspectiveExtractor,
    dewarper: Option<TextDewarper>,
}

impl PagePipeline {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            extractor: PerspectiveExtractor::new(config.extract.clone()),
            dewarper: config
                .session
                .dewarp
                .then(|| TextDewarper::new(config.dewarp.clone())),
        }
    }
}

impl PageProcessor for PagePipeline {
    /// Extract the page inside `outline` (in `frame` pixels), then dewarp it.
    ///
    /// Each step falls back to its input on recoverable failure. Only
    /// cancellation and non-recoverable errors are returned.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    fn process(&self, frame: &DynamicImage, outline: &QuadOutline<Pixel>, cancel: &CancelFlag) -> Result<ProcessedPage> {
        cancel.check()?;
        let (page, extracted) = match self.extractor.try_extract(outline, frame) {
            Ok(page) => (page, true),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Extraction skipped, keeping full frame");
                (frame.clone(), false)
            }
            Err(e) => return Err(e),
        };

        let (image, dewarped) = match &self.dewarper {
            Some(dewarper) => {
                let out = dewarper.dewarp(&page, cancel)?;
                (out.image, out.applied)
            }
            None => (page, false),
        };

        info!(
            extracted,
            dewarped,
            out_w = image.width(),
            out_h = image.height(),
            "Page processed"
        );
        Ok(ProcessedPage {
            image,
            extracted,
            dewarped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::test_frames::page_on_dark;
    use folio_core::error::FolioError;
    use folio_core::geometry::Point;

    fn page_outline() -> QuadOutline<Pixel> {
        QuadOutline::from_corners([
            Point::new(40.0, 30.0),
            Point::new(360.0, 30.0),
            Point::new(360.0, 270.0),
            Point::new(40.0, 270.0),
        ])
    }

    #[test]
    fn extracts_and_falls_back_on_blank_page_text() {
        let pipeline = PagePipeline::new(&ScanConfig::default());
        let frame = page_on_dark(400, 300, 0.1, 0.1, 0.9, 0.9);
        let page = pipeline.process(&frame, &page_outline(), &CancelFlag::new()).unwrap();
        assert!(page.extracted);
        assert!(!page.dewarped);
        assert_eq!((page.image.width(), page.image.height()), (320, 240));
    }

    #[test]
    fn zero_outline_passes_frame_through() {
        let mut config = ScanConfig::default();
        config.session.dewarp = false;
        let pipeline = PagePipeline::new(&config);
        let frame = page_on_dark(200, 150, 0.1, 0.1, 0.9, 0.9);
        let page = pipeline
            .process(&frame, &QuadOutline::zero(), &CancelFlag::new())
            .unwrap();
        assert!(!page.extracted && !page.dewarped);
        assert_eq!(page.image.as_bytes(), frame.as_bytes());
    }

    #[test]
    fn cancellation_is_reported() {
        let pipeline = PagePipeline::new(&ScanConfig::default());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let frame = page_on_dark(200, 150, 0.1, 0.1, 0.9, 0.9);
        let err = pipeline.process(&frame, &page_outline(), &cancel).unwrap_err();
        assert!(matches!(err, FolioError::Cancelled));
    }
}
