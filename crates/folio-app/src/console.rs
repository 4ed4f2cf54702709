// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Terminal stand-ins for the preview surface and the capture delegate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use folio_capture::{CaptureDelegate, CapturedPage, RenderSurface};
use folio_core::error::FolioError;
use folio_core::geometry::{Pixel, QuadOutline};
use folio_core::human_errors::humanize_error;
use image::DynamicImage;
use tracing::{debug, info, warn};

/// Logs outline changes instead of drawing them.
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    frames: AtomicUsize,
    showing: AtomicBool,
}

impl ConsoleSurface {
    pub fn frames_shown(&self) -> usize {
        self.frames.load(Ordering::Relaxed)
    }
}

impl RenderSurface for ConsoleSurface {
    fn set_outline(&self, outline: QuadOutline<Pixel>) {
        let visible = !outline.is_zero();
        if self.showing.swap(visible, Ordering::Relaxed) != visible {
            if visible {
                info!(?outline, "Page outline locked");
            } else {
                info!("Page outline lost");
            }
        }
    }

    fn set_image(&self, image: &DynamicImage) {
        let n = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(frame = n, width = image.width(), height = image.height(), "Preview frame");
    }
}

/// Keeps the captured page for the command to write out.
#[derive(Debug, Default)]
pub struct PageCollector {
    page: Mutex<Option<CapturedPage>>,
}

impl PageCollector {
    pub fn take(&self) -> Option<CapturedPage> {
        self.page
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

impl CaptureDelegate for PageCollector {
    fn on_page_captured(&self, page: CapturedPage) {
        info!(id = %page.id, dewarped = page.dewarped, "Page received");
        *self.page.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(page);
    }

    fn on_cancelled(&self) {
        info!("Scan cancelled");
    }

    fn on_error(&self, error: &FolioError) {
        let human = humanize_error(error);
        warn!(error = %error, suggestion = %human.suggestion, "{}", human.message);
    }
}
