// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator traits: where frames come from and where results go.
//
// The session owns its collaborators and never hands them references back,
// so none of these traits need to know about the session.

use chrono::{DateTime, Utc};
use folio_core::error::{FolioError, Result};
use folio_core::geometry::{Pixel, QuadOutline};
use folio_core::types::CaptureId;
use image::DynamicImage;

use crate::gate::FrameSink;

/// A camera or anything else that produces frames.
pub trait FrameSource: Send {
    /// Begin pushing frames into `sink`. Fails with
    /// `FolioError::ResourceUnavailable` when the device cannot be opened.
    fn start(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop producing frames. Calling it twice is harmless.
    fn stop(&mut self);
}

/// The on-screen preview.
pub trait RenderSurface: Send + Sync {
    /// Draw `outline` in view pixels. The zero outline clears it.
    fn set_outline(&self, outline: QuadOutline<Pixel>);

    /// Show a frame (raw or processed, per the session's preview mode).
    fn set_image(&self, image: &DynamicImage);
}

/// Receives the outcome of a capture session.
pub trait CaptureDelegate: Send + Sync {
    /// Called exactly once per successful capture.
    fn on_page_captured(&self, page: CapturedPage);

    /// The session was cancelled before anything was captured.
    fn on_cancelled(&self);

    /// A session-fatal failure, e.g. the frame source went away.
    fn on_error(&self, error: &FolioError);
}

/// A finished page.
#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub id: CaptureId,
    pub captured_at: DateTime<Utc>,
    /// The committed outline in pixels of the captured frame.
    pub outline: QuadOutline<Pixel>,
    pub image: DynamicImage,
    /// `false` when extraction fell back to the whole frame.
    pub extracted: bool,
    /// `false` when dewarping was disabled or fell back.
    pub dewarped: bool,
}
