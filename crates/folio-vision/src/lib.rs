// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-vision: page detection, perspective extraction, and text-line
// dewarping for Folio.
//
// Everything here is synchronous and frame-local. The capture session in
// folio-capture decides when to call it and on which thread.

pub mod detect;
pub mod dewarp;
pub mod extract;
pub mod image;
pub mod pipeline;

// Re-export the primary types so callers can use `folio_vision::TextDewarper` etc.
pub use detect::{
    ContourDetector, Detection, ExternalDetector, HoughDetector, QuadrilateralDetector, RectangleObservation,
    RectangleProvider, build_detector, render_outline,
};
pub use dewarp::{DewarpAnalysis, DewarpModel, DewarpOutput, DewarpStage, TextDewarper};
pub use extract::PerspectiveExtractor;
pub use crate::image::processor::ImageProcessor;
pub use pipeline::{PagePipeline, PageProcessor, ProcessedPage};
