// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry shared by detection, tracking, extraction and display.
//
// Every point and outline carries its coordinate space in the type. Detectors
// emit `Normalized` outlines; the preview surface and the extractor need
// `Pixel` outlines of their own (different) resolutions. The only way across
// is `normalize` / `denormalize`.

pub mod outline;
pub mod point;
pub mod space;

pub use outline::QuadOutline;
pub use point::{Point, Size};
pub use space::{Normalized, Pixel};

/// Convert a pixel outline into fractions of `frame_size`.
pub fn normalize(outline: &QuadOutline<Pixel>, frame_size: Size<Pixel>) -> QuadOutline<Normalized> {
    outline.normalize(frame_size)
}

/// Project a normalized outline onto a view of `view_size` pixels.
pub fn denormalize(outline: &QuadOutline<Normalized>, view_size: Size<Pixel>) -> QuadOutline<Pixel> {
    outline.denormalize(view_size)
}
