// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate space markers.

use std::fmt;

/// Absolute pixel coordinates of a particular bitmap or view, origin at the
/// top-left corner, +y pointing down.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Fractions of the frame width and height, in `[0, 1] x [0, 1]`.
///
/// Detection happens in capture-buffer pixels while the overlay is drawn in
/// view pixels of a different resolution; this is the only space that is
/// safe to hand between the two.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
