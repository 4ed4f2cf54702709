// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page outlines: four ordered corners of a detected document quadrilateral.

use serde::{Deserialize, Serialize};

use super::{Normalized, Pixel, Point, Size};
use crate::error::Result;

/// A quadrilateral approximating the visible boundary of a page.
///
/// Corners are ordered clockwise in image coordinates (+y down), starting at
/// the top-left. The all-origin outline returned by [`QuadOutline::zero`] is
/// the "no detection" sentinel. Equality compares coordinates exactly.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct QuadOutline<S> {
    pub top_left: Point<S>,
    pub top_right: Point<S>,
    pub bottom_right: Point<S>,
    pub bottom_left: Point<S>,
}

impl<S> QuadOutline<S> {
    pub const fn new(
        top_left: Point<S>,
        top_right: Point<S>,
        bottom_right: Point<S>,
        bottom_left: Point<S>,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// The "no detection" sentinel.
    pub const fn zero() -> Self {
        Self::new(
            Point::origin(),
            Point::origin(),
            Point::origin(),
            Point::origin(),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.corners().iter().all(|c| c.x == 0.0 && c.y == 0.0)
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point<S>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Build from corners already in top-left, top-right, bottom-right,
    /// bottom-left order.
    pub fn from_corners(corners: [Point<S>; 4]) -> Self {
        let [tl, tr, br, bl] = corners;
        Self::new(tl, tr, br, bl)
    }

    /// Order four arbitrary corners clockwise (in +y-down image coordinates)
    /// starting from the corner closest to the top-left.
    pub fn from_unordered(mut corners: [Point<S>; 4]) -> Self {
        let cx = corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = corners.iter().map(|p| p.y).sum::<f64>() / 4.0;

        // With +y pointing down, increasing atan2 sweeps clockwise on screen.
        corners.sort_by(|a, b| {
            let ta = (a.y - cy).atan2(a.x - cx);
            let tb = (b.y - cy).atan2(b.x - cx);
            ta.total_cmp(&tb)
        });

        let start = corners
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (a.x + a.y).total_cmp(&(b.x + b.y)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        corners.rotate_left(start);
        Self::from_corners(corners)
    }

    /// Shoelace area, positive for clockwise (+y down) ordering.
    pub fn signed_area(&self) -> f64 {
        let c = self.corners();
        let mut twice = 0.0;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice += c[i].x * c[j].y - c[j].x * c[i].y;
        }
        twice * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn top_edge(&self) -> f64 {
        self.top_left.distance(&self.top_right)
    }

    pub fn bottom_edge(&self) -> f64 {
        self.bottom_left.distance(&self.bottom_right)
    }

    pub fn left_edge(&self) -> f64 {
        self.top_left.distance(&self.bottom_left)
    }

    pub fn right_edge(&self) -> f64 {
        self.top_right.distance(&self.bottom_right)
    }

    /// Mean of the top/bottom edge lengths and mean of the left/right edge
    /// lengths, i.e. the rectangle the outline most plausibly came from.
    pub fn estimated_dimensions(&self) -> (f64, f64) {
        (
            (self.top_edge() + self.bottom_edge()) * 0.5,
            (self.left_edge() + self.right_edge()) * 0.5,
        )
    }

    /// Estimated real-world width / height of the page, or `None` when the
    /// outline has no height.
    pub fn estimated_aspect_ratio(&self) -> Option<f64> {
        let (w, h) = self.estimated_dimensions();
        (h > f64::EPSILON && w.is_finite()).then(|| w / h)
    }

    /// Largest distance between corresponding corners of two outlines.
    pub fn max_corner_distance(&self, other: &Self) -> f64 {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .map(|(a, b)| a.distance(b))
            .fold(0.0, f64::max)
    }

    /// A usable outline: not the sentinel, finite, strictly convex with
    /// clockwise corner order, so no three corners are collinear.
    pub fn is_valid(&self) -> bool {
        if self.is_zero() {
            return false;
        }
        let c = self.corners();
        if !c.iter().all(Point::is_finite) {
            return false;
        }
        let scale = [
            self.top_edge(),
            self.right_edge(),
            self.bottom_edge(),
            self.left_edge(),
        ]
        .into_iter()
        .fold(0.0, f64::max);
        if scale <= f64::EPSILON {
            return false;
        }
        let eps = 1e-9 * scale * scale;
        (0..4).all(|i| {
            let (ax, ay) = c[(i + 1) % 4].sub(&c[i]);
            let (bx, by) = c[(i + 2) % 4].sub(&c[(i + 1) % 4]);
            ax * by - ay * bx > eps
        })
    }

    fn map<T>(&self, f: impl Fn(&Point<S>) -> Point<T>) -> QuadOutline<T> {
        QuadOutline::new(
            f(&self.top_left),
            f(&self.top_right),
            f(&self.bottom_right),
            f(&self.bottom_left),
        )
    }
}

impl<S> Default for QuadOutline<S> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<S> std::fmt::Debug for QuadOutline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadOutline")
            .field("top_left", &self.top_left)
            .field("top_right", &self.top_right)
            .field("bottom_right", &self.bottom_right)
            .field("bottom_left", &self.bottom_left)
            .finish()
    }
}

impl QuadOutline<Pixel> {
    /// Express the outline as fractions of `frame`.
    pub fn normalize(&self, frame: Size<Pixel>) -> QuadOutline<Normalized> {
        self.map(|p| p.normalize(frame))
    }

    /// As [`normalize`](Self::normalize), rejecting zero or non-finite sizes.
    pub fn try_normalize(&self, frame: Size<Pixel>) -> Result<QuadOutline<Normalized>> {
        Ok(self.normalize(frame.checked()?))
    }

    /// Scale every corner by `factor` (e.g. from a downscaled working copy
    /// back to the full frame).
    pub fn scaled(&self, factor: f64) -> QuadOutline<Pixel> {
        self.map(|p| Point::new(p.x * factor, p.y * factor))
    }
}

impl QuadOutline<Normalized> {
    /// Project the outline onto a target of `size` pixels.
    pub fn denormalize(&self, size: Size<Pixel>) -> QuadOutline<Pixel> {
        self.map(|p| p.denormalize(size))
    }

    /// As [`denormalize`](Self::denormalize), rejecting zero or non-finite
    /// sizes.
    pub fn try_denormalize(&self, size: Size<Pixel>) -> Result<QuadOutline<Pixel>> {
        Ok(self.denormalize(size.checked()?))
    }

    /// True when every corner lies inside the unit square.
    pub fn is_within_unit_square(&self) -> bool {
        self.corners()
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y))
    }
}
