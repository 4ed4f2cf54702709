// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar points and sizes tagged with their coordinate space.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::{Normalized, Pixel};
use crate::error::{FolioError, Result};

/// A real-valued 2D point in the coordinate space `S`.
#[derive(PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Point<S> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    _space: PhantomData<S>,
}

impl<S> Point<S> {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// The origin, which is also every corner of the "no detection" outline.
    #[inline]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise difference `self - other`.
    #[inline]
    pub fn sub(&self, other: &Self) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }

    /// Midpoint between two points.
    #[inline]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

impl<S> Clone for Point<S> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Point<S> {}

impl<S> std::fmt::Debug for Point<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

impl<S> Default for Point<S> {
    fn default() -> Self {
        Self::origin()
    }
}

impl Point<Pixel> {
    /// Divide by the frame dimensions.
    #[inline]
    pub fn normalize(&self, frame: Size<Pixel>) -> Point<Normalized> {
        Point::new(self.x / frame.width, self.y / frame.height)
    }
}

impl Point<Normalized> {
    /// Multiply by the target dimensions.
    #[inline]
    pub fn denormalize(&self, target: Size<Pixel>) -> Point<Pixel> {
        Point::new(self.x * target.width, self.y * target.height)
    }
}

/// Width and height in the coordinate space `S`.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Size<S> {
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    _space: PhantomData<S>,
}

impl<S> Size<S> {
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            _space: PhantomData,
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when both sides are finite and strictly positive.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Returns `self`, or `InvalidGeometry` when the size cannot be divided by.
    pub fn checked(self) -> Result<Self> {
        if self.is_usable() {
            Ok(self)
        } else {
            Err(FolioError::InvalidGeometry(format!(
                "size {}x{} must be finite and positive",
                self.width, self.height
            )))
        }
    }
}

impl Size<Pixel> {
    /// Size of a bitmap with integer dimensions.
    #[inline]
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }
}

impl<S> std::fmt::Debug for Size<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_divides_by_frame() {
        let p: Point<Pixel> = Point::new(320.0, 120.0);
        let n = p.normalize(Size::from_dimensions(640, 480));
        assert_eq!(n, Point::new(0.5, 0.25));
    }

    #[test]
    fn size_usability() {
        assert!(Size::<Pixel>::new(10.0, 1.0).is_usable());
        assert!(!Size::<Pixel>::new(0.0, 1.0).is_usable());
        assert!(!Size::<Pixel>::new(f64::NAN, 1.0).is_usable());
        assert!(Size::<Pixel>::new(-1.0, 5.0).checked().is_err());
    }

    #[test]
    fn serializes_without_space_marker() {
        let p: Point<Normalized> = Point::new(0.1, 0.9);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"x":0.1,"y":0.9}"#);
        let back: Point<Normalized> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
