// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local-mean binarization for page output and for text-line masks.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::integral_image;

/// Neighbourhood means over a grayscale page, backed by a summed-area table.
struct LocalMean {
    table: ImageBuffer<Luma<u64>, Vec<u64>>,
    width: u32,
    height: u32,
}

impl LocalMean {
    fn new(gray: &GrayImage) -> Self {
        Self {
            table: integral_image::<_, u64>(gray),
            width: gray.width(),
            height: gray.height(),
        }
    }

    /// Mean over the `(2r+1)^2` window around `(x, y)`, cut at the page edge.
    fn at(&self, x: u32, y: u32, radius: u32) -> f64 {
        let (x0, y0) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let x1 = x.saturating_add(radius).saturating_add(1).min(self.width);
        let y1 = y.saturating_add(radius).saturating_add(1).min(self.height);
        let corner = |cx: u32, cy: u32| self.table.get_pixel(cx, cy).0[0] as i128;

        let sum = corner(x1, y1) - corner(x0, y1) - corner(x1, y0) + corner(x0, y0);
        sum as f64 / ((x1 - x0) as f64 * (y1 - y0) as f64)
    }

    /// True where `gray` is darker than its neighbourhood by more than `offset`.
    fn is_ink(&self, gray: &GrayImage, x: u32, y: u32, radius: u32, offset: i32) -> bool {
        let cut = (self.at(x, y, radius) - offset as f64).clamp(0.0, 255.0);
        (gray.get_pixel(x, y).0[0] as f64) < cut
    }
}

/// Black text on white paper: ink becomes 0, everything else 255.
pub fn adaptive_threshold(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let means = LocalMean::new(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if means.is_ink(gray, x, y, block_radius, offset) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Ink mask (255 = ink) with `margin_x` columns and `margin_y` rows cleared
/// along every edge, so page borders and shadows never read as text.
pub fn ink_mask(gray: &GrayImage, block_radius: u32, offset: i32, margin_x: u32, margin_y: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let means = LocalMean::new(gray);
    let inside = |x: u32, y: u32| {
        x >= margin_x && y >= margin_y && x.saturating_add(margin_x) < w && y.saturating_add(margin_y) < h
    };
    GrayImage::from_fn(w, h, |x, y| {
        if inside(x, y) && means.is_ink(gray, x, y, block_radius, offset) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
