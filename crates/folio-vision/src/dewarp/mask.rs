// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectangular-kernel morphology that closes letters into text-line blobs.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

/// Largest kernel side a morphology `Mask` accepts.
const MAX_KERNEL: u32 = 511;

/// Straight `len`-tap kernel, horizontal or vertical, anchored at its middle.
fn line_kernel(len: u32, horizontal: bool) -> Mask {
    let len = len.clamp(1, MAX_KERNEL);
    let (w, h) = if horizontal { (len, 1) } else { (1, len) };
    let anchor = ((len - 1) / 2) as u8;
    let (cx, cy) = if horizontal { (anchor, 0) } else { (0, anchor) };
    Mask::from_image(&GrayImage::from_pixel(w, h, Luma([255])), cx, cy)
}

/// Dilate with a `width x 1` rectangle, smearing letters into words.
pub fn dilate_horizontal(mask: &GrayImage, width: u32) -> GrayImage {
    grayscale_dilate(mask, &line_kernel(width, true))
}

/// Erode with a `1 x height` rectangle, cutting the bridges between lines.
pub fn erode_vertical(mask: &GrayImage, height: u32) -> GrayImage {
    grayscale_erode(mask, &line_kernel(height, false))
}
