// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-pixel remapping of a page through a fitted curvature model.

use image::{DynamicImage, Luma, Rgba};
use imageproc::geometric_transformations::{Interpolation, warp_with};
use tracing::{debug, instrument};

use super::fit::DewarpModel;

/// Source y coordinates evaluated on a coarse grid of output pixels and
/// interpolated bilinearly in between.
#[derive(Debug, Clone)]
pub struct RemapGrid {
    step: f32,
    cols: usize,
    rows: usize,
    source_y: Vec<f32>,
}

impl RemapGrid {
    /// Evaluate `model` for an output of `width x height` pixels every
    /// `step` pixels.
    pub fn build(model: &DewarpModel, width: u32, height: u32, step: u32) -> Self {
        let step = step.max(1);
        let cols = (width.saturating_sub(1) / step + 2) as usize;
        let rows = (height.saturating_sub(1) / step + 2) as usize;
        let (w, h) = (width.max(1) as f64, height.max(1) as f64);

        let mut source_y = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            let y = (r as u32 * step) as f64;
            for c in 0..cols {
                let x = (c as u32 * step) as f64;
                let (px, py) = (2.0 * x / w - 1.0, 2.0 * y / h - 1.0);
                let shift = model.displacement(px, py) * 0.5 * h;
                source_y.push((y + shift) as f32);
            }
        }

        Self {
            step: step as f32,
            cols,
            rows,
            source_y,
        }
    }

    fn at(&self, c: usize, r: usize) -> f32 {
        self.source_y[r.min(self.rows - 1) * self.cols + c.min(self.cols - 1)]
    }

    /// Source y for output pixel `(x, y)`.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let gx = (x / self.step).max(0.0);
        let gy = (y / self.step).max(0.0);
        let (c, r) = (gx.floor() as usize, gy.floor() as usize);
        let (fx, fy) = (gx - c as f32, gy - r as f32);

        let top = self.at(c, r) * (1.0 - fx) + self.at(c + 1, r) * fx;
        let bottom = self.at(c, r + 1) * (1.0 - fx) + self.at(c + 1, r + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Resample `page` so the model's curved text lines come out straight.
#[instrument(skip_all, fields(width = page.width(), height = page.height()))]
pub fn remap_page(page: &DynamicImage, model: &DewarpModel, grid_step: u32) -> DynamicImage {
    let grid = RemapGrid::build(model, page.width(), page.height(), grid_step);
    debug!(cols = grid.cols, rows = grid.rows, "Remap grid built");
    let mapping = |x: f32, y: f32| (x, grid.sample(x, y));

    match page {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(warp_with(
            gray,
            mapping,
            Interpolation::Bilinear,
            Luma([255u8]),
        )),
        other => DynamicImage::ImageRgba8(warp_with(
            &other.to_rgba8(),
            mapping,
            Interpolation::Bilinear,
            Rgba([255u8, 255, 255, 255]),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn flat_model() -> DewarpModel {
        DewarpModel {
            offsets: vec![-0.5, 0.5],
            span_heights: vec![-0.5, 0.5],
            a: vec![0.0, 0.0, 0.0],
            b: vec![0.0, 0.0, 0.0],
            rms_residual: 0.0,
        }
    }

    #[test]
    fn flat_model_is_identity_grid() {
        let grid = RemapGrid::build(&flat_model(), 100, 60, 16);
        for &(x, y) in &[(0.0, 0.0), (37.5, 12.25), (99.0, 59.0)] {
            assert!((grid.sample(x, y) - y).abs() < 1e-4);
        }
    }

    #[test]
    fn grid_interpolates_curvature() {
        let mut model = flat_model();
        model.a = vec![0.0, 0.1, 0.0];
        let grid = RemapGrid::build(&model, 200, 200, 10);
        // x = 200 maps to page x = 1: shift 0.1 * 100 px.
        assert!((grid.sample(200.0, 100.0) - 110.0).abs() < 1e-3);
        assert!((grid.sample(100.0, 50.0) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn flat_model_leaves_page_unchanged() {
        let page = DynamicImage::ImageLuma8(GrayImage::from_fn(40, 30, |x, y| Luma([((x * 7 + y * 3) % 256) as u8])));
        let out = remap_page(&page, &flat_model(), 8).to_luma8();
        assert_eq!(out.dimensions(), (40, 30));
        for y in 1..28 {
            for x in 1..38 {
                let (a, b) = (out.get_pixel(x, y).0[0], page.as_luma8().unwrap().get_pixel(x, y).0[0]);
                assert!(a.abs_diff(b) <= 1, "pixel ({x}, {y}): {a} vs {b}");
            }
        }
    }
}
