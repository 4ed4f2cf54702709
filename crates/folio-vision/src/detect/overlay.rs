// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Draws a detected page outline over its frame.

use folio_core::geometry::{Pixel, QuadOutline};
use image::{DynamicImage, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

const OUTLINE: Rgb<u8> = Rgb([20, 200, 80]);
const CORNER: Rgb<u8> = Rgb([230, 40, 40]);

/// RGB copy of `frame` with `outline` drawn on it. A zero outline leaves the
/// copy bare.
///
/// Stroke width grows with the frame so the outline stays visible on full
/// resolution photos.
pub fn render_outline(frame: &DynamicImage, outline: &QuadOutline<Pixel>) -> DynamicImage {
    let mut canvas = frame.to_rgb8();
    if outline.is_zero() {
        return DynamicImage::ImageRgb8(canvas);
    }

    let stroke = (canvas.width().min(canvas.height()) / 250).max(1) as i32;
    let corners = outline.corners();
    for (i, from) in corners.iter().enumerate() {
        let to = corners[(i + 1) % corners.len()];
        for dx in -stroke / 2..=stroke / 2 {
            for dy in -stroke / 2..=stroke / 2 {
                draw_line_segment_mut(
                    &mut canvas,
                    ((from.x + dx as f64) as f32, (from.y + dy as f64) as f32),
                    ((to.x + dx as f64) as f32, (to.y + dy as f64) as f32),
                    OUTLINE,
                );
            }
        }
    }
    for c in corners {
        draw_filled_circle_mut(&mut canvas, (c.x.round() as i32, c.y.round() as i32), stroke * 3, CORNER);
    }
    DynamicImage::ImageRgb8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::geometry::Point;
    use image::GrayImage;

    fn frame() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 100, image::Luma([40u8])))
    }

    #[test]
    fn outline_edges_and_corners_are_drawn() {
        let outline = QuadOutline::new(
            Point::new(20.0, 10.0),
            Point::new(180.0, 10.0),
            Point::new(180.0, 90.0),
            Point::new(20.0, 90.0),
        );
        let out = render_outline(&frame(), &outline).to_rgb8();
        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(*out.get_pixel(100, 10), OUTLINE);
        assert_eq!(*out.get_pixel(20, 50), OUTLINE);
        assert_eq!(*out.get_pixel(180, 90), CORNER);
        assert_eq!(*out.get_pixel(100, 50), Rgb([40, 40, 40]));
    }

    #[test]
    fn zero_outline_draws_nothing() {
        let out = render_outline(&frame(), &QuadOutline::zero()).to_rgb8();
        assert!(out.pixels().all(|p| *p == Rgb([40, 40, 40])));
    }
}
