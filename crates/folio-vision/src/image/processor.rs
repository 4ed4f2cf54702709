// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: load, binarize and save whole pages, plus the grayscale
// working copies the detectors and the dewarper analyse.

use folio_core::error::{FolioError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use tracing::{debug, info, instrument};

use super::threshold::adaptive_threshold;

/// Processing chain over one in-memory page.
///
/// Each step consumes `self` and returns the transformed page.
///
/// ```ignore
/// ImageProcessor::open("page.jpg")?
///     .binarize(15, 10)
///     .save("page.png")?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    /// Load an image file; the format is sniffed from its contents.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref())
            .map_err(|err| FolioError::Image(format!("failed to open {}: {}", path.as_ref().display(), err)))?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Local-mean adaptive binarization: black ink on white paper.
    #[instrument(skip(self), fields(block_radius, offset))]
    pub fn binarize(self, block_radius: u32, offset: i32) -> Self {
        debug!(block_radius, offset, "Binarizing page");
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(adaptive_threshold(&gray, block_radius, offset)),
        }
    }

    /// Write the page. The format follows the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            FolioError::Image(format!("failed to save image to {}: {}", path.as_ref().display(), err))
        })
    }
}

/// Grayscale working copy whose longest side is at most `max_dimension`,
/// plus the factor that maps working pixels back to source pixels.
pub fn gray_working_copy(image: &DynamicImage, max_dimension: u32) -> (GrayImage, f64) {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if longest == 0 || longest <= max_dimension {
        return (gray, 1.0);
    }
    let scale = max_dimension as f64 / longest as f64;
    let small_w = ((w as f64 * scale).round() as u32).max(1);
    let small_h = ((h as f64 * scale).round() as u32).max(1);
    let small = image::imageops::resize(&gray, small_w, small_h, FilterType::Triangle);
    (small, w as f64 / small_w as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn working_copy_reports_scale_back_to_source() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(1000, 500));
        let (small, back) = gray_working_copy(&img, 250);
        assert_eq!(small.dimensions(), (250, 125));
        assert!((back - 4.0).abs() < 1e-9);
    }

    #[test]
    fn small_frames_are_not_upscaled() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(120, 80));
        let (gray, back) = gray_working_copy(&img, 512);
        assert_eq!(gray.dimensions(), (120, 80));
        assert_eq!(back, 1.0);
    }

    #[test]
    fn binarized_page_round_trips_through_a_file() {
        let mut page = GrayImage::from_pixel(60, 40, Luma([225u8]));
        for x in 5..55 {
            page.put_pixel(x, 20, Luma([20u8]));
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");

        ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(page))
            .binarize(7, 10)
            .save(&path)
            .unwrap();
        let back = ImageProcessor::open(&path).unwrap().into_dynamic().to_luma8();
        assert_eq!(back.get_pixel(30, 20).0[0], 0);
        assert_eq!(back.get_pixel(30, 5).0[0], 255);
    }

    #[test]
    fn unreadable_file_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageProcessor::open(dir.path().join("missing.png")).err().unwrap();
        assert!(matches!(err, FolioError::Image(_)));
    }
}
