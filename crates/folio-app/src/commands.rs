// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations. Each returns a serializable report; printing is
// left to `main`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use folio_capture::{CaptureSession, ReplaySource, SessionOutcome};
use folio_core::error::{FolioError, Result};
use folio_core::geometry::{Pixel, QuadOutline, Size};
use folio_core::types::CancelFlag;
use folio_core::ScanConfig;
use folio_vision::{
    Detection, DewarpStage, ImageProcessor, PerspectiveExtractor, TextDewarper, build_detector, render_outline,
};
use image::DynamicImage;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::console::{ConsoleSurface, PageCollector};

fn load(path: &Path) -> Result<DynamicImage> {
    Ok(ImageProcessor::open(path)?.into_dynamic())
}

fn save(image: DynamicImage, path: &Path) -> Result<()> {
    ImageProcessor::from_dynamic(image).save(path)
}

/// Outcome of `folio extract`.
#[derive(Debug, Serialize)]
pub struct ExtractReport {
    pub output: PathBuf,
    pub detection: Option<Detection>,
    /// Outline used for extraction, in source pixels.
    pub outline: Option<QuadOutline<Pixel>>,
    pub width: u32,
    pub height: u32,
}

/// Outcome of `folio dewarp`.
#[derive(Debug, Serialize)]
pub struct DewarpReport {
    pub output: PathBuf,
    pub stage: String,
    pub applied: bool,
}

/// Outcome of `folio scan`.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub output: PathBuf,
    pub id: String,
    pub captured_at: String,
    pub outline: QuadOutline<Pixel>,
    pub extracted: bool,
    pub dewarped: bool,
    pub width: u32,
    pub height: u32,
}

/// Detect the page in one image. With `overlay`, the frame is also written
/// there with the outline drawn on it.
#[instrument(skip(config))]
pub fn detect(config: &ScanConfig, input: &Path, overlay: Option<&Path>) -> Result<Option<Detection>> {
    let frame = load(input)?;
    let detector = build_detector(&config.detector);
    let detection = detector.detect(&frame);
    match &detection {
        Some(d) => info!(confidence = d.confidence, "Page found"),
        None => warn!("No page found"),
    }

    if let Some(path) = overlay {
        let outline = detection
            .map(|d| d.outline.denormalize(Size::from_dimensions(frame.width(), frame.height())))
            .unwrap_or_else(QuadOutline::zero);
        save(render_outline(&frame, &outline), path)?;
    }
    Ok(detection)
}

/// Detect the page, then rectify it to `output`. Without a detection the
/// image is written unchanged.
#[instrument(skip(config))]
pub fn extract(config: &ScanConfig, input: &Path, output: &Path) -> Result<ExtractReport> {
    let frame = load(input)?;
    let detection = build_detector(&config.detector).detect(&frame);
    let outline = detection.map(|d| d.outline.denormalize(Size::from_dimensions(frame.width(), frame.height())));

    let extractor = PerspectiveExtractor::new(config.extract.clone());
    let page = extractor.extract(&outline.unwrap_or_else(QuadOutline::zero), &frame);
    let (width, height) = (page.width(), page.height());
    save(page, output)?;

    Ok(ExtractReport {
        output: output.to_path_buf(),
        detection,
        outline,
        width,
        height,
    })
}

/// Dewarp an already rectified page, or render one diagnostic stage of it.
#[instrument(skip(config))]
pub fn dewarp(config: &ScanConfig, input: &Path, output: &Path, stage: Option<DewarpStage>) -> Result<DewarpReport> {
    let page = load(input)?;
    let dewarper = TextDewarper::new(config.dewarp.clone());
    let cancel = CancelFlag::new();

    let (image, applied, stage) = match stage {
        Some(stage) if stage != DewarpStage::Output => (dewarper.render(&page, stage, &cancel)?, false, stage),
        _ => {
            let out = dewarper.dewarp(&page, &cancel)?;
            (out.image, out.applied, DewarpStage::Output)
        }
    };
    save(image, output)?;

    Ok(DewarpReport {
        output: output.to_path_buf(),
        stage: stage.to_string(),
        applied,
    })
}

/// Run a capture session over replayed frames and write the captured page.
///
/// Frames are replayed in a loop every `interval` until a page is captured
/// or `max_wait` passes.
#[instrument(skip(config, frames), fields(frames = frames.len()))]
pub fn scan(
    config: &ScanConfig,
    frames: &[PathBuf],
    output: &Path,
    interval: Duration,
    max_wait: Duration,
) -> Result<ScanReport> {
    if frames.is_empty() {
        return Err(FolioError::Config("scan needs at least one frame".into()));
    }
    let images = frames.iter().map(|p| load(p)).collect::<Result<Vec<_>>>()?;

    let surface = Arc::new(ConsoleSurface::default());
    let collector = Arc::new(PageCollector::default());
    let runtime = tokio::runtime::Runtime::new()?;

    let outcome = runtime.block_on(async {
        let source = ReplaySource::new(images, interval).looping(true);
        let handle = CaptureSession::new(config.clone(), source, surface.clone(), collector.clone()).spawn();
        let canceller = handle.canceller();
        let join = handle.join();
        tokio::pin!(join);
        tokio::select! {
            outcome = &mut join => outcome,
            _ = tokio::time::sleep(max_wait) => {
                warn!(max_wait_ms = max_wait.as_millis() as u64, "No stable page in time, cancelling");
                canceller.cancel();
                join.await
            }
        }
    })?;
    info!(frames_shown = surface.frames_shown(), "Session finished");

    match outcome {
        SessionOutcome::Captured(_) => {
            let page = collector.take().ok_or(FolioError::SessionClosed)?;
            let (width, height) = (page.image.width(), page.image.height());
            save(page.image, output)?;
            Ok(ScanReport {
                output: output.to_path_buf(),
                id: page.id.to_string(),
                captured_at: page.captured_at.to_rfc3339(),
                outline: page.outline,
                extracted: page.extracted,
                dewarped: page.dewarped,
                width,
                height,
            })
        }
        SessionOutcome::Cancelled => Err(FolioError::Cancelled),
        SessionOutcome::Failed(e) => Err(e),
    }
}

/// The default configuration as pretty JSON.
pub fn default_config() -> Result<String> {
    ScanConfig::default().to_json_pretty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    /// 400x300 photo-like frame: a bright page at (40, 30)-(360, 270).
    fn write_frame(dir: &TempDir, name: &str) -> PathBuf {
        let img = GrayImage::from_fn(400, 300, |x, y| {
            if (40..360).contains(&x) && (30..270).contains(&y) {
                Luma([235u8])
            } else {
                Luma([25u8])
            }
        });
        let path = dir.path().join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn detect_reports_normalized_outline() {
        let dir = TempDir::new().unwrap();
        let input = write_frame(&dir, "frame.png");
        let detection = detect(&ScanConfig::default(), &input, None).unwrap().expect("page detected");
        let tl = detection.outline.top_left;
        assert!((tl.x - 0.1).abs() < 0.03 && (tl.y - 0.1).abs() < 0.03);

        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("confidence"));
    }

    #[test]
    fn detect_overlay_marks_the_page_border() {
        let dir = TempDir::new().unwrap();
        let input = write_frame(&dir, "frame.png");
        let overlay = dir.path().join("overlay.png");
        detect(&ScanConfig::default(), &input, Some(&overlay)).unwrap().expect("page detected");

        let drawn = image::open(&overlay).unwrap().to_rgb8();
        assert_eq!(drawn.dimensions(), (400, 300));
        // Coloured pixels only appear where the outline was drawn.
        let coloured = |x: u32, y: u32| {
            let p = drawn.get_pixel(x, y).0;
            p[0] != p[1] || p[1] != p[2]
        };
        assert!((30..50).any(|x| coloured(x, 150)));
        assert!(!coloured(200, 150));
    }

    #[test]
    fn overlay_without_a_page_is_the_bare_frame() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("blank.png");
        GrayImage::from_pixel(120, 90, Luma([128u8])).save(&input).unwrap();
        let overlay = dir.path().join("overlay.png");

        assert!(detect(&ScanConfig::default(), &input, Some(&overlay)).unwrap().is_none());
        let drawn = image::open(&overlay).unwrap().to_rgb8();
        assert!(drawn.pixels().all(|p| p.0 == [128, 128, 128]));
    }

    #[test]
    fn extract_writes_rectified_page() {
        let dir = TempDir::new().unwrap();
        let input = write_frame(&dir, "frame.png");
        let output = dir.path().join("page.png");
        let report = extract(&ScanConfig::default(), &input, &output).unwrap();

        assert!(report.detection.is_some());
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (report.width, report.height));
        let aspect = report.width as f64 / report.height as f64;
        assert!((aspect - 320.0 / 240.0).abs() < 0.1, "aspect {aspect}");
    }

    #[test]
    fn dewarp_of_blank_page_keeps_it() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("blank.png");
        GrayImage::from_pixel(200, 300, Luma([250u8])).save(&input).unwrap();
        let output = dir.path().join("out.png");

        let report = dewarp(&ScanConfig::default(), &input, &output, None).unwrap();
        assert!(!report.applied);
        assert_eq!(report.stage, "output");
        assert_eq!(image::open(&output).unwrap().to_luma8(), image::open(&input).unwrap().to_luma8());
    }

    #[test]
    fn dewarp_stage_renders_mask() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("blank.png");
        GrayImage::from_pixel(200, 300, Luma([250u8])).save(&input).unwrap();
        let output = dir.path().join("threshold.png");

        let report = dewarp(&ScanConfig::default(), &input, &output, Some(DewarpStage::Threshold)).unwrap();
        assert_eq!(report.stage, "threshold");
        let mask = image::open(&output).unwrap().to_luma8();
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn missing_input_is_an_image_error() {
        let dir = TempDir::new().unwrap();
        let err = detect(&ScanConfig::default(), &dir.path().join("nope.png"), None).unwrap_err();
        assert!(matches!(err, FolioError::Image(_)));
    }

    #[test]
    fn scan_captures_from_replayed_frames() {
        let dir = TempDir::new().unwrap();
        let frame = write_frame(&dir, "frame.png");
        let output = dir.path().join("scan.png");
        let mut config = ScanConfig::default();
        config.tracker.timeout_ms = 300;

        let report = scan(
            &config,
            &[frame],
            &output,
            Duration::from_millis(20),
            Duration::from_secs(30),
        )
        .unwrap();
        assert!(report.extracted);
        assert!(output.exists());
    }

    #[test]
    fn scan_without_frames_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = scan(
            &ScanConfig::default(),
            &[],
            &dir.path().join("x.png"),
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, FolioError::Config(_)));
    }

    #[test]
    fn default_config_round_trips() {
        let json = default_config().unwrap();
        assert_eq!(ScanConfig::from_json_str(&json).unwrap(), ScanConfig::default());
    }
}
