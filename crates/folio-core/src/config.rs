// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan configuration.
//
// Every field has a default, so a JSON file only needs to name what it
// overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// All tunables for a capture session and the page pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub tracker: TrackerConfig,
    pub detector: DetectorConfig,
    pub extract: ExtractConfig,
    pub dewarp: DewarpConfig,
    pub session: SessionConfig,
}

impl ScanConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;
        if t.timeout_ms == 0 {
            return Err(FolioError::Config("tracker.timeout_ms must be > 0".into()));
        }

        let d = &self.detector;
        if d.working_max_dimension < 32 {
            return Err(FolioError::Config(
                "detector.working_max_dimension must be >= 32".into(),
            ));
        }
        if d.canny_low > d.canny_high {
            return Err(FolioError::Config(format!(
                "detector.canny_low ({}) exceeds canny_high ({})",
                d.canny_low, d.canny_high
            )));
        }
        if !(0.0..1.0).contains(&d.min_area_fraction)
            || d.max_area_fraction <= d.min_area_fraction
            || d.max_area_fraction > 1.0
        {
            return Err(FolioError::Config(
                "detector area fractions must satisfy 0 <= min < max <= 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&d.min_confidence) {
            return Err(FolioError::Config(
                "detector.min_confidence must be within [0, 1]".into(),
            ));
        }

        if !(0.0..90.0).contains(&d.hough_min_corner_degrees) {
            return Err(FolioError::Config(
                "detector.hough_min_corner_degrees must be within [0, 90)".into(),
            ));
        }

        let w = &self.dewarp;
        if w.working_max_dimension < 64 {
            return Err(FolioError::Config(
                "dewarp.working_max_dimension must be >= 64".into(),
            ));
        }
        if w.min_height > w.max_height {
            return Err(FolioError::Config(
                "dewarp.min_height exceeds dewarp.max_height".into(),
            ));
        }
        if w.span_degree == 0 || w.global_degree == 0 {
            return Err(FolioError::Config(
                "dewarp polynomial degrees must be >= 1".into(),
            ));
        }
        if w.min_spans < 2 {
            return Err(FolioError::Config("dewarp.min_spans must be >= 2".into()));
        }
        if w.grid_step == 0 || w.sampling_interval == 0 {
            return Err(FolioError::Config(
                "dewarp.grid_step and dewarp.sampling_interval must be > 0".into(),
            ));
        }

        let s = &self.session;
        if s.view_width == 0 || s.view_height == 0 {
            return Err(FolioError::Config("session view size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Outline stability tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Time from first acquisition to commit.
    pub timeout_ms: u64,
    /// Consecutive invalid detections tolerated while tracking.
    pub max_miss_count: u32,
}

impl TrackerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            max_miss_count: 3,
        }
    }
}

/// Which quadrilateral detector a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Contour,
    Hough,
}

/// Quadrilateral detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    /// Frames are downscaled so their longest side is at most this.
    pub working_max_dimension: u32,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Radius of the dilate-then-erode pass that bridges edge gaps.
    pub close_radius: u8,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approx_epsilon: f64,
    /// Candidate area bounds as fractions of the frame area.
    pub min_area_fraction: f64,
    pub max_area_fraction: f64,
    /// Minimum short-side / long-side ratio of a candidate.
    pub min_aspect_ratio: f64,
    pub min_confidence: f32,
    /// Upper bound on contours examined per frame.
    pub max_contours: usize,
    /// Relative area difference below which candidates count as tied.
    pub tie_tolerance: f64,
    /// Preferred long-side / short-side ratio used to break ties.
    pub target_aspect: f64,
    /// Hough detector only.
    pub hough_vote_threshold: u32,
    pub hough_suppression_radius: u32,
    /// Border lines meeting at less than this angle are treated as parallel
    /// and give no corner.
    pub hough_min_corner_degrees: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: DetectorKind::Contour,
            working_max_dimension: 512,
            blur_sigma: 1.5,
            canny_low: 50.0,
            canny_high: 150.0,
            close_radius: 2,
            approx_epsilon: 0.02,
            min_area_fraction: 0.1,
            max_area_fraction: 0.98,
            min_aspect_ratio: 0.25,
            min_confidence: 0.5,
            max_contours: 512,
            tie_tolerance: 0.02,
            target_aspect: 1.4,
            hough_vote_threshold: 60,
            hough_suppression_radius: 8,
            hough_min_corner_degrees: 20.0,
        }
    }
}

/// Perspective extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Longest side of the extracted page; larger outputs are scaled down.
    pub max_output_dimension: u32,
    /// Binarize the extracted page with an adaptive threshold.
    pub post_process: bool,
    pub block_radius: u32,
    pub threshold_offset: i32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_output_dimension: 4096,
            post_process: false,
            block_radius: 15,
            threshold_offset: 10,
        }
    }
}

/// Text-line dewarping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DewarpConfig {
    /// Analysis runs on a copy whose longest side is at most this.
    pub working_max_dimension: u32,
    pub block_radius: u32,
    pub threshold_offset: i32,
    /// Border strips ignored when looking for text.
    pub margin_x: u32,
    pub margin_y: u32,
    /// Width of the horizontal dilation kernel.
    pub dilate_width: u32,
    /// Height of the vertical erosion kernel.
    pub erode_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Maximum bounding-box height / width.
    pub max_aspect: f64,
    /// Maximum contour area as a fraction of the page.
    pub max_area_fraction: f64,
    pub max_contours: usize,
    /// Span linking, in working pixels unless stated.
    pub vertical_tolerance: f64,
    pub max_gap: f64,
    pub max_overlap: f64,
    pub max_angle_degrees: f64,
    pub min_span_width: f64,
    pub sampling_interval: u32,
    /// Degree of each span's baseline polynomial.
    pub span_degree: usize,
    /// Degree of the global horizontal curve.
    pub global_degree: usize,
    pub min_spans: usize,
    /// Largest accepted displacement as a fraction of page height.
    pub max_shift_fraction: f64,
    /// Spacing of the remap control grid in output pixels.
    pub grid_step: u32,
}

impl Default for DewarpConfig {
    fn default() -> Self {
        Self {
            working_max_dimension: 1280,
            block_radius: 27,
            threshold_offset: 20,
            margin_x: 50,
            margin_y: 20,
            dilate_width: 9,
            erode_height: 3,
            min_width: 6,
            min_height: 2,
            max_height: 32,
            max_aspect: 1.25,
            max_area_fraction: 0.05,
            max_contours: 4096,
            vertical_tolerance: 12.0,
            max_gap: 60.0,
            max_overlap: 1.0,
            max_angle_degrees: 7.5,
            min_span_width: 30.0,
            sampling_interval: 20,
            span_degree: 2,
            global_degree: 3,
            min_spans: 2,
            max_shift_fraction: 0.1,
            grid_step: 16,
        }
    }
}

/// What the live preview shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    #[default]
    Raw,
    /// The detector's processed view (edge map).
    Processed,
}

/// Capture session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Size of the preview surface outlines are drawn on.
    pub view_width: u32,
    pub view_height: u32,
    /// Run the dewarp stage after perspective extraction.
    pub dewarp: bool,
    pub preview: PreviewMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            view_width: 1080,
            view_height: 1920,
            dewarp: true,
            preview: PreviewMode::Raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ScanConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tracker.timeout(), Duration::from_secs(3));
        assert_eq!(config.tracker.max_miss_count, 3);
        assert_eq!(config.dewarp.min_spans, 2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ScanConfig::from_json_str(
            r#"{ "tracker": { "timeout_ms": 1500 }, "detector": { "kind": "hough" } }"#,
        )
        .unwrap();
        assert_eq!(config.tracker.timeout_ms, 1500);
        assert_eq!(config.tracker.max_miss_count, 3);
        assert_eq!(config.detector.kind, DetectorKind::Hough);
        assert_eq!(config.dewarp, DewarpConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ScanConfig::from_json_str(r#"{ "dewarp": { "min_spans": 1 } }"#).unwrap_err();
        assert!(matches!(err, FolioError::Config(_)));
        let err = ScanConfig::from_json_str(r#"{ "tracker": { "timeout_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, FolioError::Config(_)));
        let err = ScanConfig::from_json_str(r#"{ "detector": { "hough_min_corner_degrees": 95.0 } }"#).unwrap_err();
        assert!(matches!(err, FolioError::Config(_)));
    }

    #[test]
    fn load_reads_file_and_round_trips() {
        let mut config = ScanConfig::default();
        config.session.dewarp = false;
        config.session.preview = PreviewMode::Processed;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json_pretty().unwrap().as_bytes()).unwrap();

        let loaded = ScanConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = ScanConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, FolioError::Serialization(_)));
    }
}
