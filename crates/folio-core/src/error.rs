// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.
//
// A missing detection on a frame is not an error and never appears here:
// detectors return `None` for that case.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Geometry --
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    // -- Per-frame / per-page processing (recoverable) --
    #[error("perspective extraction failed: {0}")]
    Extraction(String),

    #[error("not enough text spans to dewarp: found {spans}, need {required}")]
    DewarpDegenerate { spans: usize, required: usize },

    #[error("dewarp model rejected as unstable: {0}")]
    DewarpUnstable(String),

    #[error("image processing failed: {0}")]
    Image(String),

    // -- Session level --
    #[error("frame source unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("capture session closed")]
    SessionClosed,

    // -- Configuration / I/O --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FolioError {
    /// Whether the failure can be absorbed by falling back to a less
    /// processed image instead of aborting the capture.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Extraction(_)
                | Self::DewarpDegenerate { .. }
                | Self::DewarpUnstable(_)
                | Self::Image(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_page_failures_are_recoverable() {
        assert!(FolioError::Extraction("singular".into()).is_recoverable());
        assert!(FolioError::DewarpDegenerate { spans: 0, required: 2 }.is_recoverable());
        assert!(!FolioError::ResourceUnavailable("camera denied".into()).is_recoverable());
        assert!(!FolioError::Cancelled.is_recoverable());
    }

    #[test]
    fn degenerate_message_names_counts() {
        let err = FolioError::DewarpDegenerate { spans: 1, required: 2 };
        assert_eq!(
            err.to_string(),
            "not enough text spans to dewarp: found 1, need 2"
        );
    }
}
