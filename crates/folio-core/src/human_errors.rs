// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language error messages for the capture front end.
//
// Every technical error is mapped to a short message and a concrete
// suggestion. Severity drives how the front end presents it.

use crate::error::FolioError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The page was still captured, just less processed than hoped.
    Degraded,
    /// The user must do something (grant camera access, fix a file).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with a message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    /// Whether scanning again is likely to succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `FolioError` into something a person holding a phone can act on.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::InvalidGeometry(_) => HumanError {
            message: "The page outline didn't make sense.".into(),
            suggestion: "Hold the camera steady with the whole page in view and try again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        FolioError::Extraction(_) => HumanError {
            message: "The page couldn't be straightened.".into(),
            suggestion: "The full camera picture was kept instead. Try scanning from directly above the page.".into(),
            retriable: true,
            severity: Severity::Degraded,
        },

        FolioError::DewarpDegenerate { .. } => HumanError {
            message: "Not enough lines of text to flatten the page.".into(),
            suggestion: "The page was kept as photographed. Curved-page correction needs at least a few lines of text.".into(),
            retriable: false,
            severity: Severity::Degraded,
        },

        FolioError::DewarpUnstable(_) => HumanError {
            message: "The page curve couldn't be measured reliably.".into(),
            suggestion: "The page was kept as photographed. Press the page flatter or improve the lighting and try again.".into(),
            retriable: true,
            severity: Severity::Degraded,
        },

        FolioError::Image(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::ResourceUnavailable(detail) => {
            if detail.to_ascii_lowercase().contains("permission") {
                HumanError {
                    message: "The camera isn't allowed for this app.".into(),
                    suggestion: "Allow camera access in your device settings, then try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "The camera isn't available.".into(),
                    suggestion: "Close other apps that may be using the camera, then try again.".into(),
                    retriable: true,
                    severity: Severity::ActionRequired,
                }
            }
        }

        FolioError::Cancelled | FolioError::SessionClosed => HumanError {
            message: "Scanning was stopped.".into(),
            suggestion: "Start a new scan when you're ready.".into(),
            retriable: true,
            severity: Severity::Permanent,
        },

        FolioError::Config(detail) => HumanError {
            message: "The scan settings are not valid.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or pick a different location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                retriable: true,
                severity: Severity::Permanent,
            },
        },

        FolioError::Serialization(_) => HumanError {
            message: "A settings file couldn't be read.".into(),
            suggestion: "Check that the file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dewarp_fallback_is_degraded() {
        let human = humanize_error(&FolioError::DewarpDegenerate { spans: 0, required: 2 });
        assert_eq!(human.severity, Severity::Degraded);
        assert!(!human.retriable);
    }

    #[test]
    fn camera_permission_needs_action() {
        let err = FolioError::ResourceUnavailable("camera permission denied".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn missing_file_needs_action() {
        let err = FolioError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn config_detail_is_surfaced() {
        let human = humanize_error(&FolioError::Config("tracker.timeout_ms must be > 0".into()));
        assert!(human.suggestion.contains("timeout_ms"));
    }
}
