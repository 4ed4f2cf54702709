// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio: core geometry, configuration and error types shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod human_errors;
pub mod types;

pub use config::ScanConfig;
pub use error::{FolioError, Result};
pub use geometry::{Normalized, Pixel, Point, QuadOutline, Size};
pub use types::*;
