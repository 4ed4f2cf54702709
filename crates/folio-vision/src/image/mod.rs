// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: page I/O, working copies and binarization.

pub mod processor;
pub mod threshold;

pub use processor::{ImageProcessor, gray_working_copy};
pub use threshold::{adaptive_threshold, ink_mask};
