// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-capture: live capture orchestration for Folio.
//
// A `CaptureSession` pulls frames from a `FrameSource`, runs detection on the
// blocking pool, debounces outlines through the `OutlineTracker`, and hands
// the committed page to a `CaptureDelegate`. Camera bridges plug in through
// `FrameSource`; desktop builds use the replay and unavailable sources.

pub mod gate;
pub mod session;
pub mod stub;
pub mod tracker;
pub mod traits;

pub use gate::{CaptureGate, Delivery, FrameSink, FrameStream, frame_channel};
pub use session::{CaptureSession, SessionCanceller, SessionHandle, SessionOutcome};
pub use stub::{ReplaySource, UnavailableSource};
pub use tracker::{CommitTimer, OutlineTracker, TrackedOutline, TrackerEvent, TrackerSink, TrackerState};
pub use traits::{CaptureDelegate, CapturedPage, FrameSource, RenderSurface};
