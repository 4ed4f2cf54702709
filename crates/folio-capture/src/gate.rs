// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame plumbing between a frame source and the capture session.
//
// Preview frames travel over a capacity-one channel: while one frame is in
// flight, newer frames are dropped rather than queued. A capture request is
// a one-shot slot that the next delivered frame fills.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use folio_core::error::FolioError;
use image::DynamicImage;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Holds at most one pending request for a full-resolution frame.
#[derive(Debug, Default)]
pub struct CaptureGate {
    pending: Mutex<Option<oneshot::Sender<DynamicImage>>>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<DynamicImage>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask for the next delivered frame. A request still pending is replaced
    /// and its receiver sees the channel closed.
    pub fn request(&self) -> oneshot::Receiver<DynamicImage> {
        let (tx, rx) = oneshot::channel();
        *self.slot() = Some(tx);
        rx
    }

    /// Hand `frame` to the pending request, if any. The frame comes back in
    /// `Err` when nobody is waiting for it.
    pub fn resolve(&self, frame: DynamicImage) -> Result<(), DynamicImage> {
        let waiting = self.slot().take();
        match waiting {
            Some(tx) => tx.send(frame),
            None => Err(frame),
        }
    }

    /// Drop a pending request. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        self.slot().take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }
}

/// What happened to a delivered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Fulfilled a pending capture request.
    Captured,
    /// Queued for preview and detection.
    Queued,
    /// A previous frame is still in flight.
    Dropped,
    /// The session has gone away; the source should stop.
    Closed,
}

/// The frame source's end of the channel.
#[derive(Debug, Clone)]
pub struct FrameSink {
    frames: mpsc::Sender<DynamicImage>,
    errors: mpsc::UnboundedSender<FolioError>,
    gate: Arc<CaptureGate>,
}

impl FrameSink {
    pub fn deliver(&self, frame: DynamicImage) -> Delivery {
        let frame = match self.gate.resolve(frame) {
            Ok(()) => return Delivery::Captured,
            Err(frame) => frame,
        };
        match self.frames.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!("Preview busy, frame dropped");
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Report a failure of the source itself. Returns `false` when the
    /// session is already gone and the error went nowhere.
    pub fn fail(&self, error: FolioError) -> bool {
        match self.errors.send(error) {
            Ok(()) => true,
            Err(mpsc::error::SendError(error)) => {
                debug!(error = %error, "Session gone, source failure not delivered");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }
}

/// The session's end of the channel.
#[derive(Debug)]
pub struct FrameStream {
    pub frames: mpsc::Receiver<DynamicImage>,
    pub errors: mpsc::UnboundedReceiver<FolioError>,
    pub gate: Arc<CaptureGate>,
}

impl FrameStream {
    /// Why the frames ran out: the failure the source reported before
    /// hanging up, or `ResourceUnavailable(fallback)` if it reported none.
    pub fn stop_reason(&mut self, fallback: &str) -> FolioError {
        self.errors
            .try_recv()
            .unwrap_or_else(|_| FolioError::ResourceUnavailable(fallback.into()))
    }
}

pub fn frame_channel() -> (FrameSink, FrameStream) {
    let (frames_tx, frames) = mpsc::channel(1);
    let (errors_tx, errors) = mpsc::unbounded_channel();
    let gate = Arc::new(CaptureGate::new());
    (
        FrameSink {
            frames: frames_tx,
            errors: errors_tx,
            gate: Arc::clone(&gate),
        },
        FrameStream { frames, errors, gate },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn frame(tag: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::new(tag, 1))
    }

    #[test]
    fn second_frame_is_dropped_while_first_in_flight() {
        let (sink, mut stream) = frame_channel();
        assert_eq!(sink.deliver(frame(1)), Delivery::Queued);
        assert_eq!(sink.deliver(frame(2)), Delivery::Dropped);
        assert_eq!(stream.frames.try_recv().unwrap().width(), 1);
        assert_eq!(sink.deliver(frame(3)), Delivery::Queued);
    }

    #[test]
    fn capture_request_resolves_exactly_once() {
        let (sink, stream) = frame_channel();
        let mut rx = stream.gate.request();
        assert!(stream.gate.is_pending());
        assert_eq!(sink.deliver(frame(7)), Delivery::Captured);
        assert_eq!(sink.deliver(frame(8)), Delivery::Queued);
        assert_eq!(rx.try_recv().unwrap().width(), 7);
        assert!(!stream.gate.is_pending());
    }

    #[test]
    fn abandoned_request_lets_frame_through() {
        let (sink, mut stream) = frame_channel();
        drop(stream.gate.request());
        assert_eq!(sink.deliver(frame(4)), Delivery::Queued);
        assert_eq!(stream.frames.try_recv().unwrap().width(), 4);
    }

    #[test]
    fn cancel_is_idempotent() {
        let gate = CaptureGate::new();
        let _rx = gate.request();
        assert!(gate.cancel());
        assert!(!gate.cancel());
        assert!(gate.resolve(frame(1)).is_err());
    }

    #[test]
    fn closed_session_is_reported() {
        let (sink, stream) = frame_channel();
        drop(stream);
        assert_eq!(sink.deliver(frame(1)), Delivery::Closed);
        assert!(sink.is_closed());
    }

    #[test]
    fn reported_failure_explains_the_hang_up() {
        let (sink, mut stream) = frame_channel();
        sink.fail(FolioError::ResourceUnavailable("lens cap".into()));
        drop(sink);
        assert!(stream.frames.try_recv().is_err());
        assert!(matches!(stream.stop_reason("stopped"), FolioError::ResourceUnavailable(m) if m == "lens cap"));
        assert!(matches!(stream.stop_reason("stopped"), FolioError::ResourceUnavailable(m) if m == "stopped"));
    }

    #[test]
    fn failures_reach_the_session() {
        let (sink, mut stream) = frame_channel();
        assert!(sink.fail(FolioError::ResourceUnavailable("camera unplugged".into())));
        assert!(matches!(stream.errors.try_recv(), Ok(FolioError::ResourceUnavailable(_))));

        drop(stream);
        assert!(!sink.fail(FolioError::ResourceUnavailable("camera unplugged".into())));
    }
}
