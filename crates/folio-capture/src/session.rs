// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture session: frames in, one processed page out.
//
// The session task is the only writer of tracker state. Detection and page
// processing run on the blocking pool; everything else (tracker updates,
// surface updates, delegate callbacks) happens on the session task.

use std::sync::Arc;

use chrono::Utc;
use folio_core::config::{PreviewMode, ScanConfig};
use folio_core::error::{FolioError, Result};
use folio_core::geometry::{Normalized, QuadOutline, Size};
use folio_core::types::{CancelFlag, CaptureId};
use folio_vision::{Detection, PagePipeline, PageProcessor, QuadrilateralDetector, build_detector};
use image::DynamicImage;
use tokio::sync::watch;
use tokio::task::{JoinHandle, spawn_blocking};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};

use crate::gate::{FrameStream, frame_channel};
use crate::tracker::{OutlineTracker, TrackerEvent, TrackerState};
use crate::traits::{CaptureDelegate, CapturedPage, FrameSource, RenderSurface};

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Captured(CaptureId),
    Cancelled,
    Failed(FolioError),
}

/// Control handle for a spawned session.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: SessionCanceller,
    task: JoinHandle<SessionOutcome>,
}

/// Cancels a session from anywhere, independently of its handle.
#[derive(Debug, Clone)]
pub struct SessionCanceller(Arc<watch::Sender<bool>>);

impl SessionCanceller {
    /// Ask the session to stop. Idempotent; has no effect once the session
    /// has finished.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl SessionHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn canceller(&self) -> SessionCanceller {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    pub async fn join(self) -> Result<SessionOutcome> {
        self.task.await.map_err(|e| {
            error!(error = %e, "Capture session task failed");
            FolioError::SessionClosed
        })
    }
}

/// Resolves once cancellation is requested. Dropping every handle and
/// canceller never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Everything the session task needs besides the frame source.
struct SessionCore {
    config: ScanConfig,
    detector: Arc<dyn QuadrilateralDetector>,
    pipeline: Arc<dyn PageProcessor>,
    surface: Arc<dyn RenderSurface>,
    delegate: Arc<dyn CaptureDelegate>,
}

/// One live-capture cycle: track the page outline, capture when it is
/// stable, process, and report to the delegate.
pub struct CaptureSession<F: FrameSource> {
    core: SessionCore,
    source: F,
}

impl<F: FrameSource + 'static> CaptureSession<F> {
    /// Build a session using the detector named by `config.detector.kind`.
    pub fn new(
        config: ScanConfig,
        source: F,
        surface: Arc<dyn RenderSurface>,
        delegate: Arc<dyn CaptureDelegate>,
    ) -> Self {
        let detector: Arc<dyn QuadrilateralDetector> = Arc::from(build_detector(&config.detector));
        let pipeline: Arc<dyn PageProcessor> = Arc::new(PagePipeline::new(&config));
        Self {
            core: SessionCore {
                config,
                detector,
                pipeline,
                surface,
                delegate,
            },
            source,
        }
    }

    /// Replace the configured detector, e.g. with an `ExternalDetector`.
    pub fn with_detector(mut self, detector: Arc<dyn QuadrilateralDetector>) -> Self {
        self.core.detector = detector;
        self
    }

    /// Replace the capture-time page processing.
    pub fn with_processor(mut self, processor: Arc<dyn PageProcessor>) -> Self {
        self.core.pipeline = processor;
        self
    }

    /// Run the session on the current tokio runtime.
    pub fn spawn(self) -> SessionHandle {
        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(run(self.core, self.source, cancel_rx));
        SessionHandle {
            cancel: SessionCanceller(Arc::new(cancel)),
            task,
        }
    }
}

#[instrument(skip_all, fields(detector = core.detector.name()))]
async fn run<F: FrameSource>(core: SessionCore, mut source: F, mut cancel: watch::Receiver<bool>) -> SessionOutcome {
    let (sink, mut stream) = frame_channel();
    if let Err(e) = source.start(sink) {
        return core.fail(e);
    }
    info!(
        timeout_ms = core.config.tracker.timeout_ms,
        dewarp = core.config.session.dewarp,
        "Capture session started"
    );

    let mut tracker = OutlineTracker::new(core.config.tracker.clone(), Vec::new());
    let outcome = 'session: loop {
        let deadline = tracker.deadline();
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracker.reset();
                core.surface.set_outline(QuadOutline::zero());
                break 'session core.cancelled();
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracker.poll(Instant::now());
            }
            Some(error) = stream.errors.recv() => break 'session core.fail(error),
            frame = stream.frames.recv() => match frame {
                Some(frame) => {
                    let detection = core.detect(frame).await;
                    tracker.observe(detection.map(|d| d.outline), Instant::now());
                    core.show_outline(tracker.state());
                }
                None => break 'session core.fail(stream.stop_reason("frame source stopped")),
            },
        }

        for event in std::mem::take(tracker.sink_mut()) {
            match event {
                TrackerEvent::Commit(outline) => {
                    core.surface.set_outline(QuadOutline::zero());
                    break 'session core.capture(outline, &mut stream, &mut cancel).await;
                }
                TrackerEvent::Reset => core.surface.set_outline(QuadOutline::zero()),
            }
        }
    };

    source.stop();
    outcome
}

impl SessionCore {
    /// Detect on the blocking pool and update the preview image.
    async fn detect(&self, frame: DynamicImage) -> Option<Detection> {
        let detector = Arc::clone(&self.detector);
        let processed_preview = self.config.session.preview == PreviewMode::Processed;
        let job = spawn_blocking(move || {
            let detection = detector.detect(&frame);
            let preview = if processed_preview {
                detector.preprocess(&frame).map(DynamicImage::ImageLuma8)
            } else {
                None
            };
            (frame, detection, preview)
        });

        match job.await {
            Ok((frame, detection, preview)) => {
                self.surface.set_image(preview.as_ref().unwrap_or(&frame));
                detection
            }
            Err(e) => {
                warn!(error = %e, "Detection task failed, treating frame as a miss");
                None
            }
        }
    }

    fn show_outline(&self, state: &TrackerState) {
        let outline = match state {
            TrackerState::Tracking(tracked) => tracked
                .outline
                .denormalize(Size::from_dimensions(self.config.session.view_width, self.config.session.view_height)),
            TrackerState::Idle => QuadOutline::zero(),
        };
        self.surface.set_outline(outline);
    }

    /// Grab the next full frame and turn it into a page.
    async fn capture(
        &self,
        outline: QuadOutline<Normalized>,
        stream: &mut FrameStream,
        cancel: &mut watch::Receiver<bool>,
    ) -> SessionOutcome {
        let mut requested = stream.gate.request();
        let frame = loop {
            tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    stream.gate.cancel();
                    return self.cancelled();
                }
                frame = &mut requested => match frame {
                    Ok(frame) => break frame,
                    Err(_) => return self.fail(FolioError::SessionClosed),
                },
                Some(error) = stream.errors.recv() => {
                    stream.gate.cancel();
                    return self.fail(error);
                }
                queued = stream.frames.recv() => {
                    // Frames queued before the request are stale previews.
                    if queued.is_none() {
                        return self.fail(stream.stop_reason("frame source stopped before capture"));
                    }
                }
            }
        };

        let outline_px = outline.denormalize(Size::from_dimensions(frame.width(), frame.height()));
        debug!(width = frame.width(), height = frame.height(), "Frame captured for processing");

        let flag = CancelFlag::new();
        let mut job = {
            let pipeline = Arc::clone(&self.pipeline);
            let flag = flag.clone();
            spawn_blocking(move || pipeline.process(&frame, &outline_px, &flag))
        };
        let processed = tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                flag.cancel();
                let _ = job.await;
                return self.cancelled();
            }
            result = &mut job => result,
        };

        match processed {
            Ok(Ok(page)) => {
                let id = CaptureId::new();
                info!(%id, extracted = page.extracted, dewarped = page.dewarped, "Page captured");
                self.delegate.on_page_captured(CapturedPage {
                    id,
                    captured_at: Utc::now(),
                    outline: outline_px,
                    image: page.image,
                    extracted: page.extracted,
                    dewarped: page.dewarped,
                });
                SessionOutcome::Captured(id)
            }
            Ok(Err(FolioError::Cancelled)) => self.cancelled(),
            Ok(Err(e)) => self.fail(e),
            Err(e) => self.fail(FolioError::Image(format!("page processing task failed: {e}"))),
        }
    }

    fn cancelled(&self) -> SessionOutcome {
        info!("Capture session cancelled");
        self.delegate.on_cancelled();
        SessionOutcome::Cancelled
    }

    fn fail(&self, error: FolioError) -> SessionOutcome {
        error!(error = %error, "Capture session failed");
        self.delegate.on_error(&error);
        SessionOutcome::Failed(error)
    }
}
