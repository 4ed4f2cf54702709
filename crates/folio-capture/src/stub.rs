// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in frame sources for platforms without a camera bridge.

use std::sync::Arc;
use std::time::Duration;

use folio_core::error::{FolioError, Result};
use image::DynamicImage;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::gate::{Delivery, FrameSink};
use crate::traits::FrameSource;

/// A source that is never available. Used where no camera bridge exists.
#[derive(Debug, Clone, Default)]
pub struct UnavailableSource {
    reason: Option<String>,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

impl FrameSource for UnavailableSource {
    fn start(&mut self, _sink: FrameSink) -> Result<()> {
        Err(FolioError::ResourceUnavailable(
            self.reason
                .clone()
                .unwrap_or_else(|| "no camera is available on this platform".into()),
        ))
    }

    fn stop(&mut self) {}
}

/// Replays still images at a fixed cadence on the tokio runtime.
#[derive(Debug)]
pub struct ReplaySource {
    frames: Arc<Vec<DynamicImage>>,
    period: Duration,
    looping: bool,
    task: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(frames: Vec<DynamicImage>, period: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            period,
            looping: false,
            task: None,
        }
    }

    /// Start over from the first frame after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl FrameSource for ReplaySource {
    fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.frames.is_empty() {
            return Err(FolioError::ResourceUnavailable("no frames to replay".into()));
        }
        let runtime = Handle::try_current()
            .map_err(|e| FolioError::ResourceUnavailable(format!("replay needs a tokio runtime: {e}")))?;
        self.stop();

        let frames = Arc::clone(&self.frames);
        let (period, looping) = (self.period.max(Duration::from_millis(1)), self.looping);
        info!(frames = frames.len(), period_ms = period.as_millis() as u64, looping, "Replay started");

        self.task = Some(runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                for frame in frames.iter() {
                    ticker.tick().await;
                    if sink.deliver(frame.clone()) == Delivery::Closed {
                        debug!("Session gone, replay finished");
                        return;
                    }
                }
                if !looping {
                    debug!("Replay exhausted");
                    return;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::frame_channel;
    use image::GrayImage;

    fn frame(w: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::new(w, 1))
    }

    #[test]
    fn unavailable_source_reports_resource_error() {
        let (sink, _stream) = frame_channel();
        let err = UnavailableSource::default().start(sink).unwrap_err();
        assert!(matches!(err, FolioError::ResourceUnavailable(_)));
    }

    #[test]
    fn replay_without_runtime_is_unavailable() {
        let (sink, _stream) = frame_channel();
        let mut source = ReplaySource::new(vec![frame(1)], Duration::from_millis(10));
        assert!(matches!(source.start(sink), Err(FolioError::ResourceUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn replay_delivers_in_order_then_closes() {
        let (sink, mut stream) = frame_channel();
        let mut source = ReplaySource::new(vec![frame(1), frame(2), frame(3)], Duration::from_millis(100));
        source.start(sink).unwrap();

        let mut widths = Vec::new();
        while let Some(f) = stream.frames.recv().await {
            widths.push(f.width());
        }
        assert_eq!(widths, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn looping_replay_wraps_until_stopped() {
        let (sink, mut stream) = frame_channel();
        let mut source = ReplaySource::new(vec![frame(1), frame(2)], Duration::from_millis(50)).looping(true);
        source.start(sink).unwrap();

        let mut widths = Vec::new();
        for _ in 0..5 {
            widths.push(stream.frames.recv().await.unwrap().width());
        }
        assert_eq!(widths, vec![1, 2, 1, 2, 1]);

        source.stop();
        while stream.frames.recv().await.is_some() {}
    }
}
