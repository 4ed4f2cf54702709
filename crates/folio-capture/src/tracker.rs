// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outline stability tracker: debounce per-frame detections into a single
// commit once an outline has been held for the configured time.
//
// The tracker is a plain state machine driven with explicit timestamps. It
// owns its commit deadline; the session awaits `deadline()` and calls
// `poll`, so disarming and firing always happen on the same task.

use folio_core::config::TrackerConfig;
use folio_core::geometry::{Normalized, QuadOutline};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

/// What the tracker tells its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerEvent {
    /// The outline was held long enough; capture it.
    Commit(QuadOutline<Normalized>),
    /// Tracking was abandoned.
    Reset,
}

/// Receives tracker events.
pub trait TrackerSink {
    fn emit(&mut self, event: TrackerEvent);
}

impl TrackerSink for Vec<TrackerEvent> {
    fn emit(&mut self, event: TrackerEvent) {
        self.push(event);
    }
}

impl TrackerSink for mpsc::UnboundedSender<TrackerEvent> {
    fn emit(&mut self, event: TrackerEvent) {
        // A closed receiver means nobody is listening any more.
        let _ = self.send(event);
    }
}

/// The outline currently being held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedOutline {
    pub outline: QuadOutline<Normalized>,
    pub consecutive_miss_count: u32,
    /// When tracking began.
    pub pending_since: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Tracking(TrackedOutline),
}

/// An absolute, disarmable deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitTimer {
    deadline: Option<Instant>,
}

impl CommitTimer {
    pub fn arm(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    /// Disarm. Returns whether the timer was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

/// Debounces detections into commit and reset events delivered to `K`.
#[derive(Debug)]
pub struct OutlineTracker<K: TrackerSink> {
    config: TrackerConfig,
    state: TrackerState,
    timer: CommitTimer,
    sink: K,
}

impl<K: TrackerSink> OutlineTracker<K> {
    pub fn new(config: TrackerConfig, sink: K) -> Self {
        Self {
            config,
            state: TrackerState::Idle,
            timer: CommitTimer::default(),
            sink,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking(_))
    }

    /// When the pending commit fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Feed one frame's detection. `None`, the zero outline, and degenerate
    /// outlines all count as a miss.
    pub fn observe(&mut self, outline: Option<QuadOutline<Normalized>>, now: Instant) {
        // A commit that is already due belongs to the previous episode.
        self.poll(now);

        let valid = outline.filter(|o| !o.is_zero() && o.is_valid());
        let mut give_up = false;
        if let TrackerState::Tracking(tracked) = &mut self.state {
            match valid {
                Some(outline) => {
                    tracked.outline = outline;
                    tracked.consecutive_miss_count = 0;
                }
                None => {
                    tracked.consecutive_miss_count += 1;
                    give_up = tracked.consecutive_miss_count > self.config.max_miss_count;
                    debug!(misses = tracked.consecutive_miss_count, "Outline missed");
                }
            }
        } else if let Some(outline) = valid {
            self.state = TrackerState::Tracking(TrackedOutline {
                outline,
                consecutive_miss_count: 0,
                pending_since: now,
            });
            self.timer.arm(now + self.config.timeout());
            debug!(timeout_ms = self.config.timeout_ms, "Outline acquired, commit armed");
        }
        if give_up {
            self.reset();
        }
    }

    /// Fire the commit if its deadline has passed. Returns whether it fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.timer.expired(now) {
            return false;
        }
        self.timer.cancel();
        match std::mem::take(&mut self.state) {
            TrackerState::Tracking(tracked) => {
                info!(
                    held_ms = now.duration_since(tracked.pending_since).as_millis() as u64,
                    "Outline stable, committing"
                );
                self.sink.emit(TrackerEvent::Commit(tracked.outline));
                true
            }
            TrackerState::Idle => false,
        }
    }

    /// Abandon any track. Emits `Reset` only if a track was active.
    pub fn reset(&mut self) {
        self.timer.cancel();
        if let TrackerState::Tracking(_) = std::mem::take(&mut self.state) {
            debug!("Tracker reset");
            self.sink.emit(TrackerEvent::Reset);
        }
    }
}
