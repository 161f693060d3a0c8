//! # Playback Controller
//! Transport state machine over the frame sequence: Idle until frames are
//! loaded, then Paused/Playing with clamped step/seek and a timer-driven
//! auto-advance that stops (never loops) at the last frame.
//!
//! The timer is an injected [`Scheduler`] capability, so the transition
//! logic is runtime-agnostic and tests drive ticks by hand.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

/// Auto-advance period (one frame per tick).
pub const FRAME_DURATION: Duration = Duration::from_millis(500);

/// Cancellation handle for a scheduled tick stream. Dropping the handle
/// must also stop the ticks; a timer that keeps firing after its handle is
/// gone is a defect.
pub trait TickHandle: Send {
    fn cancel(&mut self);
}

/// "Run `tick` every `period` until cancelled or until it returns `false`."
///
/// `every` must only arm the timer, never invoke `tick` synchronously —
/// the controller registers the callback while holding its own state lock.
pub trait Scheduler: Send + Sync {
    fn every(
        &self,
        period: Duration,
        tick: Box<dyn FnMut() -> bool + Send>,
    ) -> Box<dyn TickHandle>;
}

/// Tokio-backed production scheduler.
pub struct TokioScheduler;

struct TokioTickHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        self.handle.abort();
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Scheduler for TokioScheduler {
    fn every(
        &self,
        period: Duration,
        mut tick: Box<dyn FnMut() -> bool + Send>,
    ) -> Box<dyn TickHandle> {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval fires immediately; swallow that first tick so the
            // initial frame gets a full period on screen.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !tick() {
                    break;
                }
            }
        });
        Box::new(TokioTickHandle { handle })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No frames loaded; transport operations are no-ops.
    Idle,
    Paused,
    Playing,
}

/// Outcome of a transport operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportResult {
    Moved,
    AtStart,
    AtEnd,
    Idle,
}

/// Read surface exposed alongside every transport operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub frame_index: usize,
    pub frame_count: usize,
    pub current_date: Option<NaiveDate>,
    pub playing: bool,
}

pub struct PlaybackController {
    inner: Arc<Mutex<Inner>>,
    scheduler: Arc<dyn Scheduler>,
    period: Duration,
}

struct Inner {
    dates: Vec<NaiveDate>,
    frame_index: usize,
    playing: bool,
    timer: Option<Box<dyn TickHandle>>,
}

impl Inner {
    fn cancel_timer(&mut self) {
        if let Some(mut t) = self.timer.take() {
            t.cancel();
        }
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            frame_index: self.frame_index,
            frame_count: self.dates.len(),
            current_date: self.dates.get(self.frame_index).copied(),
            playing: self.playing,
        }
    }
}

impl PlaybackController {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_period(scheduler, FRAME_DURATION)
    }

    pub fn with_period(scheduler: Arc<dyn Scheduler>, period: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                dates: Vec::new(),
                frame_index: 0,
                playing: false,
                timer: None,
            })),
            scheduler,
            period,
        }
    }

    /// Hand the controller a (fully built) frame sequence. Non-empty input
    /// moves Idle -> Paused at index 0; empty input returns to Idle and
    /// cancels any running timer.
    pub fn load(&self, dates: Vec<NaiveDate>) {
        let mut g = self.lock();
        g.cancel_timer();
        g.playing = false;
        g.frame_index = 0;
        g.dates = dates;
    }

    pub fn phase(&self) -> PlaybackPhase {
        let g = self.lock();
        if g.dates.is_empty() {
            PlaybackPhase::Idle
        } else if g.playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Paused
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.lock().snapshot()
    }

    /// Advance one frame; clamped no-op at the last frame.
    pub fn step_forward(&self) -> TransportResult {
        let mut g = self.lock();
        if g.dates.is_empty() {
            return TransportResult::Idle;
        }
        if g.frame_index + 1 >= g.dates.len() {
            return TransportResult::AtEnd;
        }
        g.frame_index += 1;
        TransportResult::Moved
    }

    /// Retreat one frame; clamped no-op at the first frame.
    pub fn step_back(&self) -> TransportResult {
        let mut g = self.lock();
        if g.dates.is_empty() {
            return TransportResult::Idle;
        }
        if g.frame_index == 0 {
            return TransportResult::AtStart;
        }
        g.frame_index -= 1;
        TransportResult::Moved
    }

    /// Jump to `index`, clamped into `[0, frame_count - 1]`. Accepts any
    /// integer; out-of-range input is never an error.
    pub fn seek(&self, index: i64) -> PlaybackSnapshot {
        let mut g = self.lock();
        if !g.dates.is_empty() {
            let max = (g.dates.len() - 1) as i64;
            g.frame_index = index.clamp(0, max) as usize;
        }
        g.snapshot()
    }

    /// Flip play/pause. Entering Playing starts the tick timer; leaving it
    /// (or hitting the last frame while playing) cancels the timer.
    pub fn toggle_play(&self) -> PlaybackSnapshot {
        let mut g = self.lock();
        if g.dates.is_empty() {
            return g.snapshot();
        }

        if g.playing {
            g.playing = false;
            g.cancel_timer();
            return g.snapshot();
        }

        g.playing = true;
        let inner = Arc::clone(&self.inner);
        let handle = self.scheduler.every(
            self.period,
            Box::new(move || {
                let mut g = inner.lock().expect("playback mutex poisoned");
                if !g.playing {
                    return false;
                }
                if g.frame_index + 1 < g.dates.len() {
                    g.frame_index += 1;
                    true
                } else {
                    // Auto-stop: clamp at the last frame, drop to Paused.
                    g.playing = false;
                    g.timer = None;
                    false
                }
            }),
        );
        g.timer = Some(handle);
        g.snapshot()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("playback mutex poisoned")
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Ok(mut g) = self.inner.lock() {
            g.cancel_timer();
        }
    }
}
