// tests/playback_autoplay.rs
//
// Drives the controller's auto-advance with a hand-cranked scheduler so the
// timing semantics are fully deterministic: no sleeps, no real clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use outbreak_globe::playback::{
    PlaybackController, PlaybackPhase, Scheduler, TickHandle,
};

type Tick = Box<dyn FnMut() -> bool + Send>;

/// Stores the armed callback; `fire()` plays one tick by hand.
#[derive(Clone, Default)]
struct ManualScheduler {
    slot: Arc<Mutex<Option<Tick>>>,
    cancelled: Arc<AtomicBool>,
}

impl ManualScheduler {
    fn new() -> Self {
        Self::default()
    }

    /// Invoke the armed callback once, honouring its stop signal.
    fn fire(&self) {
        let mut slot = self.slot.lock().unwrap();
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if let Some(tick) = slot.as_mut() {
            if !tick() {
                *slot = None;
            }
        }
    }

    fn armed(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && self.slot.lock().unwrap().is_some()
    }
}

struct ManualHandle {
    cancelled: Arc<AtomicBool>,
}

impl TickHandle for ManualHandle {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, _period: Duration, tick: Tick) -> Box<dyn TickHandle> {
        self.cancelled.store(false, Ordering::SeqCst);
        *self.slot.lock().unwrap() = Some(tick);
        Box::new(ManualHandle {
            cancelled: Arc::clone(&self.cancelled),
        })
    }
}

fn dates(n: usize) -> Vec<NaiveDate> {
    (0..n)
        .map(|i| {
            NaiveDate::from_ymd_opt(2020, 3, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(i as u64))
                .unwrap()
        })
        .collect()
}

#[test]
fn autoplay_advances_then_stops_at_the_last_frame() {
    let scheduler = ManualScheduler::new();
    let controller = PlaybackController::new(Arc::new(scheduler.clone()));
    controller.load(dates(3));

    let snap = controller.toggle_play();
    assert!(snap.playing);
    assert_eq!(controller.phase(), PlaybackPhase::Playing);

    // Two ticks walk 0 -> 1 -> 2, still playing.
    scheduler.fire();
    scheduler.fire();
    let snap = controller.snapshot();
    assert_eq!(snap.frame_index, 2);
    assert!(snap.playing);

    // The tick at the end clamps and auto-pauses; no loop back to 0.
    scheduler.fire();
    let snap = controller.snapshot();
    assert_eq!(snap.frame_index, 2);
    assert!(!snap.playing);
    assert_eq!(controller.phase(), PlaybackPhase::Paused);

    // A stray late tick is inert.
    scheduler.fire();
    assert_eq!(controller.snapshot().frame_index, 2);
}

#[test]
fn pausing_cancels_the_timer() {
    let scheduler = ManualScheduler::new();
    let controller = PlaybackController::new(Arc::new(scheduler.clone()));
    controller.load(dates(5));

    controller.toggle_play();
    assert!(scheduler.armed());
    scheduler.fire();
    assert_eq!(controller.snapshot().frame_index, 1);

    controller.toggle_play();
    assert!(!scheduler.armed(), "pause must cancel the timer");
    scheduler.fire();
    assert_eq!(controller.snapshot().frame_index, 1);
}

#[test]
fn loading_an_empty_sequence_cancels_playback() {
    let scheduler = ManualScheduler::new();
    let controller = PlaybackController::new(Arc::new(scheduler.clone()));
    controller.load(dates(3));
    controller.toggle_play();
    assert!(scheduler.armed());

    controller.load(Vec::new());
    assert_eq!(controller.phase(), PlaybackPhase::Idle);
    assert!(!scheduler.armed(), "empty sequence must cancel the timer");
}

#[test]
fn dropping_the_controller_cancels_the_timer() {
    let scheduler = ManualScheduler::new();
    {
        let controller = PlaybackController::new(Arc::new(scheduler.clone()));
        controller.load(dates(3));
        controller.toggle_play();
        assert!(scheduler.armed());
    }
    assert!(!scheduler.armed(), "teardown must not leak the timer");
}

#[test]
fn manual_stepping_while_playing_keeps_state_consistent() {
    let scheduler = ManualScheduler::new();
    let controller = PlaybackController::new(Arc::new(scheduler.clone()));
    controller.load(dates(4));

    controller.toggle_play();
    scheduler.fire(); // 1
    controller.seek(3);
    // Next tick finds the end and auto-pauses.
    scheduler.fire();
    let snap = controller.snapshot();
    assert_eq!(snap.frame_index, 3);
    assert!(!snap.playing);
}
