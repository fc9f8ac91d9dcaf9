//! Cooperative-cancellation and deadline primitive.
//!
//! Every long-running engine embeds a [`RunnerState`] and drives its own
//! step function through it: an `Arc<AtomicBool>` cancellation flag plus an
//! optional wall-clock deadline, cloneable so a caller (here, the race
//! coordinator) can hold a [`CancelHandle`] and kill the engine from
//! another thread.
//!
//! Engines also need a `report()` gate so they can emit progress without
//! paying a cost on every loop iteration; that is `RunnerState::report`,
//! guarded by a `parking_lot::Mutex` around the last-report timestamp
//! (engines are otherwise single-threaded, but the mutex lets a
//! `CancelHandle` holder query `killed()`/`finished()` safely from the race
//! coordinator's thread).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Shared cancellation flag, clonable so a race coordinator can kill an
/// engine running on another thread.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Cooperative scheduling state embedded in every engine.
///
/// Engines share the `Runner` capability set by composition rather than
/// inheritance: every engine owns one of these and exposes
/// `run`/`run_for`/`run_until`/`kill`/`finished`/`success` by delegating to
/// it.
pub struct RunnerState {
    cancelled: Arc<AtomicBool>,
    started_at: Instant,
    deadline: Option<Instant>,
    finished: AtomicBool,
    success: AtomicBool,
    report_interval: Duration,
    last_report: Mutex<Instant>,
}

impl RunnerState {
    pub fn new() -> Self {
        let now = Instant::now();
        RunnerState {
            cancelled: Arc::new(AtomicBool::new(false)),
            started_at: now,
            deadline: None,
            finished: AtomicBool::new(false),
            success: AtomicBool::new(false),
            report_interval: Duration::from_millis(500),
            last_report: Mutex::new(now),
        }
    }

    /// Sets a wall-clock deadline `dur` from now. Used by `run_for`.
    pub fn set_deadline(&mut self, dur: Duration) {
        self.deadline = Some(Instant::now() + dur);
    }

    pub fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    pub fn set_report_interval(&mut self, dur: Duration) {
        self.report_interval = dur;
    }

    /// Atomically requests cancellation; observed at the engine's next
    /// suspension point.
    pub fn kill(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn killed(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn timed_out(&self) -> bool {
        match self.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }

    /// True once `killed()` or `timed_out()` holds: an engine's inner loop
    /// should check this (and `finished()`) at every suspension point.
    pub fn should_stop(&self) -> bool {
        self.killed() || self.timed_out() || self.finished()
    }

    /// Called by the engine when it reaches a natural stopping point
    /// (confluent, enumeration complete, closure exhausted, ...).
    pub fn mark_finished(&self, success: bool) {
        self.finished.store(true, Ordering::SeqCst);
        self.success.store(success, Ordering::SeqCst);
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// `finished() && !killed()`: the race coordinator's definition of a
    /// usable winner.
    pub fn success(&self) -> bool {
        self.finished() && self.success.load(Ordering::SeqCst) && !self.killed()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns `true` at most once per `report_interval`; intended to gate
    /// a `tracing::debug!` progress line inside a hot loop.
    pub fn report(&self) -> bool {
        let mut last = self.last_report.lock();
        if last.elapsed() >= self.report_interval {
            *last = Instant::now();
            true
        } else {
            false
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Resets cancellation/finished/success/timing state so the same
    /// `RunnerState` can drive a second `run()` (used after `add_rule`
    /// invalidates a previous completion).
    pub fn reset(&mut self) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.finished.store(false, Ordering::SeqCst);
        self.success.store(false, Ordering::SeqCst);
        self.started_at = Instant::now();
        *self.last_report.lock() = self.started_at;
    }
}

impl Default for RunnerState {
    fn default() -> Self {
        RunnerState::new()
    }
}

/// Capability set exposed by every engine.
pub trait Runner {
    /// Runs to completion, cancellation, or timeout.
    fn run(&mut self) {
        self.run_until(&mut || false);
    }

    /// Runs for at most `dur`, then returns (partial state is still valid).
    fn run_for(&mut self, dur: Duration) {
        self.set_deadline(dur);
        self.run_until(&mut || false);
    }

    /// Runs until `pred` returns `true`, or cancellation/timeout/natural
    /// completion, whichever comes first. `pred` is polled at every
    /// suspension point from the engine's own thread — there is no
    /// preemption.
    fn run_until(&mut self, pred: &mut dyn FnMut() -> bool);

    fn set_deadline(&mut self, dur: Duration);

    fn kill(&self);

    fn finished(&self) -> bool;

    fn success(&self) -> bool;

    fn cancel_handle(&self) -> CancelHandle;
}
