//! Race coordinator.
//!
//! Spawns one OS thread per competing [`Runner`], each racing to decide the
//! same problem; the first to report `success()` wins, and every other
//! runner is killed under the same mutex that records the winner, so two
//! engines can never simultaneously declare victory: winner-slot assignment
//! is guarded by a mutex. A single runner skips threading entirely and just
//! runs in place.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::error::{CongruenceError, Result};
use crate::runner::Runner;

/// A named, boxed competitor. The name lets a caller tell which concrete
/// engine type won after [`Race::run`] returns it.
struct Entry {
    label: &'static str,
    runner: Box<dyn Runner + Send>,
}

/// Guarded by `Race`'s internal mutex: which entry (if any) has won, once
/// decided.
struct WinnerSlot {
    winner_index: Option<usize>,
}

pub struct Race {
    entries: Vec<Entry>,
    winner: Arc<Mutex<WinnerSlot>>,
    max_threads: usize,
}

impl Race {
    pub fn new() -> Self {
        Race {
            entries: Vec::new(),
            winner: Arc::new(Mutex::new(WinnerSlot { winner_index: None })),
            max_threads: num_cpus::get(),
        }
    }

    pub fn add_runner(&mut self, label: &'static str, runner: Box<dyn Runner + Send>) {
        self.entries.push(Entry { label, runner });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Caps the number of OS threads [`Race::run`] spawns (default:
    /// hardware concurrency via `num_cpus`). Setting this to `1` forces the
    /// sequential fast path even with several competitors.
    pub fn set_max_threads(&mut self, max_threads: usize) {
        self.max_threads = max_threads;
    }

    /// Runs every competitor to completion (or cancellation) and returns
    /// the winning entry's index, consuming `self`.
    ///
    /// A single competitor, or `max_threads <= 1`, takes the sequential
    /// fast path — try each runner in turn, taking the first
    /// already-`success()` or the first whose own `run()` succeeds, with no
    /// threads spawned at all. Otherwise each competitor runs on its own
    /// thread and the first to reach `success()` kills the rest.
    pub fn run(mut self) -> Result<(usize, &'static str, Box<dyn Runner + Send>)> {
        if self.entries.is_empty() {
            return Err(CongruenceError::NoRunners);
        }
        if self.entries.len() == 1 {
            let mut entry = self.entries.pop().unwrap();
            entry.runner.run();
            return Ok((0, entry.label, entry.runner));
        }
        if self.max_threads <= 1 {
            for (i, entry) in self.entries.iter_mut().enumerate() {
                if !entry.runner.success() {
                    entry.runner.run();
                }
                if entry.runner.success() {
                    let entry = self.entries.remove(i);
                    return Ok((i, entry.label, entry.runner));
                }
            }
            let idx = self
                .entries
                .iter()
                .position(|e| e.runner.finished())
                .ok_or(CongruenceError::Undecidable)?;
            let entry = self.entries.remove(idx);
            return Ok((idx, entry.label, entry.runner));
        }

        let winner = Arc::clone(&self.winner);
        let cancel_handles: Vec<_> = self.entries.iter().map(|e| e.runner.cancel_handle()).collect();

        thread::scope(|scope| {
            for (i, entry) in self.entries.iter_mut().enumerate() {
                let winner = Arc::clone(&winner);
                let cancel_handles = &cancel_handles;
                scope.spawn(move || {
                    entry.runner.run();
                    if entry.runner.success() {
                        let mut slot = winner.lock();
                        if slot.winner_index.is_none() {
                            slot.winner_index = Some(i);
                            for (j, h) in cancel_handles.iter().enumerate() {
                                if j != i {
                                    h.cancel();
                                }
                            }
                        }
                    }
                });
            }
        });

        let winner_index = self.winner.lock().winner_index;
        let idx = match winner_index {
            Some(i) => i,
            // All competitors finished without success (all cancelled each
            // other out, or all genuinely failed): fall back to any entry
            // reporting `finished()`, else the problem is undecidable.
            None => self
                .entries
                .iter()
                .position(|e| e.runner.finished())
                .ok_or(CongruenceError::Undecidable)?,
        };
        let entry = self.entries.remove(idx);
        Ok((idx, entry.label, entry.runner))
    }

}

impl Default for Race {
    fn default() -> Self {
        Race::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CancelHandle, RunnerState};
    use std::time::Duration;

    struct Immediate(RunnerState);

    impl Runner for Immediate {
        fn run_until(&mut self, _pred: &mut dyn FnMut() -> bool) {
            self.0.mark_finished(true);
        }
        fn set_deadline(&mut self, dur: Duration) {
            self.0.set_deadline(dur);
        }
        fn kill(&self) {
            self.0.kill();
        }
        fn finished(&self) -> bool {
            self.0.finished()
        }
        fn success(&self) -> bool {
            self.0.success()
        }
        fn cancel_handle(&self) -> CancelHandle {
            self.0.cancel_handle()
        }
    }

    struct NeverFinishes(RunnerState);

    impl Runner for NeverFinishes {
        fn run_until(&mut self, pred: &mut dyn FnMut() -> bool) {
            loop {
                if self.0.should_stop() || pred() {
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
        fn set_deadline(&mut self, dur: Duration) {
            self.0.set_deadline(dur);
        }
        fn kill(&self) {
            self.0.kill();
        }
        fn finished(&self) -> bool {
            self.0.finished()
        }
        fn success(&self) -> bool {
            self.0.success()
        }
        fn cancel_handle(&self) -> CancelHandle {
            self.0.cancel_handle()
        }
    }

    #[test]
    fn single_runner_takes_the_fast_path() {
        let mut race = Race::new();
        race.add_runner("only", Box::new(Immediate(RunnerState::new())));
        let (idx, label, runner) = race.run().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(label, "only");
        assert!(runner.success());
    }

    #[test]
    fn fast_competitor_wins_and_kills_the_slow_one() {
        let mut race = Race::new();
        race.add_runner("fast", Box::new(Immediate(RunnerState::new())));
        race.add_runner("slow", Box::new(NeverFinishes(RunnerState::new())));
        let (_idx, label, runner) = race.run().unwrap();
        assert_eq!(label, "fast");
        assert!(runner.success());
    }

    #[test]
    fn no_runners_is_an_error() {
        let race = Race::new();
        assert_eq!(race.run().err(), Some(CongruenceError::NoRunners));
    }

    #[test]
    fn max_threads_one_takes_sequential_path_without_spawning() {
        let mut race = Race::new();
        race.set_max_threads(1);
        race.add_runner("first", Box::new(Immediate(RunnerState::new())));
        race.add_runner("second", Box::new(Immediate(RunnerState::new())));
        let (idx, label, runner) = race.run().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(label, "first");
        assert!(runner.success());
    }
}
