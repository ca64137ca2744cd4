//! Cooperative search deadlines.
//!
//! Searches poll [`SearchClock::aborted`] at iteration boundaries and
//! inside the recursive descent; nothing is ever preempted. The clock
//! is shared behind an `Arc` so a driver thread can stop or retarget a
//! running computation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Sentinel meaning no deadline is armed.
const NO_DEADLINE: u64 = u64::MAX;

/// Countdown clock with a cooperative abort flag.
#[derive(Debug)]
pub struct SearchClock {
    /// Reference instant; deadlines are millisecond offsets from it
    epoch: Instant,

    /// Armed deadline in milliseconds since `epoch`
    deadline: AtomicU64,

    /// Explicit stop requested by a driver
    aborted: AtomicBool,
}

impl SearchClock {
    /// Creates a clock with no armed deadline.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            deadline: AtomicU64::new(NO_DEADLINE),
            aborted: AtomicBool::new(false),
        }
    }

    /// Arms the countdown to expire after the given milliseconds,
    /// clearing any pending abort request.
    pub fn schedule_count_down(&self, millis: u64) {
        self.aborted.store(false, Ordering::Relaxed);
        self.deadline
            .store(self.elapsed_millis() + millis, Ordering::Relaxed);
    }

    /// Retargets the armed deadline to expire after the given
    /// milliseconds. Used on ponder-hit to convert ponder time into
    /// search time. Does not clear a pending abort request.
    pub fn abort_computation(&self, millis: u64) {
        self.deadline
            .store(self.elapsed_millis() + millis, Ordering::Relaxed);
    }

    /// Requests an immediate cooperative stop.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    /// Clears the deadline and the abort flag.
    pub fn cancel_count_down(&self) {
        self.aborted.store(false, Ordering::Relaxed);
        self.deadline.store(NO_DEADLINE, Ordering::Relaxed);
    }

    /// Whether the computation must stop: either the deadline passed
    /// or a stop was requested.
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
            || self.elapsed_millis() >= self.deadline.load(Ordering::Relaxed)
    }

    fn elapsed_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for SearchClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn unarmed_clock_never_aborts() {
        let clock = SearchClock::new();
        assert!(!clock.aborted());
    }

    #[test]
    fn countdown_expires() {
        let clock = SearchClock::new();
        clock.schedule_count_down(10);
        assert!(!clock.aborted());

        thread::sleep(Duration::from_millis(25));
        assert!(clock.aborted());
    }

    #[test]
    fn abort_is_immediate() {
        let clock = SearchClock::new();
        clock.schedule_count_down(60_000);
        clock.abort();
        assert!(clock.aborted());
    }

    #[test]
    fn cancel_clears_deadline_and_abort() {
        let clock = SearchClock::new();
        clock.schedule_count_down(1);
        clock.abort();
        clock.cancel_count_down();
        assert!(!clock.aborted());
    }

    #[test]
    fn retarget_extends_an_armed_deadline() {
        let clock = SearchClock::new();
        clock.schedule_count_down(5);
        clock.abort_computation(60_000);

        thread::sleep(Duration::from_millis(20));
        assert!(!clock.aborted());
    }
}
