//! Numbered timers polled by the message thread.
//!
//! A [`MultiTimer`] never fires on its own. The dispatch loop polls it with
//! the current time; every timer whose deadline has passed fires once and
//! its deadline advances past `now`, so a late poll does not produce a
//! burst of catch-up callbacks.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct TimerState {
    interval: Duration,
    next_due: Instant,
    // Changes on every start, so a restart can be told apart from the
    // run that was due.
    generation: u64,
}

/// A set of independent timers keyed by id.
#[derive(Debug, Default)]
pub struct MultiTimer {
    timers: RefCell<BTreeMap<i32, TimerState>>,
    next_generation: Cell<u64>,
}

impl MultiTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) timer `timer_id`. Intervals below one
    /// millisecond are raised to one millisecond.
    pub fn start_timer(&self, timer_id: i32, interval_ms: i32) {
        self.start_timer_at(timer_id, interval_ms, Instant::now());
    }

    /// [`start_timer`](Self::start_timer) with an explicit start time.
    pub fn start_timer_at(&self, timer_id: i32, interval_ms: i32, now: Instant) {
        let interval = Duration::from_millis(u64::from(interval_ms.max(1).unsigned_abs()));
        let generation = self.next_generation.get();
        self.next_generation.set(generation.wrapping_add(1));
        self.timers.borrow_mut().insert(
            timer_id,
            TimerState {
                interval,
                next_due: now + interval,
                generation,
            },
        );
    }

    pub fn stop_timer(&self, timer_id: i32) {
        self.timers.borrow_mut().remove(&timer_id);
    }

    pub fn is_timer_running(&self, timer_id: i32) -> bool {
        self.timers.borrow().contains_key(&timer_id)
    }

    /// The interval of a running timer.
    pub fn timer_interval(&self, timer_id: i32) -> Option<Duration> {
        self.timers.borrow().get(&timer_id).map(|timer| timer.interval)
    }

    pub fn num_running(&self) -> usize {
        self.timers.borrow().len()
    }

    /// The earliest deadline of any running timer.
    pub fn next_due(&self) -> Option<Instant> {
        self.timers.borrow().values().map(|timer| timer.next_due).min()
    }

    /// Fires every timer due at `now`, in id order, and returns how many
    /// fired.
    ///
    /// `fire` may start and stop timers on this set. A timer stopped or
    /// restarted by an earlier callback in the same poll does not fire; a
    /// restarted timer waits for its new deadline.
    pub fn poll(&self, now: Instant, mut fire: impl FnMut(i32)) -> usize {
        let due: Vec<(i32, u64)> = {
            let mut timers = self.timers.borrow_mut();
            timers
                .iter_mut()
                .filter(|(_, timer)| timer.next_due <= now)
                .map(|(&timer_id, timer)| {
                    while timer.next_due <= now {
                        timer.next_due += timer.interval;
                    }
                    (timer_id, timer.generation)
                })
                .collect()
        };

        let mut fired = 0;
        for (timer_id, generation) in due {
            if self.is_same_run(timer_id, generation) {
                fire(timer_id);
                fired += 1;
            }
        }
        fired
    }

    fn is_same_run(&self, timer_id: i32, generation: u64) -> bool {
        self.timers
            .borrow()
            .get(&timer_id)
            .is_some_and(|timer| timer.generation == generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_fires_once_per_interval() {
        let timers = MultiTimer::new();
        let start = Instant::now();
        timers.start_timer_at(1, 100, start);

        let mut fired = Vec::new();
        assert_eq!(timers.poll(start + ms(50), |id| fired.push(id)), 0);
        for elapsed in [100, 200, 300] {
            assert_eq!(timers.poll(start + ms(elapsed), |id| fired.push(id)), 1);
        }
        assert_eq!(fired, [1, 1, 1]);

        timers.stop_timer(1);
        assert_eq!(timers.poll(start + ms(400), |id| fired.push(id)), 0);
        assert!(!timers.is_timer_running(1));
    }

    #[test]
    fn test_late_poll_is_coalesced() {
        let timers = MultiTimer::new();
        let start = Instant::now();
        timers.start_timer_at(7, 10, start);

        assert_eq!(timers.poll(start + ms(55), |_| {}), 1);
        assert_eq!(timers.next_due(), Some(start + ms(60)));
    }

    #[test]
    fn test_independent_timers() {
        let timers = MultiTimer::new();
        let start = Instant::now();
        timers.start_timer_at(2, 30, start);
        timers.start_timer_at(1, 20, start);
        assert_eq!(timers.num_running(), 2);
        assert_eq!(timers.timer_interval(2), Some(ms(30)));
        assert_eq!(timers.next_due(), Some(start + ms(20)));

        let mut fired = Vec::new();
        timers.poll(start + ms(30), |id| fired.push(id));
        assert_eq!(fired, [1, 2]);
    }

    #[test]
    fn test_callbacks_may_stop_timers() {
        let timers = MultiTimer::new();
        let start = Instant::now();
        timers.start_timer_at(1, 10, start);
        timers.start_timer_at(2, 10, start);

        let mut fired = Vec::new();
        timers.poll(start + ms(10), |id| {
            fired.push(id);
            timers.stop_timer(2);
        });
        assert_eq!(fired, [1]);
        assert!(!timers.is_timer_running(2));
    }

    #[test]
    fn test_restarted_timer_waits_for_its_new_deadline() {
        let timers = MultiTimer::new();
        let start = Instant::now();
        timers.start_timer_at(1, 10, start);
        timers.start_timer_at(2, 10, start);

        let now = start + ms(10);
        let mut fired = Vec::new();
        timers.poll(now, |id| {
            fired.push(id);
            if id == 1 {
                timers.start_timer_at(2, 50, now);
            }
        });
        assert_eq!(fired, [1]);
        assert!(timers.is_timer_running(2));
        assert_eq!(timers.timer_interval(2), Some(ms(50)));

        fired.clear();
        timers.poll(start + ms(59), |id| fired.push(id));
        assert_eq!(fired, [1]);
        timers.poll(start + ms(60), |id| fired.push(id));
        assert_eq!(fired, [1, 2]);
    }

    #[test]
    fn test_interval_is_at_least_one_millisecond() {
        let timers = MultiTimer::new();
        timers.start_timer(3, 0);
        assert_eq!(timers.timer_interval(3), Some(ms(1)));
        assert_eq!(timers.timer_interval(4), None);
    }
}
