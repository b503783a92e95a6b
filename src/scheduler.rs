//! Virtual simulation time and a deterministic event scheduler.
//!
//! Time is a monotonically non-decreasing nanosecond counter owned by the
//! scheduler; the model never reads wall-clock time. Events scheduled for
//! the same instant fire in insertion order, which keeps runs reproducible.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Point in virtual time, nanoseconds since simulation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

/// Span of virtual time in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimDuration(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000_000)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Elapsed time since `earlier`, saturating at zero when `earlier` is
    /// in the future.
    pub fn saturating_since(&self, earlier: SimTime) -> SimDuration {
        SimDuration(self.0.saturating_sub(earlier.0))
    }
}

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);

    pub const fn from_nanos(nanos: u64) -> Self {
        SimDuration(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimDuration(millis * 1_000_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimDuration(secs * 1_000_000_000)
    }

    /// Convert from seconds, truncating negatives to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs <= 0.0 {
            return SimDuration(0);
        }
        SimDuration((secs * 1e9) as u64)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }
}

impl std::ops::Add<SimDuration> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub<SimDuration> for SimTime {
    type Output = SimTime;
    fn sub(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Add for SimDuration {
    type Output = SimDuration;
    fn add(self, rhs: SimDuration) -> SimDuration {
        SimDuration(self.0.saturating_add(rhs.0))
    }
}

/// Handle for cancelling a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Scheduled<E> {
    at: SimTime,
    seq: u64,
    event: E,
}

// Ordering intentionally ignores the payload; ties break on insertion
// sequence so same-instant events pop in the order they were scheduled.
impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// Priority queue of future events over virtual time.
///
/// Cancellation is lazy: cancelled entries stay in the heap and are skipped
/// when they surface, so `cancel` is O(1).
pub struct EventScheduler<E> {
    heap: BinaryHeap<Reverse<Scheduled<E>>>,
    cancelled: HashSet<u64>,
    now: SimTime,
    next_seq: u64,
}

impl<E> Default for EventScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventScheduler<E> {
    pub fn new() -> Self {
        EventScheduler {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            now: SimTime::ZERO,
            next_seq: 0,
        }
    }

    /// Current virtual time, the timestamp of the last popped event.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `event` at absolute time `at`. Times earlier than `now` are
    /// clamped to `now` so time never runs backwards.
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let at = at.max(self.now);
        self.heap.push(Reverse(Scheduled { at, seq, event }));
        TimerHandle(seq)
    }

    /// Schedule `event` after a delay relative to `now`.
    pub fn schedule_after(&mut self, delay: SimDuration, event: E) -> TimerHandle {
        self.schedule_at(self.now + delay, event)
    }

    /// Cancel a pending event. Cancelling an already-fired or unknown
    /// handle has no effect.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.cancelled.insert(handle.0);
    }

    /// Pop the next pending event, advancing `now` to its timestamp.
    /// Returns `None` when no live events remain.
    pub fn pop_next(&mut self) -> Option<(SimTime, E)> {
        while let Some(Reverse(scheduled)) = self.heap.pop() {
            if self.cancelled.remove(&scheduled.seq) {
                continue;
            }
            self.now = scheduled.at;
            return Some((scheduled.at, scheduled.event));
        }
        None
    }

    /// Timestamp of the next live event without popping it.
    pub fn peek_next_time(&mut self) -> Option<SimTime> {
        while let Some(Reverse(scheduled)) = self.heap.peek() {
            if self.cancelled.contains(&scheduled.seq) {
                let seq = scheduled.seq;
                self.heap.pop();
                self.cancelled.remove(&seq);
                continue;
            }
            return Some(scheduled.at);
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.heap.iter().all(|Reverse(s)| self.cancelled.contains(&s.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_arithmetic_saturates() {
        let t = SimTime::from_secs(1);
        assert_eq!(t - SimDuration::from_secs(5), SimTime::ZERO);
        assert_eq!(t + SimDuration::from_millis(500), SimTime::from_millis(1500));
        assert_eq!(SimDuration::from_secs_f64(-3.0), SimDuration::ZERO);
        assert!((SimDuration::from_secs_f64(0.25).as_secs_f64() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn events_pop_in_time_order() {
        let mut sched = EventScheduler::new();
        sched.schedule_at(SimTime::from_millis(30), "c");
        sched.schedule_at(SimTime::from_millis(10), "a");
        sched.schedule_at(SimTime::from_millis(20), "b");

        assert_eq!(sched.pop_next(), Some((SimTime::from_millis(10), "a")));
        assert_eq!(sched.pop_next(), Some((SimTime::from_millis(20), "b")));
        assert_eq!(sched.now(), SimTime::from_millis(20));
        assert_eq!(sched.pop_next(), Some((SimTime::from_millis(30), "c")));
        assert_eq!(sched.pop_next(), None);
    }

    #[test]
    fn same_instant_events_keep_insertion_order() {
        let mut sched = EventScheduler::new();
        let t = SimTime::from_secs(1);
        sched.schedule_at(t, 1);
        sched.schedule_at(t, 2);
        sched.schedule_at(t, 3);
        assert_eq!(sched.pop_next().map(|(_, e)| e), Some(1));
        assert_eq!(sched.pop_next().map(|(_, e)| e), Some(2));
        assert_eq!(sched.pop_next().map(|(_, e)| e), Some(3));
    }

    #[test]
    fn cancelled_events_are_skipped() {
        let mut sched = EventScheduler::new();
        let keep = sched.schedule_at(SimTime::from_millis(10), "keep");
        let drop = sched.schedule_at(SimTime::from_millis(5), "drop");
        sched.cancel(drop);
        let _ = keep;

        assert_eq!(sched.peek_next_time(), Some(SimTime::from_millis(10)));
        assert_eq!(sched.pop_next(), Some((SimTime::from_millis(10), "keep")));
        assert!(sched.is_empty());
    }

    #[test]
    fn past_schedule_clamps_to_now() {
        let mut sched = EventScheduler::new();
        sched.schedule_at(SimTime::from_secs(2), "first");
        sched.pop_next();
        sched.schedule_at(SimTime::from_secs(1), "late");
        assert_eq!(sched.pop_next(), Some((SimTime::from_secs(2), "late")));
    }
}
