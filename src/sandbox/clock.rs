//! Virtual clock backing a sandbox's timer primitives.
//!
//! Scheduled calls are recorded instead of being handed to the host clock.
//! Time never advances on its own: the owner advances it explicitly, which
//! is what makes test timing deterministic and replayable.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Identifier handed back by the scheduling primitives.
pub type TimerId = u32;

/// A scheduled callback. Callbacks own their state; they have no handle
/// back into the clock.
pub type TimerCallback = Box<dyn FnMut() + Send>;

/// Intervals shorter than this are clamped so advancing a window cannot
/// spin on a zero-period entry.
const MIN_PERIOD: Duration = Duration::from_millis(1);

struct TimerEntry {
    callback: TimerCallback,
    fire_at: Duration,
    period: Option<Duration>,
}

struct RealTimerEntry {
    callback: TimerCallback,
    fire_at: Instant,
    period: Option<Duration>,
}

/// Registry of scheduled calls against a virtual (or temporarily real)
/// clock.
///
/// In virtual mode, entries fire only from [`advance`](Self::advance) or
/// [`run_pending`](Self::run_pending). While real mode is active, new
/// entries get wall-clock deadlines and fire from
/// [`fire_due_real`](Self::fire_due_real).
pub struct FakeTimers {
    now: Duration,
    next_id: TimerId,
    entries: BTreeMap<TimerId, TimerEntry>,
    real_entries: BTreeMap<TimerId, RealTimerEntry>,
    use_real: bool,
}

impl FakeTimers {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            entries: BTreeMap::new(),
            real_entries: BTreeMap::new(),
            use_real: false,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule a one-shot callback `delay` from now.
    pub fn set_timeout(&mut self, delay: Duration, callback: TimerCallback) -> TimerId {
        self.schedule(delay, None, callback)
    }

    /// Schedule a repeating callback every `period`.
    pub fn set_interval(&mut self, period: Duration, callback: TimerCallback) -> TimerId {
        let period = period.max(MIN_PERIOD);
        self.schedule(period, Some(period), callback)
    }

    fn schedule(
        &mut self,
        delay: Duration,
        period: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        if self.use_real {
            self.real_entries.insert(
                id,
                RealTimerEntry {
                    callback,
                    fire_at: Instant::now() + delay,
                    period,
                },
            );
        } else {
            self.entries.insert(
                id,
                TimerEntry {
                    callback,
                    fire_at: self.now + delay,
                    period,
                },
            );
        }
        id
    }

    /// Cancel a scheduled call. Unknown ids are ignored.
    pub fn clear(&mut self, id: TimerId) {
        self.entries.remove(&id);
        self.real_entries.remove(&id);
    }

    /// Number of scheduled calls that have not fired.
    pub fn pending_count(&self) -> usize {
        self.entries.len() + self.real_entries.len()
    }

    /// Advance virtual time by `delta`, firing due callbacks in deadline
    /// order (ties broken by scheduling order). Repeating entries re-arm.
    /// Returns how many callbacks fired.
    pub fn advance(&mut self, delta: Duration) -> usize {
        let target = self.now + delta;
        let mut fired = 0;

        loop {
            let next = self
                .entries
                .iter()
                .filter(|(_, e)| e.fire_at <= target)
                .min_by_key(|(id, e)| (e.fire_at, **id))
                .map(|(id, _)| *id);
            let Some(id) = next else { break };
            let Some(mut entry) = self.entries.remove(&id) else {
                break;
            };

            self.now = entry.fire_at;
            (entry.callback)();
            fired += 1;

            if let Some(period) = entry.period {
                entry.fire_at += period;
                self.entries.insert(id, entry);
            }
        }

        self.now = target;
        fired
    }

    /// Fire every entry pending right now, once each, in deadline order.
    /// Entries scheduled by the fired callbacks are left pending.
    pub fn run_pending(&mut self) -> usize {
        let mut pending: Vec<(Duration, TimerId)> = self
            .entries
            .iter()
            .map(|(id, e)| (e.fire_at, *id))
            .collect();
        pending.sort();

        let mut fired = 0;
        for (fire_at, id) in pending {
            let Some(mut entry) = self.entries.remove(&id) else {
                continue;
            };
            if self.now < fire_at {
                self.now = fire_at;
            }
            (entry.callback)();
            fired += 1;

            if let Some(period) = entry.period {
                entry.fire_at = self.now + period;
                self.entries.insert(id, entry);
            }
        }
        fired
    }

    /// Whether scheduling currently targets the real clock.
    pub fn using_real_timers(&self) -> bool {
        self.use_real
    }

    /// Redirect scheduling to the wall clock until restored.
    pub(crate) fn set_real_mode(&mut self, real: bool) {
        self.use_real = real;
    }

    /// Fire real-mode entries whose wall-clock deadline has passed.
    pub fn fire_due_real(&mut self) -> usize {
        let now = Instant::now();
        let mut due: Vec<(Instant, TimerId)> = self
            .real_entries
            .iter()
            .filter(|(_, e)| e.fire_at <= now)
            .map(|(id, e)| (e.fire_at, *id))
            .collect();
        due.sort();

        let mut fired = 0;
        for (_, id) in due {
            let Some(mut entry) = self.real_entries.remove(&id) else {
                continue;
            };
            (entry.callback)();
            fired += 1;

            if let Some(period) = entry.period {
                entry.fire_at = now + period;
                self.real_entries.insert(id, entry);
            }
        }
        fired
    }

    /// Drop every pending entry, virtual and real.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.real_entries.clear();
    }
}

impl Default for FakeTimers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = count.clone();
            move || -> TimerCallback {
                let count = count.clone();
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }
        };
        (count, make)
    }

    #[test]
    fn test_advance_fires_exactly_at_deadline() {
        let (count, cb) = counter();
        let mut timers = FakeTimers::new();
        timers.set_timeout(Duration::from_millis(100), cb());

        timers.advance(Duration::from_millis(99));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        timers.advance(Duration::from_millis(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Fired once, not again on further advancement.
        timers.advance(Duration::from_millis(500));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_time_never_advances_on_its_own() {
        let (count, cb) = counter();
        let mut timers = FakeTimers::new();
        timers.set_timeout(Duration::from_millis(1), cb());

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timers.now(), Duration::ZERO);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_interval_refires_each_period() {
        let (count, cb) = counter();
        let mut timers = FakeTimers::new();
        let id = timers.set_interval(Duration::from_millis(10), cb());

        timers.advance(Duration::from_millis(35));
        assert_eq!(count.load(Ordering::SeqCst), 3);

        timers.clear(id);
        timers.advance(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deadline_order_breaks_ties_by_schedule_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut timers = FakeTimers::new();
        for label in ["late", "early", "early-second"] {
            let order = order.clone();
            let delay = if label == "late" { 20 } else { 10 };
            timers.set_timeout(
                Duration::from_millis(delay),
                Box::new(move || order.lock().unwrap().push(label)),
            );
        }

        timers.advance(Duration::from_millis(30));
        assert_eq!(
            *order.lock().unwrap(),
            vec!["early", "early-second", "late"]
        );
    }

    #[test]
    fn test_clear_cancels_pending_entry() {
        let (count, cb) = counter();
        let mut timers = FakeTimers::new();
        let id = timers.set_timeout(Duration::from_millis(10), cb());
        timers.clear(id);

        timers.advance(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_pending_fires_snapshot_once() {
        let (count, cb) = counter();
        let mut timers = FakeTimers::new();
        timers.set_timeout(Duration::from_millis(5), cb());
        timers.set_interval(Duration::from_millis(10), cb());

        assert_eq!(timers.run_pending(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        // The interval re-armed; the one-shot is gone.
        assert_eq!(timers.pending_count(), 1);
    }

    #[test]
    fn test_real_mode_entries_fire_from_wall_clock() {
        let (count, cb) = counter();
        let mut timers = FakeTimers::new();
        timers.set_real_mode(true);
        timers.set_timeout(Duration::ZERO, cb());
        timers.set_real_mode(false);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timers.fire_due_real(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Virtual advancement never touches real-mode entries.
        assert_eq!(timers.advance(Duration::from_secs(1)), 0);
    }
}
