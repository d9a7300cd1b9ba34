use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Single-shot delayed callbacks. A fired or cancelled handle never fires again.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TimerHandle;
    /// Idempotent; unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
    /// Removes and returns every handle whose deadline has passed, earliest first.
    fn take_due(&mut self) -> Vec<TimerHandle>;
    /// Time until the earliest pending deadline, if any.
    fn next_delay(&self) -> Option<Duration>;
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Deadline queue polled by the event loop.
#[derive(Debug)]
pub struct TimerQueue<C: Clock = SystemClock> {
    clock: C,
    next_id: u64,
    pending: Vec<(TimerHandle, Instant)>,
}

impl TimerQueue<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimerQueue<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimerQueue<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|(h, _)| *h == handle)
    }
}

impl<C: Clock> Scheduler for TimerQueue<C> {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push((handle, self.clock.now() + delay));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|(h, _)| *h != handle);
    }

    fn take_due(&mut self) -> Vec<TimerHandle> {
        let now = self.clock.now();
        let mut due: Vec<(TimerHandle, Instant)> = Vec::new();
        self.pending.retain(|&(handle, deadline)| {
            if deadline <= now {
                due.push((handle, deadline));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(handle, deadline)| (deadline, handle));
        due.into_iter().map(|(handle, _)| handle).collect()
    }

    fn next_delay(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.pending
            .iter()
            .map(|&(_, deadline)| deadline.saturating_duration_since(now))
            .min()
    }
}
