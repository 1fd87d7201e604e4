/// Time sources and deferred work.
///
/// Nothing in the crate sleeps on its own. Retries and the debounced board
/// setup are recorded as deadlines on a `Clock`; the host (or `session::pump`)
/// runs whatever is due.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Monotonic time elapsed since the clock's origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Clock moved by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Clock backed by `tokio::time`, so paused test time applies.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Trailing-edge debounce: each call pushes the deadline out and replaces
/// the pending value.
#[derive(Debug)]
pub struct Debouncer<T> {
    wait: Duration,
    pending: Option<(Duration, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: None,
        }
    }

    pub fn call(&mut self, now: Duration, value: T) {
        self.pending = Some((now + self.wait, value));
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending value once its deadline has passed.
    pub fn take_due(&mut self, now: Duration) -> Option<T> {
        match self.pending {
            Some((at, _)) if at <= now => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }
}

/// One-shot timers, run in deadline order (ties in scheduling order).
#[derive(Debug)]
pub struct Timers<T> {
    entries: Vec<(Duration, u64, T)>,
    seq: u64,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seq: 0,
        }
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Duration, task: T) {
        self.entries.push((at, self.seq, task));
        self.seq += 1;
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|(at, _, _)| *at).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take_due(&mut self, now: Duration) -> Vec<T> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(at, _, _)| *at <= now);
        self.entries = rest;
        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        due.into_iter().map(|(_, _, task)| task).collect()
    }
}
