#![forbid(unsafe_code)]

//! Time-coalescing primitives: [`Throttler`] and [`Debouncer`].
//!
//! Both hold a "current output" value and pace how submitted values reach
//! it. They are deadline-polled: nothing fires on its own — the owner calls
//! [`poll`](Throttler::poll) with the current instant (typically from its
//! tick loop, at or after [`next_deadline`](Throttler::next_deadline)).
//! Dropping a primitive is disposal; there is no thread or callback that
//! could fire afterwards.
//!
//! # Throttle vs. debounce
//!
//! ```text
//! submits:   a   b  c      d              e
//! throttle:  a───────c─────d──────────────e      (≤ 1 output per delay)
//! debounce:  ·          c            d        e  (output after quiet gap)
//! ```
//!
//! A throttler emits the first submission immediately and then at most one
//! output per `delay`, always promoting the *latest* pending value. A
//! debouncer waits for `delay` of silence before promoting the latest
//! value.
//!
//! # Ordering
//!
//! Outputs only ever change in submission order. `submit_now` (the forced
//! path, used when a hard boundary such as a field switch must not be
//! smoothed over) updates the output immediately and supersedes any pending
//! earlier submission.

use std::time::Duration;

use tracing::trace;
use web_time::Instant;

/// Rate-limits a stream of values: at most one output change per `delay`.
///
/// While a window is open, submissions replace the latest pending value
/// without touching the output. When the window elapses ([`poll`]), the
/// pending value is promoted if it differs from the output and a new window
/// starts; otherwise throttling goes idle until the next submission.
///
/// [`poll`]: Throttler::poll
#[derive(Debug, Clone)]
pub struct Throttler<T> {
    delay: Duration,
    output: T,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T: Clone + PartialEq> Throttler<T> {
    /// Create a throttler with the given seed output and window length.
    #[must_use]
    pub fn new(seed: T, delay: Duration) -> Self {
        Self {
            delay,
            output: seed,
            pending: None,
            deadline: None,
        }
    }

    /// The current output value.
    #[must_use]
    pub fn output(&self) -> &T {
        &self.output
    }

    /// Instant at which [`poll`](Throttler::poll) will next have an effect,
    /// if a window is open.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Submit a value. Returns the new output if it changed right away
    /// (idle throttler or zero delay); otherwise the value waits as the
    /// latest pending submission.
    pub fn submit(&mut self, value: T, now: Instant) -> Option<T> {
        self.submit_inner(value, false, now)
    }

    /// Submit a value, forcing an immediate output update and a fresh
    /// window regardless of state.
    pub fn submit_now(&mut self, value: T, now: Instant) -> Option<T> {
        self.submit_inner(value, true, now)
    }

    fn submit_inner(&mut self, value: T, reset: bool, now: Instant) -> Option<T> {
        self.pending = Some(value.clone());
        if self.delay.is_zero() || reset || self.deadline.is_none() {
            self.deadline = Some(now + self.delay);
            if value != self.output {
                self.output = value.clone();
                return Some(value);
            }
        }
        None
    }

    /// Drive the window. At or past the deadline, promotes the latest
    /// pending value if it differs from the output (returning it and
    /// restarting the window), or goes idle.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        let newest = self.pending.clone().unwrap_or_else(|| self.output.clone());
        if newest != self.output {
            self.output = newest.clone();
            self.deadline = Some(now + self.delay);
            trace!("throttle window fired, output promoted");
            Some(newest)
        } else {
            self.deadline = None;
            trace!("throttle window fired with nothing new, going idle");
            None
        }
    }

    /// Discard the pending value and close the window. Nothing will be
    /// promoted until the next submission.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}

/// Delays a stream of values until `delay` has passed with no newer
/// submission, then promotes the latest value.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    output: T,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    /// Create a debouncer with the given seed output and quiet period.
    #[must_use]
    pub fn new(seed: T, delay: Duration) -> Self {
        Self {
            delay,
            output: seed,
            pending: None,
            deadline: None,
        }
    }

    /// The current output value.
    #[must_use]
    pub fn output(&self) -> &T {
        &self.output
    }

    /// Instant at which [`poll`](Debouncer::poll) will next have an effect,
    /// if a quiet period is being awaited.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Submit a value. A value differing from the output (re)starts a fresh
    /// quiet period; a value equal to the output disarms any pending one.
    pub fn submit(&mut self, value: T, now: Instant) -> Option<T> {
        if value == self.output {
            self.pending = None;
            self.deadline = None;
            return None;
        }
        self.pending = Some(value);
        self.deadline = Some(now + self.delay);
        None
    }

    /// Submit a value, bypassing the quiet period. Supersedes any pending
    /// earlier submission. Returns the new output if it changed.
    pub fn submit_now(&mut self, value: T, _now: Instant) -> Option<T> {
        self.pending = None;
        self.deadline = None;
        if value != self.output {
            self.output = value.clone();
            Some(value)
        } else {
            None
        }
    }

    /// Drive the quiet period. At or past the deadline, promotes the
    /// pending value.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        let value = self.pending.take()?;
        if value != self.output {
            self.output = value.clone();
            trace!("debounce quiet period elapsed, output promoted");
            Some(value)
        } else {
            None
        }
    }

    /// Discard the pending value and disarm the quiet period.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}
