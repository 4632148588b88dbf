//! Cooperative timeouts for long running computations.

use std::time::{Duration, Instant};

/// Number of calls to [`Deadline::expired_sparse`] between two clock reads
const SPARSE_POLL_INTERVAL: u64 = 100;

/// A point in time after which a computation should stop.
///
/// Once the deadline has tripped it stays tripped.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
    polls: u64,
    tripped: bool,
}

impl Deadline {
    /// Create a new [`Deadline`] that expires once `limit` has passed.
    ///
    /// A limit of `None` never expires.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
            polls: 0,
            tripped: false,
        }
    }

    /// Create a [`Deadline`] that never expires.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Create a [`Deadline`] from a number of milliseconds,
    /// where zero means that there is no limit.
    pub fn from_millis(milliseconds: u64) -> Self {
        Self::new((milliseconds > 0).then(|| Duration::from_millis(milliseconds)))
    }

    /// Return the time limit, if any.
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// Time since the creation of this deadline.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Return `true` if the deadline has tripped during an earlier poll.
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Check the clock and return `true` if the deadline has passed.
    pub fn expired(&mut self) -> bool {
        if self.tripped {
            return true;
        }

        let Some(limit) = self.limit else {
            return false;
        };

        if self.start.elapsed() > limit {
            self.tripped = true;
        }

        self.tripped
    }

    /// Like [`Deadline::expired`], but only reads the clock on every
    /// hundredth call, which makes it cheap enough for inner loops.
    pub fn expired_sparse(&mut self) -> bool {
        if self.tripped {
            return true;
        }

        if self.limit.is_none() {
            return false;
        }

        let poll = self.polls;
        self.polls += 1;

        if poll % SPARSE_POLL_INTERVAL == 0 {
            self.expired()
        } else {
            false
        }
    }
}
