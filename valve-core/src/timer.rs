//! One-shot and repeating elapsed-time triggers.

use core::time::Duration;

use crate::time::{Identifier, Millis};

/// How many times an [`ElapsedTimer`] should fire once armed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FireCount {
    /// Fire this many more times; `Finite(0)` means disarmed.
    Finite(u16),
    /// Fire until explicitly disarmed.
    Infinite,
}

impl FireCount {
    /// Disarmed timer.
    pub const OFF: Self = FireCount::Finite(0);

    /// Returns `true` if at least one more fire is scheduled.
    #[must_use]
    pub const fn is_armed(self) -> bool {
        !matches!(self, FireCount::Finite(0))
    }
}

/// Outcome of a poll that fired.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fire {
    /// Finite timer fired; carries the count before this fire was consumed.
    Remaining(u16),
    /// Unbounded timer fired.
    Infinite,
}

impl Fire {
    /// Returns `true` when this fire disarmed the timer.
    #[must_use]
    pub const fn is_last(self) -> bool {
        matches!(self, Fire::Remaining(1))
    }
}

/// Fires after an interval elapses, optionally repeating.
///
/// Each fire reschedules relative to the poll that observed it
/// (`next = now + interval`), so a late poll delays the following fires
/// instead of producing a burst of catch-up fires.
#[derive(Clone, Debug)]
pub struct ElapsedTimer {
    identifier: Identifier,
    count: FireCount,
    interval: Duration,
    next: Millis,
}

impl ElapsedTimer {
    /// Creates a disarmed timer tagged with `identifier`.
    #[must_use]
    pub const fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            count: FireCount::OFF,
            interval: Duration::ZERO,
            next: Millis::ZERO,
        }
    }

    /// Arms the timer to fire once, `interval` after `now`.
    pub fn once(&mut self, interval: Duration, now: Millis) {
        self.repeat(interval, FireCount::Finite(1), now);
    }

    /// Arms the timer to fire `count` times, every `interval`, starting `interval` after `now`.
    pub fn repeat(&mut self, interval: Duration, count: FireCount, now: Millis) {
        self.interval = interval;
        self.count = count;
        self.next = now.wrapping_add(interval);
    }

    /// Disarms the timer.
    pub fn off(&mut self) {
        self.count = FireCount::OFF;
    }

    /// Remaining fires.
    #[must_use]
    pub fn remaining(&self) -> FireCount {
        self.count
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.count.is_armed()
    }

    #[must_use]
    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    /// Fires if armed and the deadline has passed.
    pub fn poll(&mut self, now: Millis) -> Option<Fire> {
        if !self.is_armed() || !now.has_reached(self.next) {
            return None;
        }

        self.next = now.wrapping_add(self.interval);
        match self.count {
            FireCount::Infinite => Some(Fire::Infinite),
            FireCount::Finite(left) => {
                self.count = FireCount::Finite(left - 1);
                Some(Fire::Remaining(left))
            }
        }
    }

    /// Polls and calls `callback` with the timer's identifier on every fire.
    pub fn poll_with<F>(&mut self, now: Millis, callback: F) -> Option<Fire>
    where
        F: FnOnce(Identifier),
    {
        let fire = self.poll(now);
        if fire.is_some() {
            callback(self.identifier);
        }
        fire
    }
}
