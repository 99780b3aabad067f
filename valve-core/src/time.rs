//! Wrapping monotonic timestamps.
//!
//! Host loops hand every component a free-running counter that is expected to
//! overflow over long uptimes. Deadlines are therefore compared with signed
//! wrapping subtraction rather than `Ord`, which keeps every comparison
//! correct as long as the two instants are less than `2^31` ticks apart.

use core::time::Duration;

/// Opaque value handed back to callbacks so one function can serve many
/// component instances.
pub type Identifier = u8;

/// Wrapping millisecond counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

/// Wrapping microsecond counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Micros(pub u32);

fn saturating_ticks(ticks: u128) -> u32 {
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Converts a [`Duration`] to whole milliseconds, saturating at `u32::MAX`.
#[must_use]
pub fn duration_to_millis(duration: Duration) -> u32 {
    saturating_ticks(duration.as_millis())
}

/// Converts a [`Duration`] to whole microseconds, saturating at `u32::MAX`.
#[must_use]
pub fn duration_to_micros(duration: Duration) -> u32 {
    saturating_ticks(duration.as_micros())
}

impl Millis {
    /// Counter value zero.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick count.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Returns the instant `duration` after `self`, wrapping on overflow.
    #[must_use]
    pub fn wrapping_add(self, duration: Duration) -> Self {
        Self(self.0.wrapping_add(duration_to_millis(duration)))
    }

    /// Returns the instant `duration` before `self`, wrapping on underflow.
    #[must_use]
    pub fn wrapping_sub(self, duration: Duration) -> Self {
        Self(self.0.wrapping_sub(duration_to_millis(duration)))
    }

    /// Returns `true` once `self` is at or past `deadline`.
    #[must_use]
    pub const fn has_reached(self, deadline: Self) -> bool {
        signed_delta(self.0, deadline.0) >= 0
    }

    /// Ticks elapsed from `earlier` to `self`.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl Micros {
    /// Counter value zero.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick count.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Returns the instant `duration` after `self`, wrapping on overflow.
    #[must_use]
    pub fn wrapping_add(self, duration: Duration) -> Self {
        Self(self.0.wrapping_add(duration_to_micros(duration)))
    }

    /// Returns `true` once `self` is at or past `deadline`.
    #[must_use]
    pub const fn has_reached(self, deadline: Self) -> bool {
        signed_delta(self.0, deadline.0) >= 0
    }

    /// Ticks elapsed from `earlier` to `self`.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn signed_delta(now: u32, target: u32) -> i32 {
    now.wrapping_sub(target) as i32
}
