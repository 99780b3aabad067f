//! Debounced digital input with press/release edge reporting.
//!
//! Mechanical contacts bounce for a few milliseconds when they make or break.
//! [`DebouncedInput`] only trusts a raw reading after it has held still for
//! the configured debounce window, then reports the transition exactly once.
//! Releases are further classified as short or long depending on how long the
//! contact had been closed.

use core::time::Duration;

use crate::io::{DigitalSource, Polarity};
use crate::time::{Identifier, Millis, duration_to_millis};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(5);
/// Default threshold separating a long press from a short one.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(2_000);

/// Transition reported by [`DebouncedInput::poll`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEdge {
    /// Contact closed (input became active).
    Closed,
    /// Contact opened after a short closure.
    Opened,
    /// Contact opened after being closed longer than the long-press threshold.
    OpenedLong,
}

impl InputEdge {
    /// Returns `true` for either release variant.
    #[must_use]
    pub const fn is_release(self) -> bool {
        matches!(self, InputEdge::Opened | InputEdge::OpenedLong)
    }
}

/// Wiring and timing parameters for a [`DebouncedInput`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InputConfig {
    pub polarity: Polarity,
    pub debounce: Duration,
    pub long_press: Duration,
}

impl InputConfig {
    /// Creates a configuration with explicit values.
    #[must_use]
    pub const fn new(polarity: Polarity, debounce: Duration, long_press: Duration) -> Self {
        Self {
            polarity,
            debounce,
            long_press,
        }
    }

    /// Default configuration with a different polarity.
    #[must_use]
    pub const fn with_polarity(polarity: Polarity) -> Self {
        Self::new(polarity, DEFAULT_DEBOUNCE, DEFAULT_LONG_PRESS)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::with_polarity(Polarity::ActiveLow)
    }
}

/// Debounced view of a [`DigitalSource`].
#[allow(clippy::struct_excessive_bools)]
pub struct DebouncedInput<S> {
    source: S,
    polarity: Polarity,
    debounce: Duration,
    long_press_ms: u32,
    unstable: bool,
    stable: bool,
    changed: bool,
    long_press: bool,
    // Earliest time the unstable reading may be committed. Also serves as the
    // start of the current closure when classifying releases.
    settle_at: Millis,
}

impl<S: DigitalSource> DebouncedInput<S> {
    /// Wraps `source`, treating its first reading as already stable.
    #[must_use]
    pub fn new(mut source: S, config: InputConfig, now: Millis) -> Self {
        let initial = config.polarity.is_active(source.read());
        Self::with_initial(source, config, initial, now)
    }

    /// Wraps `source` with an explicit initial stable state.
    ///
    /// Used for shift-register wiring, where the image may not have been
    /// clocked in yet when the input is constructed.
    #[must_use]
    pub fn with_initial(source: S, config: InputConfig, initial: bool, now: Millis) -> Self {
        Self {
            source,
            polarity: config.polarity,
            debounce: config.debounce,
            long_press_ms: duration_to_millis(config.long_press),
            unstable: initial,
            stable: initial,
            changed: false,
            long_press: false,
            settle_at: now,
        }
    }

    /// Samples the source and reports a debounced transition, if one completed.
    pub fn poll(&mut self, now: Millis) -> Option<InputEdge> {
        self.changed = false;
        let on = self.is_on_raw();

        if on != self.unstable {
            // Classify the closure on the first raw release after it settled.
            // Release bounces land before `settle_at` and keep that verdict.
            if !on && now.has_reached(self.settle_at) {
                self.long_press = now.elapsed_since(self.settle_at) > self.long_press_ms;
            }
            self.settle_at = now.wrapping_add(self.debounce);
            self.unstable = on;
            return None;
        }

        if !now.has_reached(self.settle_at) || on == self.stable {
            return None;
        }

        self.stable = on;
        self.changed = true;
        Some(if on {
            InputEdge::Closed
        } else if self.long_press {
            InputEdge::OpenedLong
        } else {
            InputEdge::Opened
        })
    }

    /// Polls and hands any transition to `callback` along with `identifier`.
    pub fn poll_with<F>(
        &mut self,
        now: Millis,
        identifier: Identifier,
        callback: F,
    ) -> Option<InputEdge>
    where
        F: FnOnce(InputEdge, Identifier),
    {
        let edge = self.poll(now);
        if let Some(edge) = edge {
            callback(edge, identifier);
        }
        edge
    }

    /// Reads the source without debouncing.
    pub fn is_on_raw(&mut self) -> bool {
        self.polarity.is_active(self.source.read())
    }

    /// Debounced state.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.stable
    }

    /// `true` only during the poll in which the input became active.
    #[must_use]
    pub fn pressed(&self) -> bool {
        self.stable && self.changed
    }

    /// `true` only during the poll in which the input became inactive.
    #[must_use]
    pub fn released(&self) -> bool {
        !self.stable && self.changed
    }

    /// `true` only during the poll in which the debounced state changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Configured polarity.
    #[must_use]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}
