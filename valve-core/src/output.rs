//! Digital output with timed auto-off and blink patterns.

use core::time::Duration;

use crate::io::{DigitalSink, Level, Polarity};
use crate::time::Millis;
use crate::timer::{ElapsedTimer, Fire, FireCount};

/// Interval used by [`TimedOutput::blink_slow`].
pub const BLINK_SLOW: Duration = Duration::from_millis(1_000);
/// Interval used by [`TimedOutput::blink_fast`].
pub const BLINK_FAST: Duration = Duration::from_millis(100);

/// Number of on-pulses in a blink pattern.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlinkCount {
    Times(u8),
    Forever,
}

impl BlinkCount {
    // Each pulse is an on-phase and an off-phase; the pattern starts lit, so
    // the final off-phase is the last fire.
    fn fires(self) -> FireCount {
        match self {
            BlinkCount::Times(n) => FireCount::Finite((u16::from(n) * 2).saturating_sub(1)),
            BlinkCount::Forever => FireCount::Infinite,
        }
    }
}

/// Drives a [`DigitalSink`] on, off, for a while, or in a blink pattern.
pub struct TimedOutput<S> {
    sink: S,
    polarity: Polarity,
    active: bool,
    lit: bool,
    timer: ElapsedTimer,
}

impl<S: DigitalSink> TimedOutput<S> {
    /// Wraps `sink` and immediately drives it to the inactive level.
    #[must_use]
    pub fn new(sink: S, polarity: Polarity) -> Self {
        let mut output = Self {
            sink,
            polarity,
            active: false,
            lit: false,
            timer: ElapsedTimer::new(0),
        };
        output.drive(false);
        output
    }

    /// Turns the output on indefinitely, cancelling any blink pattern.
    pub fn on(&mut self) {
        self.timer.off();
        self.active = true;
        self.drive(true);
    }

    /// Turns the output on for `duration`, then off. A zero duration means
    /// indefinitely.
    pub fn on_for(&mut self, duration: Duration, now: Millis) {
        if duration.is_zero() {
            self.on();
        } else {
            self.blink(BlinkCount::Times(1), duration, now);
        }
    }

    /// Forces the inactive level and cancels any timing.
    pub fn off(&mut self) {
        self.timer.off();
        self.active = false;
        self.drive(false);
    }

    pub fn toggle(&mut self) {
        if self.active {
            self.off();
        } else {
            self.on();
        }
    }

    /// Starts a blink pattern, lit first, switching every `interval`.
    pub fn blink(&mut self, count: BlinkCount, interval: Duration, now: Millis) {
        if count == BlinkCount::Times(0) {
            self.off();
            return;
        }
        self.timer.repeat(interval, count.fires(), now);
        self.active = true;
        self.drive(true);
    }

    pub fn blink_slow(&mut self, count: BlinkCount, now: Millis) {
        self.blink(count, BLINK_SLOW, now);
    }

    pub fn blink_fast(&mut self, count: BlinkCount, now: Millis) {
        self.blink(count, BLINK_FAST, now);
    }

    /// Advances any running pattern. Returns the timer fire, if one occurred.
    pub fn poll(&mut self, now: Millis) -> Option<Fire> {
        let fire = self.timer.poll(now)?;
        if fire.is_last() {
            self.off();
        } else {
            self.drive(!self.lit);
        }
        Some(fire)
    }

    /// `true` while commanded on or blinking.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `true` while the sink is at the active level.
    #[must_use]
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Level most recently written to the sink.
    #[must_use]
    pub fn level(&self) -> Level {
        self.polarity.level_for(self.lit)
    }

    fn drive(&mut self, on: bool) {
        self.lit = on;
        self.sink.write(self.polarity.level_for(on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoopSink;
    use core::cell::Cell;

    fn pin(line: &Cell<Level>) -> impl FnMut(Level) + '_ {
        move |level| line.set(level)
    }

    #[test]
    fn construction_drives_inactive_level() {
        let line = Cell::new(Level::Low);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveLow);
        assert_eq!(line.get(), Level::High);
        assert_eq!(output.level(), Level::High);
        assert!(!output.is_active());

        output.on();
        assert_eq!(output.level(), Level::Low);
        assert_eq!(line.get(), Level::Low);
    }

    #[test]
    fn noop_sink_still_tracks_state() {
        let mut output = TimedOutput::new(NoopSink::new(), Polarity::ActiveHigh);
        output.blink_fast(BlinkCount::Times(1), Millis(0));
        assert!(output.is_lit());
        output.poll(Millis(100));
        assert!(!output.is_active());
        assert_eq!(output.level(), Level::Low);
    }

    #[test]
    fn blink_three_times_ends_off() {
        let line = Cell::new(Level::Low);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveHigh);
        output.blink(BlinkCount::Times(3), Duration::from_millis(100), Millis(0));
        assert_eq!(line.get(), Level::High);

        let mut transitions = 1;
        let mut previous = line.get();
        for step in 1..=10 {
            output.poll(Millis(step * 100));
            if line.get() != previous {
                transitions += 1;
                previous = line.get();
            }
        }
        assert_eq!(transitions, 6);
        assert_eq!(line.get(), Level::Low);
        assert!(!output.is_active());
    }

    #[test]
    fn forever_blink_runs_until_off() {
        let line = Cell::new(Level::Low);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveHigh);
        output.blink_fast(BlinkCount::Forever, Millis(0));

        for step in 1..=1_000 {
            assert!(output.poll(Millis(step * 100)).is_some());
        }
        assert!(output.is_active());

        output.off();
        assert_eq!(line.get(), Level::Low);
        assert_eq!(output.poll(Millis(200_000)), None);
    }

    #[test]
    fn timed_on_switches_off_after_duration() {
        let line = Cell::new(Level::Low);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveHigh);
        output.on_for(Duration::from_millis(250), Millis(1_000));
        assert!(output.is_lit());

        output.poll(Millis(1_249));
        assert!(output.is_lit());
        output.poll(Millis(1_250));
        assert!(!output.is_lit());
        assert!(!output.is_active());
    }

    #[test]
    fn zero_duration_means_stay_on() {
        let line = Cell::new(Level::High);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveLow);
        output.on_for(Duration::ZERO, Millis(0));
        assert_eq!(line.get(), Level::Low);
        assert_eq!(output.poll(Millis(60_000)), None);
        assert!(output.is_active());
    }

    #[test]
    fn toggle_and_on_cancel_blinking() {
        let line = Cell::new(Level::Low);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveHigh);
        output.blink_slow(BlinkCount::Times(2), Millis(0));
        output.on();
        assert_eq!(output.poll(Millis(1_000)), None);
        assert!(output.is_lit());

        output.toggle();
        assert!(!output.is_active());
        output.toggle();
        assert!(output.is_active());
    }

    #[test]
    fn zero_blinks_turns_output_off() {
        let line = Cell::new(Level::Low);
        let mut output = TimedOutput::new(pin(&line), Polarity::ActiveHigh);
        output.on();
        output.blink(BlinkCount::Times(0), BLINK_FAST, Millis(0));
        assert!(!output.is_active());
        assert_eq!(line.get(), Level::Low);
    }
}
