//! Status LED patterns.

use valve_core::io::DigitalSink;
use valve_core::output::{BlinkCount, TimedOutput};
use valve_core::time::Millis;
use valve_core::valve::ValveStatus;

/// Flashes left on the LED when the valve position cannot be determined.
const UNKNOWN_FLASHES: u8 = 3;

/// Switches the LED to the pattern for `status`.
///
/// Steady on when opened, dark when closed, slow blink while travelling, fast
/// blink once stalled.
pub fn show_status<S: DigitalSink>(led: &mut TimedOutput<S>, status: ValveStatus, now: Millis) {
    match status {
        ValveStatus::Opened => led.on(),
        ValveStatus::Closed => led.off(),
        ValveStatus::Opening | ValveStatus::Closing => led.blink_slow(BlinkCount::Forever, now),
        ValveStatus::Stalled => led.blink_fast(BlinkCount::Forever, now),
        ValveStatus::Unknown => led.blink_fast(BlinkCount::Times(UNKNOWN_FLASHES), now),
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use valve_core::io::{Level, Polarity};
    use valve_core::output::{BLINK_FAST, BLINK_SLOW};
    use valve_core::time::duration_to_millis;

    fn toggles<S: DigitalSink>(led: &mut TimedOutput<S>, until: u32) -> usize {
        (1..=until)
            .filter(|now| led.poll(Millis(*now)).is_some())
            .count()
    }

    #[test]
    fn settled_states_hold_steady() {
        let line = Cell::new(Level::Low);
        let mut led = TimedOutput::new(|level| line.set(level), Polarity::ActiveHigh);

        show_status(&mut led, ValveStatus::Opened, Millis(0));
        assert_eq!(line.get(), Level::High);
        assert_eq!(toggles(&mut led, 5_000), 0);

        show_status(&mut led, ValveStatus::Closed, Millis(0));
        assert_eq!(line.get(), Level::Low);
    }

    #[test]
    fn travel_blinks_slower_than_stall() {
        let line = Cell::new(Level::Low);
        let mut led = TimedOutput::new(|level| line.set(level), Polarity::ActiveHigh);

        show_status(&mut led, ValveStatus::Opening, Millis(0));
        let slow = toggles(&mut led, 10 * duration_to_millis(BLINK_SLOW));
        assert_eq!(slow, 10);

        show_status(&mut led, ValveStatus::Stalled, Millis(0));
        let fast = toggles(&mut led, 10 * duration_to_millis(BLINK_FAST));
        assert_eq!(fast, 10);
        assert!(led.is_active());
    }

    #[test]
    fn unknown_position_flashes_then_goes_dark() {
        let line = Cell::new(Level::Low);
        let mut led = TimedOutput::new(|level| line.set(level), Polarity::ActiveHigh);

        show_status(&mut led, ValveStatus::Unknown, Millis(0));
        toggles(&mut led, 5_000);
        assert!(!led.is_active());
        assert_eq!(line.get(), Level::Low);
    }
}
