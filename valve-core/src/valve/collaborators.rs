use crate::input::{DebouncedInput, InputEdge};
use crate::io::{DigitalSink, DigitalSource};
use crate::output::TimedOutput;
use crate::time::Millis;

/// Line that energises one direction of the valve motor.
pub trait Actuator {
    fn on(&mut self);
    fn off(&mut self);
    fn is_active(&self) -> bool;
}

/// Limit switch reporting that the valve reached one of its end stops.
pub trait LimitSensor {
    /// Debounced edge observed at `now`, if any.
    fn poll(&mut self, now: Millis) -> Option<InputEdge>;
    /// Undebounced reading, used once at start-up.
    fn is_on_raw(&mut self) -> bool;
    /// Debounced reading.
    fn is_on(&self) -> bool;
}

impl<S: DigitalSink> Actuator for TimedOutput<S> {
    fn on(&mut self) {
        TimedOutput::on(self);
    }

    fn off(&mut self) {
        TimedOutput::off(self);
    }

    fn is_active(&self) -> bool {
        TimedOutput::is_active(self)
    }
}

impl<S: DigitalSource> LimitSensor for DebouncedInput<S> {
    fn poll(&mut self, now: Millis) -> Option<InputEdge> {
        DebouncedInput::poll(self, now)
    }

    fn is_on_raw(&mut self) -> bool {
        DebouncedInput::is_on_raw(self)
    }

    fn is_on(&self) -> bool {
        DebouncedInput::is_on(self)
    }
}
