//! Adapters between embassy-stm32 pins and the `valve-core` pin traits.

use embassy_stm32::gpio::{Input, Level as PinLevel, Output};
use embassy_time::{Instant, block_for};
use portable_atomic::{AtomicBool, Ordering};

use valve_core::io::{DigitalSink, DigitalSource, Level};
use valve_core::sonar::PingTrigger;
use valve_core::time::{Micros, Millis};

use crate::config;

/// Push-pull output driven through [`DigitalSink`].
pub struct GpioSink(pub Output<'static>);

impl DigitalSink for GpioSink {
    fn write(&mut self, level: Level) {
        self.0.set_level(if level.is_high() {
            PinLevel::High
        } else {
            PinLevel::Low
        });
    }
}

/// Input pin read through [`DigitalSource`].
pub struct GpioSource(pub Input<'static>);

impl DigitalSource for GpioSource {
    fn read(&mut self) -> Level {
        Level::from_high(self.0.is_high())
    }
}

/// Echo line level mirrored by the echo watcher task.
pub struct EchoLevel(pub &'static AtomicBool);

impl DigitalSource for EchoLevel {
    fn read(&mut self) -> Level {
        Level::from_high(self.0.load(Ordering::Acquire))
    }
}

/// Sonar trigger line.
pub struct TriggerPulse(pub Output<'static>);

impl PingTrigger for TriggerPulse {
    fn fire(&mut self) {
        self.0.set_high();
        block_for(config::TRIGGER_PULSE);
        self.0.set_low();
    }
}

// The core counters wrap; only the low 32 bits of the uptime matter.
#[allow(clippy::cast_possible_truncation)]
pub fn now_millis() -> Millis {
    Millis(Instant::now().as_millis() as u32)
}

#[allow(clippy::cast_possible_truncation)]
pub fn now_micros() -> Micros {
    Micros(Instant::now().as_micros() as u32)
}
