//! Board wiring and tuning constants.
//!
//! | Signal          | Pin  | Wiring                              |
//! |-----------------|------|-------------------------------------|
//! | Open actuator   | PB3  | push-pull, high energises           |
//! | Close actuator  | PB4  | push-pull, high energises           |
//! | Opened switch   | PA6  | pull-up, switch pulls low at stop   |
//! | Closed switch   | PA7  | pull-up, switch pulls low at stop   |
//! | Push button     | PA0  | pull-up, pressed pulls low          |
//! | Status LED      | PA5  | high lights                         |
//! | Sonar trigger   | PB5  | push-pull                           |
//! | Sonar echo      | PA1  | EXTI1, both edges                   |

use core::time::Duration;

use valve_core::input::InputConfig;
use valve_core::io::Polarity;
use valve_core::valve::ValveConfig;

pub const VALVE: ValveConfig = ValveConfig::new(Duration::from_secs(10), Duration::from_secs(30));

pub const LIMIT_SWITCHES: InputConfig = InputConfig::with_polarity(Polarity::ActiveLow);

pub const BUTTON: InputConfig = InputConfig::new(
    Polarity::ActiveLow,
    Duration::from_millis(20),
    Duration::from_millis(2_000),
);

pub const ACTUATOR_POLARITY: Polarity = Polarity::ActiveHigh;
pub const LED_POLARITY: Polarity = Polarity::ActiveHigh;

/// Control loop period.
pub const CONTROL_TICK: embassy_time::Duration = embassy_time::Duration::from_millis(1);

pub const SONAR_RATE_HZ: u16 = 10;
/// Median window applied to distance readings.
pub const SONAR_SAMPLES: usize = 5;
pub const TRIGGER_PULSE: embassy_time::Duration = embassy_time::Duration::from_micros(10);
/// Longest the echo watcher waits for a falling edge.
pub const ECHO_TIMEOUT: embassy_time::Duration = embassy_time::Duration::from_millis(30);

/// Control loop iterations per profiler report.
pub const PROFILE_WINDOW: u32 = 10_000;
