//! Ultrasonic ranging sensor (HC-SR04 style).
//!
//! A ping is a short pulse on the trigger line. The sensor answers with an
//! echo pulse whose width is the sound round-trip time. The echo edges are
//! timestamped in interrupt context and handed to the polling side through an
//! [`EchoCapture`]; everything else happens in [`RangingSensor::poll`].

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::io::{DigitalSource, Level};
use crate::median::RunningMedianFilter;
use crate::time::Micros;

/// Round-trip microseconds per centimetre of distance.
pub const MICROS_PER_CM: u32 = 58;
/// Furthest distance the sensor is trusted to report.
pub const MAX_DISTANCE_CM: u32 = 500;
/// Longest echo accepted before a ping is abandoned.
pub const MAX_ECHO_US: u32 = MAX_DISTANCE_CM * MICROS_PER_CM;

/// Echo edge timestamps shared between the edge interrupt and the sensor.
///
/// A slot holding zero has not been written since the last ping. Edges are
/// only recorded while a ping is outstanding, and the falling edge is only
/// accepted after a rising one.
pub struct EchoCapture {
    begin: AtomicU32,
    end: AtomicU32,
    armed: AtomicBool,
    claimed: AtomicBool,
}

impl Default for EchoCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoCapture {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            begin: AtomicU32::new(0),
            end: AtomicU32::new(0),
            armed: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
        }
    }

    /// Binds this capture to a single sensor. Returns `None` if another
    /// sensor already holds it.
    #[must_use]
    pub fn claim(&'static self) -> Option<EchoHandle> {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(EchoHandle { capture: self })
    }

    /// `true` while a ping is waiting for its echo.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Interrupt side: echo line went high.
    pub fn record_rise(&self, at: Micros) {
        if self.is_armed() {
            self.begin.store(at.ticks(), Ordering::Release);
        }
    }

    /// Interrupt side: echo line went low. Completes the capture.
    pub fn record_fall(&self, at: Micros) {
        if self.is_armed() && self.begin.load(Ordering::Acquire) != 0 {
            self.end.store(at.ticks(), Ordering::Release);
            self.armed.store(false, Ordering::Release);
        }
    }

    fn reset(&self) {
        self.armed.store(false, Ordering::Release);
        self.begin.store(0, Ordering::Release);
        self.end.store(0, Ordering::Release);
    }
}

/// Exclusive polling-side access to a claimed [`EchoCapture`].
pub struct EchoHandle {
    capture: &'static EchoCapture,
}

impl EchoHandle {
    fn arm(&self) {
        self.capture.reset();
        self.capture.armed.store(true, Ordering::Release);
    }

    fn reset(&self) {
        self.capture.reset();
    }

    fn begin(&self) -> u32 {
        self.capture.begin.load(Ordering::Acquire)
    }

    fn end(&self) -> u32 {
        self.capture.end.load(Ordering::Acquire)
    }
}

/// Board hook that emits the trigger pulse.
pub trait PingTrigger {
    /// Pulses the trigger line (about 10 µs high).
    fn fire(&mut self);
}

impl<F> PingTrigger for F
where
    F: FnMut(),
{
    fn fire(&mut self) {
        self();
    }
}

/// Converts a ping rate to the minimum spacing between pings. Zero means as
/// fast as the sensor answers.
#[must_use]
pub fn ping_interval_us(rate_hz: u16) -> u32 {
    if rate_hz == 0 {
        1
    } else {
        1_000_000 / u32::from(rate_hz)
    }
}

/// Periodic distance measurement, optionally smoothed over `SAMPLES` pings.
pub struct RangingSensor<T, E, const SAMPLES: usize> {
    trigger: T,
    echo: E,
    capture: EchoHandle,
    on: bool,
    sent: bool,
    interval_us: u32,
    last_sent: Micros,
    last_distance: u16,
    filter: RunningMedianFilter<u16, SAMPLES>,
}

impl<T, E, const SAMPLES: usize> RangingSensor<T, E, SAMPLES>
where
    T: PingTrigger,
    E: DigitalSource,
{
    /// Creates a running sensor pinging at `rate_hz`.
    #[must_use]
    pub fn new(trigger: T, echo: E, capture: EchoHandle, rate_hz: u16) -> Self {
        Self {
            trigger,
            echo,
            capture,
            on: true,
            sent: false,
            interval_us: ping_interval_us(rate_hz),
            last_sent: Micros::ZERO,
            last_distance: 0,
            filter: RunningMedianFilter::new(),
        }
    }

    /// Drives the ping cycle. Returns a distance in centimetres when a
    /// measurement completed during this call.
    pub fn poll(&mut self, now: Micros) -> Option<u16> {
        if !self.on {
            return None;
        }

        if !self.sent {
            // A high echo line means the previous ping is still ringing.
            if self.echo.read() == Level::Low
                && now.elapsed_since(self.last_sent) > self.interval_us
            {
                self.send_ping(now);
            }
            return None;
        }

        if now.elapsed_since(self.last_sent) > MAX_ECHO_US {
            self.sent = false;
            self.capture.reset();
            return None;
        }

        let end = self.capture.end();
        if end == 0 {
            return None;
        }
        self.sent = false;

        let begin = self.capture.begin();
        let round_trip = end.wrapping_sub(begin);
        if begin == 0 || round_trip > MAX_ECHO_US {
            return None;
        }

        let mut distance = u16::try_from(round_trip / MICROS_PER_CM).unwrap_or(u16::MAX);
        if SAMPLES > 0 {
            self.filter.insert(distance);
            distance = self.filter.median().unwrap_or(distance);
        }
        self.last_distance = distance;
        Some(distance)
    }

    /// Polls and calls `callback` when the reported distance differs from the
    /// previous one.
    pub fn poll_with<F>(&mut self, now: Micros, callback: F) -> Option<u16>
    where
        F: FnOnce(u16),
    {
        let previous = self.last_distance;
        let distance = self.poll(now);
        if let Some(distance) = distance.filter(|distance| *distance != previous) {
            callback(distance);
        }
        distance
    }

    /// Resumes pinging, optionally at a new rate (`0` keeps the current one).
    pub fn on(&mut self, rate_hz: u16) {
        self.on = true;
        if rate_hz != 0 {
            self.set_rate(rate_hz);
        }
    }

    /// Stops pinging and discards the smoothing window.
    pub fn off(&mut self) {
        self.on = false;
        self.clear();
    }

    pub fn set_rate(&mut self, rate_hz: u16) {
        self.interval_us = ping_interval_us(rate_hz);
    }

    /// Discards the smoothing window.
    pub fn clear(&mut self) {
        self.filter.clear();
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Most recent distance reported by [`poll`](Self::poll).
    #[must_use]
    pub fn last_distance(&self) -> u16 {
        self.last_distance
    }

    fn send_ping(&mut self, now: Micros) {
        self.capture.arm();
        self.sent = true;
        self.trigger.fire();
        self.last_sent = now;
    }
}
