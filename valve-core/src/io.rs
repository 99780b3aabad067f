//! Pin abstractions shared by the input and output components.
//!
//! Components never touch hardware directly. They read a [`DigitalSource`]
//! and drive a [`DigitalSink`], which the firmware implements over real GPIO
//! and the tests and bench implement over plain memory. Polarity mapping
//! (which electrical level means "on") lives in the components, so sources
//! and sinks only ever deal in electrical [`Level`]s.

use core::cell::Cell;

/// Electrical level of a digital line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Returns the opposite level.
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    /// Converts a boolean "is high" flag into a level.
    #[must_use]
    pub const fn from_high(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }

    /// Returns `true` for [`Level::High`].
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

/// Which electrical level corresponds to the logical "on" state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Line pulled low when on (switch to ground, internal pull-up).
    ActiveLow,
    /// Line driven high when on.
    ActiveHigh,
}

impl Polarity {
    /// Level that represents "on".
    #[must_use]
    pub const fn active_level(self) -> Level {
        match self {
            Polarity::ActiveLow => Level::Low,
            Polarity::ActiveHigh => Level::High,
        }
    }

    /// Level that represents "off".
    #[must_use]
    pub const fn inactive_level(self) -> Level {
        self.active_level().inverted()
    }

    /// Returns `true` when `level` means "on" under this polarity.
    #[must_use]
    pub const fn is_active(self, level: Level) -> bool {
        matches!(
            (self, level),
            (Polarity::ActiveLow, Level::Low) | (Polarity::ActiveHigh, Level::High)
        )
    }

    /// Maps a logical on/off state to the level to drive.
    #[must_use]
    pub const fn level_for(self, on: bool) -> Level {
        if on {
            self.active_level()
        } else {
            self.inactive_level()
        }
    }
}

/// Raw sample source for an input line.
pub trait DigitalSource {
    /// Reads the current electrical level.
    fn read(&mut self) -> Level;
}

/// Output line driven by an actuator component.
pub trait DigitalSink {
    /// Drives the line to `level`.
    fn write(&mut self, level: Level);
}

impl<F> DigitalSource for F
where
    F: FnMut() -> Level,
{
    fn read(&mut self) -> Level {
        self()
    }
}

impl<F> DigitalSink for F
where
    F: FnMut(Level),
{
    fn write(&mut self, level: Level) {
        self(level);
    }
}

/// Sink that discards every write.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSink;

impl NoopSink {
    /// Creates a new no-op sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DigitalSink for NoopSink {
    fn write(&mut self, _: Level) {}
}

/// One bit of a shift-register image held in a shared byte.
///
/// The host loop owns the byte and shifts it out (or in) once per iteration;
/// components only flip or sample their own bit.
#[derive(Copy, Clone, Debug)]
pub struct ShiftBit<'a> {
    image: &'a Cell<u8>,
    bit: u8,
}

impl<'a> ShiftBit<'a> {
    /// Binds bit `bit` (0..=7) of `image`. Indices past 7 wrap into range.
    #[must_use]
    pub const fn new(image: &'a Cell<u8>, bit: u8) -> Self {
        Self {
            image,
            bit: bit & 0x07,
        }
    }

    fn mask(&self) -> u8 {
        1 << self.bit
    }
}

impl DigitalSource for ShiftBit<'_> {
    fn read(&mut self) -> Level {
        Level::from_high(self.image.get() & self.mask() != 0)
    }
}

impl DigitalSink for ShiftBit<'_> {
    fn write(&mut self, level: Level) {
        let image = self.image.get();
        let updated = match level {
            Level::High => image | self.mask(),
            Level::Low => image & !self.mask(),
        };
        self.image.set(updated);
    }
}

/// Default threshold for [`ThresholdSource`]; readings above it are high.
pub const ANALOG_HIGH_THRESHOLD: u16 = 128;

/// Digital view of a pin that can only be sampled through the ADC.
///
/// Some package pins lack a digital input buffer; they still work as switch
/// inputs provided an external pull resistor is fitted.
pub struct ThresholdSource<F> {
    sample: F,
    threshold: u16,
}

impl<F> ThresholdSource<F>
where
    F: FnMut() -> u16,
{
    /// Wraps an analog sampler using [`ANALOG_HIGH_THRESHOLD`].
    #[must_use]
    pub const fn new(sample: F) -> Self {
        Self::with_threshold(sample, ANALOG_HIGH_THRESHOLD)
    }

    /// Wraps an analog sampler with an explicit threshold.
    #[must_use]
    pub const fn with_threshold(sample: F, threshold: u16) -> Self {
        Self { sample, threshold }
    }
}

impl<F> DigitalSource for ThresholdSource<F>
where
    F: FnMut() -> u16,
{
    fn read(&mut self) -> Level {
        Level::from_high((self.sample)() > self.threshold)
    }
}
