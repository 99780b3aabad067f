//! Motorised valve controller with limit-switch feedback.
//!
//! The valve is driven through two actuator lines (typically the two inputs of
//! an H-bridge) and reports its end positions through two limit switches that
//! close when the valve is fully open or fully closed. The controller enforces
//! two safety windows:
//!
//! * power-on timeout: motion that does not reach a limit switch in time is
//!   cut off and reported as [`ValveStatus::Stalled`];
//! * duty-cycle cooldown: a queued command is only executed once the bridge
//!   has rested since the last power change.
//!
//! Requests made while the valve is busy are held in a single pending slot;
//! newer requests overwrite older ones.

mod collaborators;

use core::fmt;
use core::time::Duration;

use crate::input::InputEdge;
use crate::time::{Identifier, Millis};

pub use collaborators::{Actuator, LimitSensor};

/// Position and motion state of the valve.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValveStatus {
    /// Neither limit switch was active at start-up.
    Unknown,
    Opened,
    Opening,
    Closed,
    Closing,
    /// Motion was cut off by the power-on timeout.
    Stalled,
}

impl ValveStatus {
    /// Returns `true` for the states in which a queued command may run.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, ValveStatus::Opened | ValveStatus::Closed)
    }

    /// Returns `true` while an actuator is energised.
    #[must_use]
    pub const fn is_moving(self) -> bool {
        matches!(self, ValveStatus::Opening | ValveStatus::Closing)
    }

    /// Lowercase name used in logs and on the console.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ValveStatus::Unknown => "unknown",
            ValveStatus::Opened => "opened",
            ValveStatus::Opening => "opening",
            ValveStatus::Closed => "closed",
            ValveStatus::Closing => "closing",
            ValveStatus::Stalled => "stalled",
        }
    }
}

impl fmt::Display for ValveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command waiting for the valve to settle and the cooldown to expire.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingCommand {
    Open,
    Close,
}

impl PendingCommand {
    /// Status the valve enters once the command is executed.
    #[must_use]
    pub const fn motion(self) -> ValveStatus {
        match self {
            PendingCommand::Open => ValveStatus::Opening,
            PendingCommand::Close => ValveStatus::Closing,
        }
    }

    /// Settled status that makes the command a no-op.
    #[must_use]
    pub const fn target(self) -> ValveStatus {
        match self {
            PendingCommand::Open => ValveStatus::Opened,
            PendingCommand::Close => ValveStatus::Closed,
        }
    }
}

impl fmt::Display for PendingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingCommand::Open => f.write_str("open"),
            PendingCommand::Close => f.write_str("close"),
        }
    }
}

/// Safety windows applied by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ValveConfig {
    /// Longest time power stays applied before the motion is declared stalled.
    pub power_on_timeout: Duration,
    /// Minimum rest between a power change and the next queued actuation.
    pub duty_cycle_timeout: Duration,
}

impl ValveConfig {
    #[must_use]
    pub const fn new(power_on_timeout: Duration, duty_cycle_timeout: Duration) -> Self {
        Self {
            power_on_timeout,
            duty_cycle_timeout,
        }
    }
}

impl Default for ValveConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(30))
    }
}

/// Safety-interlocked valve state machine.
///
/// `A` drives the open and close lines, `L` reads the opened and closed limit
/// switches.
pub struct ValveController<A, L> {
    open: A,
    close: A,
    is_opened: L,
    is_closed: L,
    config: ValveConfig,
    status: ValveStatus,
    pending: Option<PendingCommand>,
    last_power_change: Millis,
}

impl<A, L> ValveController<A, L>
where
    A: Actuator,
    L: LimitSensor,
{
    /// Builds a controller, powering the valve off and seeding the status from
    /// the raw limit switch readings.
    ///
    /// The cooldown clock starts already expired so the first queued command
    /// runs on the first poll.
    #[must_use]
    pub fn new(
        open: A,
        close: A,
        mut is_opened: L,
        mut is_closed: L,
        config: ValveConfig,
        now: Millis,
    ) -> Self {
        let status = if is_opened.is_on_raw() {
            ValveStatus::Opened
        } else if is_closed.is_on_raw() {
            ValveStatus::Closed
        } else {
            ValveStatus::Unknown
        };

        let mut controller = Self {
            open,
            close,
            is_opened,
            is_closed,
            config,
            status,
            pending: None,
            last_power_change: now,
        };
        controller.power_off(now);
        controller.last_power_change = now.wrapping_sub(config.duty_cycle_timeout);
        controller
    }

    #[must_use]
    pub fn status(&self) -> ValveStatus {
        self.status
    }

    #[must_use]
    pub fn pending(&self) -> Option<PendingCommand> {
        self.pending
    }

    #[must_use]
    pub fn config(&self) -> ValveConfig {
        self.config
    }

    /// Timestamp of the most recent power-on or power-off.
    #[must_use]
    pub fn last_power_change(&self) -> Millis {
        self.last_power_change
    }

    /// Advances the state machine. Returns the new status if it changed.
    pub fn poll(&mut self, now: Millis) -> Option<ValveStatus> {
        // Both switches are sampled against the same timestamp.
        let opened_edge = self.is_opened.poll(now);
        let closed_edge = self.is_closed.poll(now);
        let previous = self.status;

        match opened_edge {
            Some(InputEdge::Closed) => {
                self.status = ValveStatus::Opened;
                self.power_off(now);
            }
            // Leaving the open stop means the valve is travelling shut.
            Some(InputEdge::Opened | InputEdge::OpenedLong) => self.status = ValveStatus::Closing,
            None => {}
        }

        match closed_edge {
            Some(InputEdge::Closed) => {
                self.status = ValveStatus::Closed;
                self.power_off(now);
            }
            Some(InputEdge::Opened | InputEdge::OpenedLong) => self.status = ValveStatus::Opening,
            None => {}
        }

        // Unknown and Stalled need a forced command to recover.
        if self.status.is_moving() {
            let cutoff = self
                .last_power_change
                .wrapping_add(self.config.power_on_timeout);
            if now.has_reached(cutoff) {
                self.status = ValveStatus::Stalled;
                self.power_off(now);
            }
        } else if self.status.is_settled() {
            let rested = self
                .last_power_change
                .wrapping_add(self.config.duty_cycle_timeout);
            if let (Some(command), true) = (self.pending, now.has_reached(rested)) {
                self.power_on(command, now);
                self.pending = None;
            }
        }

        (self.status != previous).then_some(self.status)
    }

    /// Polls and calls `callback` with the new status and `identifier` on a
    /// change.
    pub fn poll_with<F>(
        &mut self,
        now: Millis,
        identifier: Identifier,
        callback: F,
    ) -> Option<ValveStatus>
    where
        F: FnOnce(ValveStatus, Identifier),
    {
        let change = self.poll(now);
        if let Some(status) = change {
            callback(status, identifier);
        }
        change
    }

    /// Queues an open unless the valve is already open or opening.
    pub fn open(&mut self) {
        if !matches!(self.status, ValveStatus::Opened | ValveStatus::Opening) {
            self.pending = Some(PendingCommand::Open);
        }
    }

    /// Queues a close unless the valve is already closed or closing.
    pub fn close(&mut self) {
        if !matches!(self.status, ValveStatus::Closed | ValveStatus::Closing) {
            self.pending = Some(PendingCommand::Close);
        }
    }

    /// Queues an open if closed, otherwise a close.
    pub fn toggle(&mut self) {
        if self.status == ValveStatus::Closed {
            self.open();
        } else {
            self.close();
        }
    }

    /// Starts opening immediately, ignoring both safety windows, and drops any
    /// queued command.
    pub fn force_open(&mut self, now: Millis) {
        self.power_on(PendingCommand::Open, now);
        self.pending = None;
    }

    /// Starts closing immediately, ignoring both safety windows, and drops any
    /// queued command.
    pub fn force_close(&mut self, now: Millis) {
        self.power_on(PendingCommand::Close, now);
        self.pending = None;
    }

    /// Consumes the controller, returning `(open, close, is_opened, is_closed)`.
    #[must_use]
    pub fn into_parts(self) -> (A, A, L, L) {
        (self.open, self.close, self.is_opened, self.is_closed)
    }

    fn power_on(&mut self, command: PendingCommand, now: Millis) {
        if self.status == command.target() {
            return;
        }
        match command {
            PendingCommand::Open => {
                self.close.off();
                self.open.on();
            }
            PendingCommand::Close => {
                self.open.off();
                self.close.on();
            }
        }
        self.status = command.motion();
        self.last_power_change = now;
    }

    fn power_off(&mut self, now: Millis) {
        self.open.off();
        self.close.off();
        self.last_power_change = now;
    }
}
