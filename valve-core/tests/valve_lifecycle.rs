use core::cell::Cell;
use core::time::Duration;

use valve_core::input::{DebouncedInput, InputConfig};
use valve_core::io::{DigitalSink, DigitalSource, Level, NoopSink, Polarity, ShiftBit};
use valve_core::output::TimedOutput;
use valve_core::time::Millis;
use valve_core::valve::{PendingCommand, ValveConfig, ValveController, ValveStatus};

const POWER_ON_TIMEOUT: u32 = 10_000;
const DUTY_CYCLE: u32 = 30_000;

#[derive(Copy, Clone)]
struct Pin<'a>(&'a Cell<Level>);

impl DigitalSource for Pin<'_> {
    fn read(&mut self) -> Level {
        self.0.get()
    }
}

impl DigitalSink for Pin<'_> {
    fn write(&mut self, level: Level) {
        self.0.set(level);
    }
}

/// Bench wiring: actuator lines are active high, limit switches pull low.
struct Rig {
    open_line: Cell<Level>,
    close_line: Cell<Level>,
    opened_switch: Cell<Level>,
    closed_switch: Cell<Level>,
}

type Valve<'a> = ValveController<TimedOutput<Pin<'a>>, DebouncedInput<Pin<'a>>>;

impl Rig {
    fn new(opened: bool, closed: bool) -> Self {
        let switch = |active: bool| Cell::new(if active { Level::Low } else { Level::High });
        Self {
            open_line: Cell::new(Level::High),
            close_line: Cell::new(Level::High),
            opened_switch: switch(opened),
            closed_switch: switch(closed),
        }
    }

    fn valve(&self, now: Millis) -> Valve<'_> {
        let config = ValveConfig::new(
            Duration::from_millis(u64::from(POWER_ON_TIMEOUT)),
            Duration::from_millis(u64::from(DUTY_CYCLE)),
        );
        ValveController::new(
            TimedOutput::new(Pin(&self.open_line), Polarity::ActiveHigh),
            TimedOutput::new(Pin(&self.close_line), Polarity::ActiveHigh),
            DebouncedInput::new(Pin(&self.opened_switch), InputConfig::default(), now),
            DebouncedInput::new(Pin(&self.closed_switch), InputConfig::default(), now),
            config,
            now,
        )
    }

    fn lines(&self) -> (Level, Level) {
        (self.open_line.get(), self.close_line.get())
    }

    fn set_opened(&self, active: bool) {
        self.opened_switch.set(Level::from_high(!active));
    }

    fn set_closed(&self, active: bool) {
        self.closed_switch.set(Level::from_high(!active));
    }
}

/// Polls every millisecond in `from..=to`, collecting status changes.
fn run(valve: &mut Valve<'_>, from: u32, to: u32) -> Vec<(u32, ValveStatus)> {
    let mut changes = Vec::new();
    let mut now = from;
    loop {
        if let Some(status) = valve.poll(Millis(now)) {
            changes.push((now, status));
        }
        if now == to {
            break;
        }
        now = now.wrapping_add(1);
    }
    changes
}

#[test]
fn construction_powers_off_both_lines() {
    let rig = Rig::new(false, true);
    let valve = rig.valve(Millis(0));
    assert_eq!(valve.status(), ValveStatus::Closed);
    assert_eq!(rig.lines(), (Level::Low, Level::Low));
}

#[test]
fn forced_open_from_unknown_reaches_open_stop_just_in_time() {
    let rig = Rig::new(false, false);
    let mut valve = rig.valve(Millis(0));
    assert_eq!(valve.status(), ValveStatus::Unknown);

    valve.force_open(Millis(0));
    assert_eq!(valve.status(), ValveStatus::Opening);
    assert_eq!(rig.lines(), (Level::High, Level::Low));

    // Switch settles so the debounced edge lands one tick before the cutoff.
    assert!(run(&mut valve, 1, POWER_ON_TIMEOUT - 7).is_empty());
    rig.set_opened(true);
    let changes = run(&mut valve, POWER_ON_TIMEOUT - 6, POWER_ON_TIMEOUT + 500);

    assert_eq!(changes, vec![(POWER_ON_TIMEOUT - 1, ValveStatus::Opened)]);
    assert_eq!(rig.lines(), (Level::Low, Level::Low));
}

#[test]
fn missing_limit_switch_stalls_the_valve() {
    let rig = Rig::new(false, false);
    let mut valve = rig.valve(Millis(0));
    valve.force_open(Millis(0));

    let changes = run(&mut valve, 1, POWER_ON_TIMEOUT + 1);
    assert_eq!(changes, vec![(POWER_ON_TIMEOUT, ValveStatus::Stalled)]);
    assert_eq!(rig.lines(), (Level::Low, Level::Low));

    // Queued commands wait for a forced recovery.
    valve.close();
    assert!(run(&mut valve, POWER_ON_TIMEOUT + 2, 60_000).is_empty());
    assert_eq!(valve.pending(), Some(PendingCommand::Close));

    valve.force_close(Millis(60_001));
    assert_eq!(valve.status(), ValveStatus::Closing);
    assert_eq!(valve.pending(), None);
}

#[test]
fn latest_request_wins_while_closing() {
    let rig = Rig::new(true, false);
    let mut valve = rig.valve(Millis(0));
    assert_eq!(valve.status(), ValveStatus::Opened);

    valve.force_close(Millis(0));
    valve.close();
    valve.open();
    assert_eq!(valve.pending(), Some(PendingCommand::Open));

    rig.set_opened(false);
    assert!(run(&mut valve, 1, 4_999).is_empty());
    rig.set_closed(true);
    let changes = run(&mut valve, 5_000, 5_000 + DUTY_CYCLE + 100);

    assert_eq!(
        changes,
        vec![
            (5_005, ValveStatus::Closed),
            (5_005 + DUTY_CYCLE, ValveStatus::Opening),
        ]
    );
    assert_eq!(rig.lines(), (Level::High, Level::Low));
    assert_eq!(valve.pending(), None);
}

#[test]
fn timeouts_hold_across_counter_wrap() {
    let start = u32::MAX - 4_000;
    let rig = Rig::new(false, false);
    let mut valve = rig.valve(Millis(start));

    valve.force_close(Millis(start));
    let cutoff = start.wrapping_add(POWER_ON_TIMEOUT);
    assert!(cutoff < start, "deadline should land after the wrap");

    let changes = run(&mut valve, start.wrapping_add(1), cutoff.wrapping_add(10));
    assert_eq!(changes, vec![(cutoff, ValveStatus::Stalled)]);
}

#[test]
fn toggle_follows_limit_switches() {
    let rig = Rig::new(false, true);
    let mut valve = rig.valve(Millis(0));

    valve.toggle();
    assert_eq!(run(&mut valve, 0, 0), vec![(0, ValveStatus::Opening)]);

    // Leaving the closed stop only confirms the direction of travel.
    rig.set_closed(false);
    assert!(run(&mut valve, 1, 50).is_empty());

    rig.set_opened(true);
    let changes = run(&mut valve, 51, 100);
    assert_eq!(changes, vec![(56, ValveStatus::Opened)]);

    valve.toggle();
    assert_eq!(valve.pending(), Some(PendingCommand::Close));
    assert!(run(&mut valve, 101, 30_055).is_empty());
    assert_eq!(run(&mut valve, 30_056, 30_056), vec![(30_056, ValveStatus::Closing)]);
}

#[test]
fn shift_register_wiring_drives_image_bits() {
    let outputs = Cell::new(0u8);
    let inputs = Cell::new(0b0000_0011);
    let active_low = InputConfig::default();

    let mut valve = ValveController::new(
        TimedOutput::new(ShiftBit::new(&outputs, 0), Polarity::ActiveHigh),
        TimedOutput::new(ShiftBit::new(&outputs, 1), Polarity::ActiveHigh),
        DebouncedInput::with_initial(ShiftBit::new(&inputs, 0), active_low, false, Millis(0)),
        DebouncedInput::with_initial(ShiftBit::new(&inputs, 1), active_low, false, Millis(0)),
        ValveConfig::default(),
        Millis(0),
    );
    assert_eq!(valve.status(), ValveStatus::Unknown);

    valve.force_close(Millis(0));
    assert_eq!(outputs.get(), 0b0000_0010);

    // Closed switch (bit 1) pulls low.
    inputs.set(0b0000_0001);
    assert_eq!(valve.poll(Millis(1)), None);
    assert_eq!(valve.poll(Millis(6)), Some(ValveStatus::Closed));
    assert_eq!(outputs.get(), 0);
}

#[test]
fn boot_glitch_on_limit_switch_is_ignored() {
    let rig = Rig::new(true, false);
    let mut valve = rig.valve(Millis(0));
    assert_eq!(valve.status(), ValveStatus::Opened);

    rig.set_opened(false);
    assert!(run(&mut valve, 1, 1).is_empty());
    rig.set_opened(true);
    assert!(run(&mut valve, 2, 1_000).is_empty());
    assert_eq!(valve.status(), ValveStatus::Opened);
    assert_eq!(rig.lines(), (Level::Low, Level::Low));
}

#[test]
fn controller_hands_back_its_parts() {
    let rig = Rig::new(false, true);
    let config = ValveConfig::new(Duration::from_secs(2), Duration::from_secs(4));
    let mut valve = ValveController::new(
        TimedOutput::new(NoopSink::new(), Polarity::ActiveHigh),
        TimedOutput::new(NoopSink::new(), Polarity::ActiveHigh),
        DebouncedInput::new(Pin(&rig.opened_switch), InputConfig::default(), Millis(0)),
        DebouncedInput::new(Pin(&rig.closed_switch), InputConfig::default(), Millis(0)),
        config,
        Millis(0),
    );
    assert_eq!(valve.config(), config);
    assert!(valve.status().is_settled());

    valve.force_open(Millis(0));
    assert!(valve.status().is_moving());
    assert_eq!(valve.last_power_change(), Millis(0));

    let (open, close, is_opened, is_closed) = valve.into_parts();
    assert!(open.is_active());
    assert!(!close.is_active());
    assert!(!is_opened.is_on());
    assert!(is_closed.is_on());
}
