use embassy_time::Ticker;

use valve_core::input::{DebouncedInput, InputEdge};
use valve_core::output::TimedOutput;
use valve_core::profiler::LoopProfiler;
use valve_core::sonar::RangingSensor;
use valve_core::telemetry::TransitionLog;
use valve_core::time::Millis;
use valve_core::valve::{ValveController, ValveStatus};

use crate::config;
use crate::hw::{EchoLevel, GpioSink, GpioSource, TriggerPulse, now_micros, now_millis};
use crate::indicator;
use crate::telemetry;

/// Everything the control loop polls.
pub struct Board {
    pub valve: ValveController<TimedOutput<GpioSink>, DebouncedInput<GpioSource>>,
    pub button: DebouncedInput<GpioSource>,
    pub led: TimedOutput<GpioSink>,
    pub sonar: RangingSensor<TriggerPulse, EchoLevel, { config::SONAR_SAMPLES }>,
}

#[embassy_executor::task]
pub async fn run(mut board: Board) -> ! {
    let mut ticker = Ticker::every(config::CONTROL_TICK);
    let mut history: TransitionLog = TransitionLog::new();
    let mut profiler = LoopProfiler::repeating(config::PROFILE_WINDOW);

    indicator::show_status(&mut board.led, board.valve.status(), now_millis());

    loop {
        let now = now_millis();

        // Short press queues the opposite motion, a long press closes at once.
        let before = board.valve.status();
        if let Some(edge) = board.button.poll(now) {
            telemetry::log_button(edge);
            match edge {
                InputEdge::Opened => board.valve.toggle(),
                InputEdge::OpenedLong => board.valve.force_close(now),
                InputEdge::Closed => {}
            }
        }
        let forced = board.valve.status();
        if forced != before {
            note_transition(&mut board.led, &mut history, before, forced, now);
        }

        if let Some(status) = board.valve.poll(now) {
            note_transition(&mut board.led, &mut history, forced, status, now);
        }
        board.led.poll(now);

        board.sonar.poll_with(now_micros(), telemetry::log_distance);

        if let Some(report) = profiler.poll(now) {
            telemetry::log_loop_report(&report);
        }

        ticker.next().await;
    }
}

fn note_transition(
    led: &mut TimedOutput<GpioSink>,
    history: &mut TransitionLog,
    from: ValveStatus,
    to: ValveStatus,
    now: Millis,
) {
    history.record(now, from, to);
    if let Some(entry) = history.latest() {
        telemetry::log_transition(entry);
    }
    indicator::show_status(led, to, now);
}
