//! Logging helpers for valve events.
//!
//! Every helper has a defmt rendition for the MCU and a stdout rendition for
//! host builds so the control loop can log without caring where it runs.

use valve_core::input::InputEdge;
use valve_core::profiler::LoopReport;
use valve_core::telemetry::Transition;
use valve_core::time::duration_to_millis;

/// Logs a recorded valve transition, including how long the previous state
/// lasted.
pub fn log_transition(entry: &Transition) {
    emit_transition(
        entry.id,
        entry.at.ticks(),
        entry.from.as_str(),
        entry.to.as_str(),
        entry.dwell.map(duration_to_millis),
    );
}

pub fn log_button(edge: InputEdge) {
    emit_event("button", edge_label(edge));
}

pub fn log_distance(distance_cm: u16) {
    emit_distance(distance_cm);
}

pub fn log_loop_report(report: &LoopReport) {
    emit_loop_report(report.calls, report.elapsed_ms, report.average_us);
}

/// The echo line stayed high past the longest valid echo.
pub fn log_echo_timeout() {
    emit_event("sonar", "echo timeout");
}

const fn edge_label(edge: InputEdge) -> &'static str {
    match edge {
        InputEdge::Closed => "pressed",
        InputEdge::Opened => "released",
        InputEdge::OpenedLong => "released-long",
    }
}

#[cfg(target_os = "none")]
fn emit_transition(
    id: u32,
    at_ms: u32,
    from: &'static str,
    to: &'static str,
    dwell_ms: Option<u32>,
) {
    if let Some(dwell) = dwell_ms {
        defmt::info!(
            "telemetry:valve #{} {} -> {} t={}ms after={}ms",
            id,
            from,
            to,
            at_ms,
            dwell
        );
    } else {
        defmt::info!("telemetry:valve #{} {} -> {} t={}ms", id, from, to, at_ms);
    }
}

#[cfg(not(target_os = "none"))]
fn emit_transition(
    id: u32,
    at_ms: u32,
    from: &'static str,
    to: &'static str,
    dwell_ms: Option<u32>,
) {
    if let Some(dwell) = dwell_ms {
        println!("telemetry:valve #{id} {from} -> {to} t={at_ms}ms after={dwell}ms");
    } else {
        println!("telemetry:valve #{id} {from} -> {to} t={at_ms}ms");
    }
}

#[cfg(target_os = "none")]
fn emit_event(source: &'static str, label: &'static str) {
    defmt::info!("telemetry:{} {}", source, label);
}

#[cfg(not(target_os = "none"))]
fn emit_event(source: &'static str, label: &'static str) {
    println!("telemetry:{source} {label}");
}

#[cfg(target_os = "none")]
fn emit_distance(distance_cm: u16) {
    defmt::info!("telemetry:sonar {}cm", distance_cm);
}

#[cfg(not(target_os = "none"))]
fn emit_distance(distance_cm: u16) {
    println!("telemetry:sonar {distance_cm}cm");
}

#[cfg(target_os = "none")]
fn emit_loop_report(calls: u32, elapsed_ms: u32, average_us: u32) {
    defmt::debug!(
        "telemetry:loop {} calls in {}ms avg={}us",
        calls,
        elapsed_ms,
        average_us
    );
}

#[cfg(not(target_os = "none"))]
fn emit_loop_report(calls: u32, elapsed_ms: u32, average_us: u32) {
    println!("telemetry:loop {calls} calls in {elapsed_ms}ms avg={average_us}us");
}
