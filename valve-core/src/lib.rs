#![no_std]

// Polled building blocks for cooperative control loops.
//
// Every component here is driven by a host loop calling `poll(now)` with a
// wrapping millisecond (or microsecond) counter. Nothing blocks, nothing
// allocates, and nothing depends on the Rust standard library, so the same
// code runs in the MCU firmware and in the host-side bench.

pub mod console;
pub mod input;
pub mod io;
pub mod median;
pub mod output;
pub mod profiler;
pub mod sonar;
pub mod telemetry;
pub mod time;
pub mod timer;
pub mod valve;
