//! Main-loop rate measurement.

use crate::time::Millis;

/// Timing summary over one measurement window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopReport {
    pub calls: u32,
    pub elapsed_ms: u32,
    /// Mean time per call.
    pub average_us: u32,
}

/// Counts loop iterations and reports how long every `calls` of them took.
#[derive(Clone, Debug)]
pub struct LoopProfiler {
    calls: u32,
    repeat: bool,
    // `None` once a one-shot profiler has reported.
    count: Option<u32>,
    started: Millis,
}

impl LoopProfiler {
    /// Reports once after `calls` polls. A zero window is treated as one.
    #[must_use]
    pub const fn once(calls: u32) -> Self {
        Self::new(calls, false)
    }

    /// Reports after every `calls` polls.
    #[must_use]
    pub const fn repeating(calls: u32) -> Self {
        Self::new(calls, true)
    }

    const fn new(calls: u32, repeat: bool) -> Self {
        Self {
            calls: if calls == 0 { 1 } else { calls },
            repeat,
            count: Some(0),
            started: Millis::ZERO,
        }
    }

    /// Call once per loop iteration.
    pub fn poll(&mut self, now: Millis) -> Option<LoopReport> {
        let count = self.count?;
        if count == 0 {
            self.started = now;
        }

        let count = count + 1;
        if count < self.calls {
            self.count = Some(count);
            return None;
        }

        self.count = self.repeat.then_some(0);
        let elapsed_ms = now.elapsed_since(self.started);
        let average_us = u64::from(elapsed_ms) * 1_000 / u64::from(self.calls);
        Some(LoopReport {
            calls: self.calls,
            elapsed_ms,
            average_us: u32::try_from(average_us).unwrap_or(u32::MAX),
        })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.count.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_reports_once() {
        let mut profiler = LoopProfiler::once(4);
        let mut reports = 0;
        for tick in 0..20u32 {
            if let Some(report) = profiler.poll(Millis(100 + tick * 2)) {
                reports += 1;
                assert_eq!(report.calls, 4);
                assert_eq!(report.elapsed_ms, 6);
                assert_eq!(report.average_us, 1_500);
            }
        }
        assert_eq!(reports, 1);
        assert!(profiler.is_finished());
    }

    #[test]
    fn repeating_restarts_window() {
        let mut profiler = LoopProfiler::repeating(2);
        assert_eq!(profiler.poll(Millis(0)), None);
        assert!(profiler.poll(Millis(10)).is_some());
        assert_eq!(profiler.poll(Millis(20)), None);
        let report = profiler.poll(Millis(50)).expect("second window");
        assert_eq!(report.elapsed_ms, 30);
        assert!(!profiler.is_finished());
    }
}
