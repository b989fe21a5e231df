// Path: crates/telemetry/src/time.rs
use crate::sinks::ObserverMetricsSink;
use std::time::Instant;

/// Records the lifetime of the guard as a report cycle duration on drop.
pub struct CycleTimer<'a> {
    sink: &'a dyn ObserverMetricsSink,
    start: Instant,
}

impl<'a> CycleTimer<'a> {
    /// Starts timing.
    pub fn new(sink: &'a dyn ObserverMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for CycleTimer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_cycle_duration(self.start.elapsed().as_secs_f64());
    }
}
