// Path: crates/telemetry/src/time.rs
use crate::sinks::LedgerMetricsSink;
use std::time::Instant;

/// RAII helper that observes the elapsed duration into a `LedgerMetricsSink`
/// when dropped, regardless of which exit path (`?`, early return, panic
/// unwind) leaves the scope.
pub struct Timer<'a> {
    sink: &'a dyn LedgerMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn LedgerMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_create_duration(self.start.elapsed().as_secs_f64());
    }
}
