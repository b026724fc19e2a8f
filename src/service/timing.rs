//! Per-request phase timing, rendered as a `Server-Timing` header.

use std::fmt;
use std::time::{Duration, Instant};

use crate::metrics::ServiceMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Download,
    Transform,
    Upload,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Download => "img-download",
            Phase::Transform => "img-transform",
            Phase::Upload => "img-upload",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered phase durations for one request
#[derive(Debug, Clone, Default)]
pub struct TimingLog {
    entries: Vec<(Phase, Duration)>,
}

impl TimingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        tracing::debug!(phase = %phase, elapsed_ms = elapsed.as_millis() as u64, "Phase finished");
        ServiceMetrics::global().record_phase(phase.as_str(), elapsed.as_secs_f64());
        self.entries.push((phase, elapsed));
    }

    /// Time `started` up to now and record it under `phase`.
    pub fn finish(&mut self, phase: Phase, started: Instant) {
        self.record(phase, started.elapsed());
    }

    pub fn entries(&self) -> &[(Phase, Duration)] {
        &self.entries
    }

    /// `<phase>;dur=<ms>[,<phase>;dur=<ms>]*`, or `None` when nothing was timed.
    pub fn server_timing_header(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .map(|(phase, elapsed)| format!("{};dur={}", phase, elapsed.as_millis()))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
