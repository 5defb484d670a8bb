use std::time::Duration;

use tokio::time::Instant;

/// Active time carried across pause/resume cycles.
///
/// While running, elapsed is `accumulated + (now - start_instant)`; while
/// paused or idle it is frozen at `accumulated`.
#[derive(Debug, Clone, Default)]
pub struct ElapsedTimeAccumulator {
    start_instant: Option<Instant>,
    accumulated: Duration,
}

impl ElapsedTimeAccumulator {
    pub fn reset(&mut self) {
        self.start_instant = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn resume(&mut self, now: Instant) {
        if self.start_instant.is_none() {
            self.start_instant = Some(now);
        }
    }

    /// Folds the running segment into the carried total and freezes it.
    pub fn pause(&mut self, now: Instant) -> Duration {
        if let Some(start) = self.start_instant.take() {
            self.accumulated += now.saturating_duration_since(start);
        }
        self.accumulated
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.start_instant {
            Some(start) => self.accumulated + now.saturating_duration_since(start),
            None => self.accumulated,
        }
    }
}
