//! Wall-clock anchoring for timer tasks.
//!
//! Timer tasks capture the wall clock once and advance it with the tokio
//! clock afterwards. Delays stay phase-aligned to real seconds in
//! production, and the whole thing runs deterministically under
//! `tokio::time::pause` in tests.

use chrono::Utc;
use tokio::time::Instant;

/// Milliseconds since the epoch, from the system clock.
pub(crate) fn wall_now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A wall-clock reading tied to the tokio clock at capture time.
#[derive(Debug, Clone)]
pub(crate) struct Anchor {
    wall_ms: i64,
    captured: Instant,
}

impl Anchor {
    /// Capture the current wall clock. Must be called on a runtime.
    pub(crate) fn new() -> Self {
        Self {
            wall_ms: wall_now_ms(),
            captured: Instant::now(),
        }
    }

    /// An anchor starting from a fixed wall-clock reading. Test seam.
    #[cfg(test)]
    pub(crate) fn at(wall_ms: i64) -> Self {
        Self {
            wall_ms,
            captured: Instant::now(),
        }
    }

    /// Current wall-clock estimate in epoch milliseconds.
    pub(crate) fn now_ms(&self) -> i64 {
        self.wall_ms + self.captured.elapsed().as_millis() as i64
    }
}
