//! Burst collapsing for filesystem events.
//!
//! Editor saves arrive as bursts (temp-file writes, atomic renames). A
//! single re-armed deadline collapses each burst into one pending run
//! scheduled a fixed quiet period after the last event.

use std::time::Duration;

use tokio::time::Instant;

/// Single re-armed deadline. At most one deadline is armed at any time;
/// every recorded event cancels and restarts it.
#[derive(Debug)]
pub struct Debounce {
    deadline: Option<Instant>,
    quiet: Duration,
}

impl Debounce {
    /// Create a debouncer with the given quiet period in milliseconds.
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            deadline: None,
            quiet: Duration::from_millis(quiet_ms),
        }
    }

    /// Record an event: arm the deadline, or push an armed one out.
    pub fn record(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    /// Disarm without firing.
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The armed deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
