use chrono::{DateTime, Utc};
use common::model::generation::GenerationRecord;
use std::time::Duration;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// Skips a regeneration when the previous successful one is recent enough.
///
/// Only the recorded timestamp of the previous run is consulted. Which fields
/// the triggering save touched plays no part, so the result write-back cannot
/// set off another run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    window: Duration,
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        DebouncePolicy::new(DEFAULT_WINDOW)
    }
}

impl DebouncePolicy {
    pub fn new(window: Duration) -> DebouncePolicy {
        DebouncePolicy { window }
    }

    /// True when `previous` succeeded less than one window before `now`.
    ///
    /// A record stamped after `now` counts as fresh; failed runs never do.
    pub fn is_fresh(&self, previous: &GenerationRecord, now: DateTime<Utc>) -> bool {
        let Some(at) = previous.succeeded_at() else {
            return false;
        };
        match (now - at).to_std() {
            Ok(age) => age < self.window,
            Err(_) => true,
        }
    }
}
