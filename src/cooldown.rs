//! Per-parameter alert suppression.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ---

/// Gate that suppresses repeat alerts for the same parameter inside a
/// configurable window.
///
/// The key is the parameter name, not the measured value, so repeated
/// breaches of the same parameter are suppressed regardless of magnitude.
/// Check and update happen under a single lock acquisition so two concurrent
/// evaluations of the same parameter cannot both pass the gate.
#[derive(Debug)]
pub struct CooldownTracker {
    // ---
    window: Duration,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl CooldownTracker {
    // ---
    pub fn new(window: Duration) -> Self {
        CooldownTracker {
            window,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Return true iff an alert for `key` is allowed at `now`, recording
    /// `now` as the key's last-sent time when it is.
    ///
    /// A key that has never been sent is always eligible.
    pub fn should_send(&self, key: &str, now: Instant) -> bool {
        // ---
        let mut last_sent = self.last_sent.lock().expect("cooldown lock poisoned");

        match last_sent.get(key) {
            Some(last) if now.duration_since(*last) < self.window => false,
            _ => {
                last_sent.insert(key.to_string(), now);
                true
            }
        }
    }

    /// Clear a key's slot, restoring eligibility.
    ///
    /// Called when a permitted send fails in transport: `should_send` only
    /// returns true when the prior entry was absent or expired, so removing
    /// the entry puts the key back exactly where it was before the attempt.
    pub fn reset(&self, key: &str) {
        // ---
        self.last_sent
            .lock()
            .expect("cooldown lock poisoned")
            .remove(key);
    }
}
