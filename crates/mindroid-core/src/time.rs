//! Monotonic time helpers shared by the message queue and promise timeouts.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

/// Milliseconds elapsed since this process's epoch. Not wall-clock time —
/// only ever compared against other values from this function, matching the
/// queue's "absolute monotonic timestamp" contract.
pub fn now_millis() -> u64 {
    epoch().elapsed().as_millis() as u64
}
