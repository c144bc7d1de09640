//! Monotonic write clock.

use std::sync::{Arc, Mutex};

/// Hands out strictly increasing epoch-millisecond timestamps.
///
/// `updated_at` is the sync cursor field: it must never repeat or regress
/// across writes, even when two writes land in the same wall-clock
/// millisecond or the process restarts against an existing database. Each
/// tick is `max(wall_clock, last + 1)`; seeding from the stored
/// `MAX(updated_at)` at open covers the restart case.
#[derive(Clone)]
pub struct WriteClock {
    last: Arc<Mutex<i64>>,
}

impl WriteClock {
    /// A clock that will never emit a value at or below `floor_ms`.
    pub fn seeded(floor_ms: i64) -> Self {
        Self {
            last: Arc::new(Mutex::new(floor_ms)),
        }
    }

    /// Next write timestamp.
    pub fn tick(&self) -> i64 {
        let mut last = self.last.lock().unwrap();
        let now = crate::now_ms();
        *last = now.max(*last + 1);
        *last
    }
}

impl Default for WriteClock {
    fn default() -> Self {
        Self::seeded(0)
    }
}
