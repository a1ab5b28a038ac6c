use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Source of the current time.
///
/// A container's LOCKED/UNLOCKED state is a pure function of its stored
/// unlock time against this clock at call time; it is never cached, so a
/// container unlocks by itself once the clock passes the unlock point.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Settable clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Two weeks in seconds, the conventional lock horizon in tests.
pub const TWO_WEEKS: u64 = 14 * 24 * 60 * 60;
