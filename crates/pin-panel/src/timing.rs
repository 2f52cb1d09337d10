//! Per-operation deadline table and last-refresh-duration telemetry for
//! the display service façade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static LAST_REFRESH_NS: AtomicU64 = AtomicU64::new(0);

pub fn record_last_refresh_ns(ns: u64) {
    LAST_REFRESH_NS.store(ns, Ordering::Relaxed);
}

pub fn last_refresh_ns() -> u64 {
    LAST_REFRESH_NS.load(Ordering::Relaxed)
}

/// Mutex-acquire deadline by operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Quick,
    Draw,
    SleepWake,
    Refresh,
}

impl OperationClass {
    pub const fn deadline(self) -> Duration {
        match self {
            OperationClass::Quick => Duration::from_millis(100),
            OperationClass::Draw => Duration::from_secs(1),
            OperationClass::SleepWake => Duration::from_secs(5),
            OperationClass::Refresh => Duration::from_secs(30),
        }
    }
}
