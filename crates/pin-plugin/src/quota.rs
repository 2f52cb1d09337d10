//! Resource quota enforcement: memory accounting and a sliding 60s
//! API-call rate window. Each host-API entry checks whether the window
//! has elapsed and, if so, resets the counter and the window start
//! *before* incrementing and checking the limit.

use crate::error::PluginError;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    window_start_ms: u64,
    calls_in_window: u32,
}

impl RateWindow {
    pub fn new(now_ms: u64) -> Self {
        Self {
            window_start_ms: now_ms,
            calls_in_window: 0,
        }
    }

    /// Records one host-API entry at `now_ms`. Returns `RateLimited` if
    /// `limit` is exceeded within the current window; the call still
    /// counts against the window either way, matching "exceeding denies
    /// the call" rather than silently dropping it from accounting.
    pub fn record(&mut self, now_ms: u64, window: Duration, limit: u32) -> Result<(), PluginError> {
        let elapsed = now_ms.saturating_sub(self.window_start_ms);
        if elapsed >= window.as_millis() as u64 {
            self.window_start_ms = now_ms;
            self.calls_in_window = 0;
        }
        self.calls_in_window += 1;
        if self.calls_in_window > limit {
            return Err(PluginError::RateLimited {
                calls: self.calls_in_window,
                limit,
            });
        }
        Ok(())
    }

    pub fn calls_in_window(&self) -> u32 {
        self.calls_in_window
    }
}
