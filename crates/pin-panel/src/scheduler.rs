//! Refresh-mode policy: decides when a requested refresh must be upgraded
//! to full, and when the display should enter deep sleep.
//!
//! Mirrors the shape of a render scheduler: callers report intent
//! (`mark`), the scheduler folds pending state into a `Decision` on
//! `consume`, and atomic counters track how often each path executed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::RefreshMode;

pub const DEFAULT_PARTIAL_LIMIT: u32 = 10;
pub const DEFAULT_FULL_REFRESH_INTERVAL: Duration = Duration::from_secs(1800);
pub const DEFAULT_SLEEP_AFTER_INACTIVE: Duration = Duration::from_secs(600);

/// The final refresh strategy the façade should execute, which may escalate
/// a requested partial refresh to full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub requested: RefreshMode,
    pub effective: RefreshMode,
}

#[derive(Debug, Default)]
pub struct RefreshPolicyMetrics {
    escalated_partial_limit: AtomicU64,
    escalated_interval: AtomicU64,
    full_requests: AtomicU64,
    partial_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicyMetricsSnapshot {
    pub escalated_partial_limit: u64,
    pub escalated_interval: u64,
    pub full_requests: u64,
    pub partial_requests: u64,
}

impl RefreshPolicyMetrics {
    pub fn snapshot(&self) -> RefreshPolicyMetricsSnapshot {
        RefreshPolicyMetricsSnapshot {
            escalated_partial_limit: self.escalated_partial_limit.load(Ordering::Relaxed),
            escalated_interval: self.escalated_interval.load(Ordering::Relaxed),
            full_requests: self.full_requests.load(Ordering::Relaxed),
            partial_requests: self.partial_requests.load(Ordering::Relaxed),
        }
    }
}

/// Tracks consecutive partial refreshes and elapsed time since the last
/// full refresh, upgrading the next requested refresh to full once either
/// threshold is crossed.
#[derive(Debug)]
pub struct RefreshScheduler {
    partial_limit: u32,
    full_refresh_interval: Duration,
    sleep_after_inactive: Duration,
    consecutive_partials: u32,
    elapsed_since_full: Duration,
    elapsed_since_any_refresh: Duration,
    metrics: RefreshPolicyMetrics,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(
            DEFAULT_PARTIAL_LIMIT,
            DEFAULT_FULL_REFRESH_INTERVAL,
            DEFAULT_SLEEP_AFTER_INACTIVE,
        )
    }
}

impl RefreshScheduler {
    pub fn new(
        partial_limit: u32,
        full_refresh_interval: Duration,
        sleep_after_inactive: Duration,
    ) -> Self {
        Self {
            partial_limit,
            full_refresh_interval,
            sleep_after_inactive,
            consecutive_partials: 0,
            elapsed_since_full: Duration::ZERO,
            elapsed_since_any_refresh: Duration::ZERO,
            metrics: RefreshPolicyMetrics::default(),
        }
    }

    pub fn metrics_snapshot(&self) -> RefreshPolicyMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Advance the internal idle clock. Called by the façade once per tick,
    /// regardless of whether a refresh occurred.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed_since_full += dt;
        self.elapsed_since_any_refresh += dt;
    }

    pub fn should_enter_sleep(&self) -> bool {
        self.elapsed_since_any_refresh >= self.sleep_after_inactive
    }

    /// Fold a caller's requested refresh mode into the effective mode per
    /// policy, updating internal bookkeeping as if the refresh will run.
    pub fn consume(&mut self, requested: RefreshMode) -> Decision {
        match requested {
            RefreshMode::Full => {
                self.metrics.full_requests.fetch_add(1, Ordering::Relaxed);
                self.consecutive_partials = 0;
                self.elapsed_since_full = Duration::ZERO;
                self.elapsed_since_any_refresh = Duration::ZERO;
                Decision {
                    requested,
                    effective: RefreshMode::Full,
                }
            }
            RefreshMode::Partial => {
                self.metrics.partial_requests.fetch_add(1, Ordering::Relaxed);
                let limit_hit = self.consecutive_partials >= self.partial_limit;
                let interval_hit = self.elapsed_since_full >= self.full_refresh_interval;
                let effective = if limit_hit || interval_hit {
                    if limit_hit {
                        self.metrics.escalated_partial_limit.fetch_add(1, Ordering::Relaxed);
                    }
                    if interval_hit {
                        self.metrics.escalated_interval.fetch_add(1, Ordering::Relaxed);
                    }
                    self.consecutive_partials = 0;
                    self.elapsed_since_full = Duration::ZERO;
                    RefreshMode::Full
                } else {
                    self.consecutive_partials += 1;
                    RefreshMode::Partial
                };
                self.elapsed_since_any_refresh = Duration::ZERO;
                Decision {
                    requested,
                    effective,
                }
            }
        }
    }
}
