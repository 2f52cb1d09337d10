//! Serializes all panel access behind one mutex with per-operation
//! deadlines, and owns the refresh-mode policy and statistics.

use crate::panel::{Panel, RefreshMode};
use crate::scheduler::{RefreshPolicyMetricsSnapshot, RefreshScheduler};
use crate::timing::{self, OperationClass};
use pin_bus::PanelBus;
use pin_events::PinError;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

pub struct DisplayService<B: PanelBus> {
    panel: Mutex<Panel<B>>,
    scheduler: Mutex<RefreshScheduler>,
}

/// Held while a caller has exclusive access to the panel. Dropping it
/// releases the mutex; it carries no extra state beyond the guard itself.
pub struct DisplayGuard<'a, B: PanelBus> {
    pub panel: MutexGuard<'a, Panel<B>>,
}

impl<B: PanelBus> DisplayService<B> {
    pub fn new(panel: Panel<B>) -> Self {
        Self {
            panel: Mutex::new(panel),
            scheduler: Mutex::new(RefreshScheduler::default()),
        }
    }

    /// Acquire the panel mutex, bounded by `class`'s deadline.
    pub async fn acquire(&self, class: OperationClass) -> Result<DisplayGuard<'_, B>, PinError> {
        match timeout(class.deadline(), self.panel.lock()).await {
            Ok(guard) => Ok(DisplayGuard { panel: guard }),
            Err(_) => Err(PinError::Timeout("display mutex acquire".to_string())),
        }
    }

    /// Advance the idle clock by `dt`. Called once per supervisor tick.
    pub async fn tick(&self, dt: Duration) {
        self.scheduler.lock().await.advance(dt);
    }

    pub async fn should_enter_sleep(&self) -> bool {
        self.scheduler.lock().await.should_enter_sleep()
    }

    pub async fn refresh_policy_metrics(&self) -> RefreshPolicyMetricsSnapshot {
        self.scheduler.lock().await.metrics_snapshot()
    }

    /// Request a refresh. The scheduler may escalate a `Partial` request to
    /// `Full` per policy; the escalated mode is what actually runs.
    pub async fn refresh(&self, requested: RefreshMode) -> Result<RefreshMode, PinError> {
        let decision = self.scheduler.lock().await.consume(requested);
        let guard = self.acquire(OperationClass::Refresh).await?;
        let mut panel = guard.panel;
        let start = std::time::Instant::now();
        panel.refresh(decision.effective)?;
        timing::record_last_refresh_ns(start.elapsed().as_nanos() as u64);
        Ok(decision.effective)
    }

    /// Clears to `color` and immediately runs a full refresh.
    pub async fn clear(&self, color: crate::Color) -> Result<(), PinError> {
        {
            let guard = self.acquire(OperationClass::Draw).await?;
            let mut panel = guard.panel;
            panel.clear(color);
        }
        self.refresh(RefreshMode::Full).await?;
        Ok(())
    }

    pub async fn sleep(&self) -> Result<(), PinError> {
        let guard = self.acquire(OperationClass::SleepWake).await?;
        let mut panel = guard.panel;
        panel.sleep()
    }

    pub async fn wake(&self) -> Result<(), PinError> {
        let guard = self.acquire(OperationClass::SleepWake).await?;
        let mut panel = guard.panel;
        panel.wake()
    }
}
