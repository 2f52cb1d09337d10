//! One cooperative worker per enabled plugin. Workers never preempt each
//! other on the panel; any panel-touching host-API call is expected to go
//! through the display service mutex on the caller's side.

use crate::callbacks::{HostApi, PluginCallbacks, PluginContext};
use crate::error::PluginError;
use crate::registry::Registry;
use crate::types::{PluginState, SUSPENSION_COOLDOWN};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Spawns the worker loop for `name`. `callbacks` and `host` are boxed so
/// the task is `'static`; the loop exits when the plugin is disabled, is
/// removed from the registry, or reaches `Error`.
pub fn spawn_worker(
    registry: Arc<Registry>,
    name: String,
    mut callbacks: Box<dyn PluginCallbacks>,
    host: Arc<dyn HostApi>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if !registry.is_enabled(&name) {
                tracing::info!(target: "plugin", plugin = %name, "worker exiting, plugin disabled");
                return;
            }

            let now = now_ms();
            let runnable = match registry.with_entry(&name, |entry| {
                if entry.runtime.state == PluginState::Suspended {
                    entry.runtime.maybe_resume(now)
                } else {
                    matches!(entry.runtime.state, PluginState::Running | PluginState::Initialized)
                }
            }) {
                Ok(v) => v,
                Err(PluginError::NotFound(_)) => return,
                Err(_) => false,
            };

            if !runnable {
                tokio::time::sleep(SUSPENSION_COOLDOWN).await;
                continue;
            }

            let (region, carried_stats) = match registry.with_entry(&name, |e| (e.region, e.stats)) {
                Ok(v) => v,
                Err(_) => return,
            };
            let mut ctx = PluginContext::new(name.clone(), region, host.as_ref());
            ctx.stats = carried_stats;
            let result = callbacks.update(&mut ctx);

            let should_exit = registry
                .with_entry(&name, |entry| {
                    entry.stats = ctx.stats;
                    match &result {
                        Ok(()) => {
                            entry.runtime.record_success();
                            entry.stats.update_count += 1;
                        }
                        Err(_) => {
                            entry.runtime.record_error();
                            entry.stats.error_count += 1;
                        }
                    }
                    entry.runtime.state == PluginState::Error
                })
                .unwrap_or(true);

            if should_exit {
                tracing::warn!(target: "plugin", plugin = %name, "worker exiting, error budget exhausted");
                return;
            }

            let interval = registry
                .with_entry(&name, |e| e.config.update_interval_secs)
                .unwrap_or(1);
            tokio::time::sleep(Duration::from_secs(interval as u64)).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::AllowList;
    use crate::bus::EventBus;
    use crate::dispatch::PluginHostHandle;
    use crate::types::{PluginConfig, PluginMetadata, WidgetRegion};
    use pin_config::MemoryKvStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailNTimes {
        calls: Arc<AtomicU32>,
        fail_until: u32,
    }

    impl PluginCallbacks for FailNTimes {
        fn init(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        fn update(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_until {
                Err(PluginError::InvalidArgument("synthetic failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn worker_exits_after_max_errors() {
        let registry = Arc::new(Registry::new());
        registry
            .register(
                PluginMetadata {
                    name: "flaky".to_string(),
                    version: "1.0.0".to_string(),
                    author: String::new(),
                    description: String::new(),
                    homepage: String::new(),
                    min_firmware_version: String::new(),
                },
                PluginConfig {
                    update_interval_secs: 1,
                    ..PluginConfig::default()
                },
                WidgetRegion { x: 0, y: 0, w: 10, h: 10 },
            )
            .unwrap();
        registry.set_enabled("flaky", true).unwrap();
        registry
            .with_entry("flaky", |e| {
                e.runtime.mark_initialized().unwrap();
                e.runtime.mark_running().unwrap();
            })
            .unwrap();

        let kv = Arc::new(MemoryKvStore::new());
        let allowlist = Arc::new(AllowList::new(&[]));
        let bus = Arc::new(EventBus::new());
        let host: Arc<dyn HostApi> = Arc::new(PluginHostHandle::new("flaky", registry.clone(), allowlist, kv, bus));
        let calls = Arc::new(AtomicU32::new(0));
        let callbacks = Box::new(FailNTimes { calls: calls.clone(), fail_until: 10 });

        let handle = spawn_worker(registry.clone(), "flaky".to_string(), callbacks, host.clone());

        // Virtual time under `start_paused`: each `update_interval_secs: 1`
        // sleep only elapses once we advance the clock ourselves, so this
        // finishes in milliseconds of real wall time regardless of how many
        // update ticks the error budget takes to exhaust.
        for _ in 0..20 {
            if handle.is_finished() {
                break;
            }
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }
        assert!(handle.is_finished(), "worker should have exited after exhausting its error budget");
        handle.await.unwrap();

        registry.with_entry("flaky", |e| assert_eq!(e.runtime.state, PluginState::Error)).unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 5);
    }
}
