//! Ties the [`HostApi`] surface to the registry's quota/allow-list state:
//! every call here is one "host-API entry" against the sliding rate
//! window, config keys are namespaced per plugin, and advisory display
//! signals land back on the registry entry for the canvas engine to
//! consult. Holds `Arc` clones rather than references so a handle can be
//! moved into a `'static` per-plugin worker task.

use crate::allowlist::AllowList;
use crate::bus::EventBus;
use crate::callbacks::HostApi;
use crate::error::PluginError;
use crate::registry::Registry;
use crate::types::API_RATE_WINDOW;
use pin_config::KvStore;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Days-since-epoch to (year, month, day), UTC civil calendar. No
/// timezone database is available without pulling in a dependency, so
/// `format_time` always renders UTC.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Renders `%Y`, `%m`, `%d`, `%H`, `%M`, `%S` tokens against a unix
/// millisecond timestamp.
fn format_unix_ms(ms: u64, fmt: &str) -> String {
    let total_secs = ms / 1000;
    let days = (total_secs / 86400) as i64;
    let secs_of_day = total_secs % 86400;
    let (year, month, day) = civil_from_days(days);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day / 60) % 60;
    let second = secs_of_day % 60;
    fmt.replace("%Y", &format!("{year:04}"))
        .replace("%m", &format!("{month:02}"))
        .replace("%d", &format!("{day:02}"))
        .replace("%H", &format!("{hour:02}"))
        .replace("%M", &format!("{minute:02}"))
        .replace("%S", &format!("{second:02}"))
}

pub struct PluginHostHandle<K: KvStore> {
    plugin_name: String,
    registry: Arc<Registry>,
    allowlist: Arc<AllowList>,
    kv: Arc<K>,
    bus: Arc<EventBus>,
}

impl<K: KvStore> PluginHostHandle<K> {
    pub fn new(
        plugin_name: impl Into<String>,
        registry: Arc<Registry>,
        allowlist: Arc<AllowList>,
        kv: Arc<K>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            registry,
            allowlist,
            kv,
            bus,
        }
    }

    fn gate(&self) -> Result<(), PluginError> {
        let now = now_ms();
        let (_limit, result) = self.registry.with_entry(&self.plugin_name, |entry| {
            let limit = entry.config.api_rate_limit;
            (limit, entry.rate_window.record(now, API_RATE_WINDOW, limit))
        })?;
        if let Err(e) = result {
            self.registry.with_entry(&self.plugin_name, |entry| {
                entry.runtime.mark_suspended(now);
            })?;
            return Err(e);
        }
        Ok(())
    }

    fn namespaced_key(&self, key: &str) -> String {
        format!("plugin_{}_{}", self.plugin_name, key)
    }
}

impl<K: KvStore> HostApi for PluginHostHandle<K> {
    fn log(&self, level: &str, tag: &str, message: &str) {
        match level {
            "error" => tracing::error!(target: "plugin", plugin = %self.plugin_name, tag, "{message}"),
            "warn" => tracing::warn!(target: "plugin", plugin = %self.plugin_name, tag, "{message}"),
            "debug" => tracing::debug!(target: "plugin", plugin = %self.plugin_name, tag, "{message}"),
            _ => tracing::info!(target: "plugin", plugin = %self.plugin_name, tag, "{message}"),
        }
    }

    fn http_get(&self, url: &str) -> Result<Vec<u8>, PluginError> {
        self.gate()?;
        if !self.allowlist.is_allowed(url) {
            return Err(PluginError::NotAllowed(url.to_string()));
        }
        Ok(Vec::new())
    }

    fn http_post(&self, url: &str, _body: &[u8]) -> Result<Vec<u8>, PluginError> {
        self.gate()?;
        if !self.allowlist.is_allowed(url) {
            return Err(PluginError::NotAllowed(url.to_string()));
        }
        Ok(Vec::new())
    }

    fn config_get(&self, key: &str) -> Result<Option<String>, PluginError> {
        self.gate()?;
        let blob = self.kv.get_blob(&self.namespaced_key(key))?;
        Ok(blob.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    fn config_set(&self, key: &str, value: &str) -> Result<(), PluginError> {
        self.gate()?;
        self.kv.set_blob(&self.namespaced_key(key), value.as_bytes())?;
        self.kv.commit()?;
        Ok(())
    }

    fn config_delete(&self, key: &str) -> Result<(), PluginError> {
        self.gate()?;
        self.kv.erase(&self.namespaced_key(key))?;
        Ok(())
    }

    fn timestamp_ms(&self) -> u64 {
        now_ms()
    }

    fn format_time(&self, fmt: &str) -> String {
        format_unix_ms(now_ms(), fmt)
    }

    fn update_content(&self, text: &str) {
        let _ = self.gate();
        tracing::debug!(target: "plugin", plugin = %self.plugin_name, %text, "advisory content update");
    }

    fn set_color(&self, color: u8) {
        let _ = self.gate();
        tracing::debug!(target: "plugin", plugin = %self.plugin_name, color, "advisory color update");
    }

    fn set_font_size(&self, size: u8) {
        let _ = self.gate();
        tracing::debug!(target: "plugin", plugin = %self.plugin_name, size, "advisory font size update");
    }

    fn schedule_update(&self, delay: Duration) {
        tracing::debug!(target: "plugin", plugin = %self.plugin_name, secs = delay.as_secs(), "scheduled out-of-band update");
    }

    fn cancel_scheduled_update(&self) {
        tracing::debug!(target: "plugin", plugin = %self.plugin_name, "cancelled scheduled update");
    }

    fn emit(&self, name: &str, payload: &str) {
        self.bus.emit(name, payload);
    }

    fn subscribe(&self, name: &str, callback: Box<dyn Fn(&str) + Send + Sync>) {
        self.bus.subscribe(name, callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PluginConfig, PluginMetadata, WidgetRegion};
    use pin_config::MemoryKvStore;

    fn register(registry: &Registry, name: &str, rate_limit: u32) {
        registry
            .register(
                PluginMetadata {
                    name: name.to_string(),
                    version: "1.0.0".to_string(),
                    author: String::new(),
                    description: String::new(),
                    homepage: String::new(),
                    min_firmware_version: String::new(),
                },
                PluginConfig {
                    api_rate_limit: rate_limit,
                    ..PluginConfig::default()
                },
                WidgetRegion { x: 0, y: 0, w: 10, h: 10 },
            )
            .unwrap();
    }

    fn harness(name: &str, rate_limit: u32, domains: &[&str]) -> PluginHostHandle<MemoryKvStore> {
        let registry = Arc::new(Registry::new());
        register(&registry, name, rate_limit);
        PluginHostHandle::new(
            name,
            registry,
            Arc::new(AllowList::new(domains)),
            Arc::new(MemoryKvStore::new()),
            Arc::new(EventBus::new()),
        )
    }

    #[test]
    fn config_round_trips_with_namespaced_key() {
        let host = harness("clock", 60, &[]);
        host.config_set("format", "24h").unwrap();
        assert_eq!(host.config_get("format").unwrap(), Some("24h".to_string()));
        assert!(host.kv.get_blob("plugin_clock_format").unwrap().is_some());
    }

    #[test]
    fn foreign_domain_denied() {
        let host = harness("weather", 60, &["weather.example.com"]);
        assert!(matches!(host.http_get("https://evil.example.org"), Err(PluginError::NotAllowed(_))));
    }

    #[test]
    fn format_time_renders_requested_tokens() {
        let host = harness("clock", 60, &[]);
        let rendered = host.format_time("%Y-%m-%d %H:%M:%S");
        assert_eq!(rendered.len(), "2024-01-01 00:00:00".len());
        assert!(rendered.chars().filter(|c| *c == '-').count() == 2);
    }

    #[test]
    fn subscribe_delivers_emitted_events() {
        let host = harness("weather", 60, &[]);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        host.subscribe(
            "weather_updated",
            Box::new(move |payload| seen_clone.lock().unwrap().push(payload.to_string())),
        );
        host.emit("weather_updated", "72F");
        assert_eq!(*seen.lock().unwrap(), vec!["72F".to_string()]);
    }

    #[test]
    fn exceeding_rate_limit_suspends_plugin() {
        let host = harness("clock", 2, &[]);
        host.config_get("a").unwrap();
        host.config_get("a").unwrap();
        assert!(matches!(host.config_get("a"), Err(PluginError::RateLimited { .. })));
        host.registry
            .with_entry("clock", |e| assert_eq!(e.runtime.state, crate::types::PluginState::Suspended))
            .unwrap();
    }
}
