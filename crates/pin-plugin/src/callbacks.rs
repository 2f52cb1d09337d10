//! The two capability-set traits a plugin and its host exchange: the
//! plugin's own lifecycle callbacks, and the host API surface injected
//! into every callback via `&mut PluginContext`. Neither is looked up
//! through thread-local storage — see Open Question 2 in the design
//! notes — both travel as explicit parameters.

use crate::error::PluginError;
use crate::types::{PluginFlags, PluginStats, WidgetRegion};
use std::time::Duration;

/// A registered extension's lifecycle hooks. Only `init` is mandatory;
/// every other method has a no-op default body.
pub trait PluginCallbacks: Send + Sync {
    fn init(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    fn start(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn update(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn render(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn config_changed(&mut self, _ctx: &mut PluginContext, _key: &str) -> Result<(), PluginError> {
        Ok(())
    }

    fn stop(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }
}

/// The complete host surface a plugin sees.
/// A trait object so tests can substitute a `RecordingHostApi`.
pub trait HostApi: Send + Sync {
    fn log(&self, level: &str, tag: &str, message: &str);
    fn http_get(&self, url: &str) -> Result<Vec<u8>, PluginError>;
    fn http_post(&self, url: &str, body: &[u8]) -> Result<Vec<u8>, PluginError>;
    fn config_get(&self, key: &str) -> Result<Option<String>, PluginError>;
    fn config_set(&self, key: &str, value: &str) -> Result<(), PluginError>;
    fn config_delete(&self, key: &str) -> Result<(), PluginError>;
    fn timestamp_ms(&self) -> u64;
    fn format_time(&self, fmt: &str) -> String;
    fn update_content(&self, text: &str);
    fn set_color(&self, color: u8);
    fn set_font_size(&self, size: u8);
    fn schedule_update(&self, delay: Duration);
    fn cancel_scheduled_update(&self);
    fn emit(&self, name: &str, payload: &str);
    fn subscribe(&self, name: &str, callback: Box<dyn Fn(&str) + Send + Sync>);
}

/// Owned by the registry and handed to every callback. Carries the
/// widget region, the host-API handle, live statistics, and suspension
/// flags — never the plugin's own private state.
pub struct PluginContext<'a> {
    pub plugin_name: String,
    pub region: WidgetRegion,
    pub host: &'a dyn HostApi,
    pub stats: PluginStats,
    pub flags: PluginFlags,
}

impl<'a> PluginContext<'a> {
    pub fn new(plugin_name: impl Into<String>, region: WidgetRegion, host: &'a dyn HostApi) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            region,
            host,
            stats: PluginStats::default(),
            flags: PluginFlags::empty(),
        }
    }

    /// Accounts an allocation against `memory_limit`; returns `OutOfMemory`
    /// without mutating `stats.memory_used` on failure.
    pub fn alloc(&mut self, size: u32, memory_limit: u32) -> Result<(), PluginError> {
        let next = self.stats.memory_used.saturating_add(size);
        if next > memory_limit {
            return Err(PluginError::OutOfMemory {
                requested: size,
                limit: memory_limit,
                used: self.stats.memory_used,
            });
        }
        self.stats.memory_used = next;
        if self.stats.memory_used > self.stats.memory_peak {
            self.stats.memory_peak = self.stats.memory_used;
        }
        Ok(())
    }

    pub fn free(&mut self, size: u32) {
        self.stats.memory_used = self.stats.memory_used.saturating_sub(size);
    }
}

/// Host API that records every namespaced config key it touches and
/// every call it receives, without doing any real network or log I/O.
/// Used by tests that need a substitutable host handle.
#[derive(Default)]
pub struct RecordingHostApi {
    pub calls: std::sync::Mutex<Vec<String>>,
    pub config: std::sync::Mutex<std::collections::HashMap<String, String>>,
    pub allowed_domains: Vec<String>,
}

impl RecordingHostApi {
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            config: std::sync::Mutex::new(std::collections::HashMap::new()),
            allowed_domains,
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock poisoned").push(call.into());
    }

    fn domain_allowed(&self, url: &str) -> bool {
        self.allowed_domains.iter().any(|d| url.contains(d.as_str()))
    }
}

impl HostApi for RecordingHostApi {
    fn log(&self, level: &str, tag: &str, message: &str) {
        self.record(format!("log:{level}:{tag}:{message}"));
    }

    fn http_get(&self, url: &str) -> Result<Vec<u8>, PluginError> {
        self.record(format!("http_get:{url}"));
        if !self.domain_allowed(url) {
            return Err(PluginError::NotAllowed(url.to_string()));
        }
        Ok(Vec::new())
    }

    fn http_post(&self, url: &str, _body: &[u8]) -> Result<Vec<u8>, PluginError> {
        self.record(format!("http_post:{url}"));
        if !self.domain_allowed(url) {
            return Err(PluginError::NotAllowed(url.to_string()));
        }
        Ok(Vec::new())
    }

    fn config_get(&self, key: &str) -> Result<Option<String>, PluginError> {
        self.record(format!("config_get:{key}"));
        Ok(self.config.lock().expect("config lock poisoned").get(key).cloned())
    }

    fn config_set(&self, key: &str, value: &str) -> Result<(), PluginError> {
        self.record(format!("config_set:{key}"));
        self.config
            .lock()
            .expect("config lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn config_delete(&self, key: &str) -> Result<(), PluginError> {
        self.record(format!("config_delete:{key}"));
        self.config.lock().expect("config lock poisoned").remove(key);
        Ok(())
    }

    fn timestamp_ms(&self) -> u64 {
        0
    }

    fn format_time(&self, fmt: &str) -> String {
        self.record(format!("format_time:{fmt}"));
        fmt.to_string()
    }

    fn update_content(&self, text: &str) {
        self.record(format!("update_content:{text}"));
    }

    fn set_color(&self, color: u8) {
        self.record(format!("set_color:{color}"));
    }

    fn set_font_size(&self, size: u8) {
        self.record(format!("set_font_size:{size}"));
    }

    fn schedule_update(&self, delay: Duration) {
        self.record(format!("schedule_update:{}", delay.as_secs()));
    }

    fn cancel_scheduled_update(&self) {
        self.record("cancel_scheduled_update");
    }

    fn emit(&self, name: &str, payload: &str) {
        self.record(format!("emit:{name}:{payload}"));
    }

    fn subscribe(&self, name: &str, _callback: Box<dyn Fn(&str) + Send + Sync>) {
        self.record(format!("subscribe:{name}"));
    }
}
