//! Fixed-size plugin registry: up to `MAX_PLUGINS` (8) entries, validated
//! at `register`, and the lookup surface the supervisor and worker tasks
//! use.

use crate::error::PluginError;
use crate::quota::RateWindow;
use crate::types::{PluginConfig, PluginMetadata, PluginRuntime, PluginStats, WidgetRegion, MAX_PLUGINS};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct RegistryEntry {
    pub metadata: PluginMetadata,
    pub config: PluginConfig,
    pub runtime: PluginRuntime,
    pub stats: PluginStats,
    pub rate_window: RateWindow,
    pub region: WidgetRegion,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PluginSummary {
    pub name: String,
    pub version: String,
    pub state: &'static str,
    pub enabled: bool,
}

/// Guards the entry table with a single mutex; registration and lifecycle
/// transitions are infrequent compared to per-plugin update ticks, so a
/// coarse lock is the right tradeoff over per-entry locking.
pub struct Registry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
    enabled: Mutex<HashMap<String, bool>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            enabled: Mutex::new(HashMap::new()),
        }
    }

    /// Validates and registers a plugin descriptor. Rejects empty
    /// `name`/`version`, clamps/defaults `config`, and requires the
    /// registry not already be at `MAX_PLUGINS` capacity or hold a
    /// plugin with the same name.
    pub fn register(&self, metadata: PluginMetadata, config: PluginConfig, region: WidgetRegion) -> Result<(), PluginError> {
        if metadata.name.is_empty() {
            return Err(PluginError::InvalidArgument("plugin name must not be empty".to_string()));
        }
        if metadata.version.is_empty() {
            return Err(PluginError::InvalidArgument("plugin version must not be empty".to_string()));
        }
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        if entries.contains_key(&metadata.name) {
            return Err(PluginError::AlreadyExists(metadata.name));
        }
        if entries.len() >= MAX_PLUGINS {
            return Err(PluginError::Full(MAX_PLUGINS));
        }
        let mut runtime = PluginRuntime::default();
        runtime.mark_loaded();
        let name = metadata.name.clone();
        entries.insert(
            name.clone(),
            RegistryEntry {
                metadata,
                config: config.normalize(),
                runtime,
                stats: PluginStats::default(),
                rate_window: RateWindow::new(0),
                region,
            },
        );
        self.enabled.lock().expect("enabled lock poisoned").insert(name, false);
        Ok(())
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), PluginError> {
        let mut map = self.enabled.lock().expect("enabled lock poisoned");
        if !map.contains_key(name) {
            return Err(PluginError::NotFound(name.to_string()));
        }
        map.insert(name.to_string(), enabled);
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        *self.enabled.lock().expect("enabled lock poisoned").get(name).unwrap_or(&false)
    }

    pub fn with_entry<T>(&self, name: &str, f: impl FnOnce(&mut RegistryEntry) -> T) -> Result<T, PluginError> {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        let entry = entries.get_mut(name).ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        Ok(f(entry))
    }

    pub fn remove(&self, name: &str) -> Result<(), PluginError> {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        entries.remove(name).ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        self.enabled.lock().expect("enabled lock poisoned").remove(name);
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().expect("registry lock poisoned").keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<PluginSummary> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        let enabled = self.enabled.lock().expect("enabled lock poisoned");
        entries
            .values()
            .map(|e| PluginSummary {
                name: e.metadata.name.clone(),
                version: e.metadata.version.clone(),
                state: e.runtime.state.as_str(),
                enabled: *enabled.get(&e.metadata.name).unwrap_or(&false),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str) -> PluginMetadata {
        PluginMetadata {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            author: "a".to_string(),
            description: "d".to_string(),
            homepage: String::new(),
            min_firmware_version: "1.0.0".to_string(),
        }
    }

    fn region() -> WidgetRegion {
        WidgetRegion { x: 0, y: 0, w: 100, h: 50 }
    }

    #[test]
    fn register_rejects_empty_name() {
        let reg = Registry::new();
        let mut m = metadata("");
        m.name = String::new();
        assert!(reg.register(m, PluginConfig::default(), region()).is_err());
    }

    #[test]
    fn register_rejects_duplicate() {
        let reg = Registry::new();
        reg.register(metadata("clock"), PluginConfig::default(), region()).unwrap();
        assert_eq!(
            reg.register(metadata("clock"), PluginConfig::default(), region()),
            Err(PluginError::AlreadyExists("clock".to_string()))
        );
    }

    #[test]
    fn register_enforces_capacity() {
        let reg = Registry::new();
        for i in 0..MAX_PLUGINS {
            reg.register(metadata(&format!("p{i}")), PluginConfig::default(), region()).unwrap();
        }
        assert_eq!(
            reg.register(metadata("overflow"), PluginConfig::default(), region()),
            Err(PluginError::Full(MAX_PLUGINS))
        );
    }

    #[test]
    fn normalize_clamps_zero_interval_and_limits() {
        let reg = Registry::new();
        let config = PluginConfig {
            memory_limit: 0,
            update_interval_secs: 0,
            api_rate_limit: 0,
            auto_start: true,
            persistent: false,
        };
        reg.register(metadata("clock"), config, region()).unwrap();
        reg.with_entry("clock", |e| {
            assert!(e.config.update_interval_secs >= 1);
            assert!(e.config.memory_limit > 0);
            assert!(e.config.api_rate_limit > 0);
        })
        .unwrap();
    }

    #[test]
    fn normalize_clamps_memory_limit_to_ceiling() {
        let reg = Registry::new();
        let config = PluginConfig {
            memory_limit: 10 * 1024 * 1024,
            update_interval_secs: 60,
            api_rate_limit: 100,
            auto_start: true,
            persistent: false,
        };
        reg.register(metadata("clock"), config, region()).unwrap();
        reg.with_entry("clock", |e| {
            assert_eq!(e.config.memory_limit, crate::types::MAX_MEMORY_LIMIT);
        })
        .unwrap();
    }
}
