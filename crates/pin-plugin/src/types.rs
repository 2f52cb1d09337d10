//! Plugin descriptors and runtime bookkeeping, split into an immutable
//! metadata block, a validated/clamped config block, and a mutable
//! runtime record the registry owns — never the plugin's own code.

use std::time::Duration;

pub const MAX_PLUGINS: usize = 8;
pub const MAX_ERRORS: u32 = 5;
pub const SUSPENSION_COOLDOWN: Duration = Duration::from_secs(60);
pub const MIN_UPDATE_INTERVAL_SECS: u32 = 1;
pub const DEFAULT_MEMORY_LIMIT: u32 = 64 * 1024;
pub const MAX_MEMORY_LIMIT: u32 = 256 * 1024;
pub const DEFAULT_UPDATE_INTERVAL_SECS: u32 = 60;
pub const DEFAULT_API_RATE_LIMIT: u32 = 100;
pub const API_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Immutable once a plugin is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub homepage: String,
    pub min_firmware_version: String,
}

/// Validated and clamped at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginConfig {
    pub memory_limit: u32,
    pub update_interval_secs: u32,
    pub api_rate_limit: u32,
    pub auto_start: bool,
    pub persistent: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            api_rate_limit: DEFAULT_API_RATE_LIMIT,
            auto_start: false,
            persistent: false,
        }
    }
}

impl PluginConfig {
    /// Clamps `update_interval_secs` to the enforced minimum, defaults a
    /// zero `memory_limit`/`api_rate_limit` to the crate defaults, and
    /// clamps `memory_limit` to the enforced ceiling.
    pub fn normalize(mut self) -> Self {
        if self.update_interval_secs < MIN_UPDATE_INTERVAL_SECS {
            self.update_interval_secs = MIN_UPDATE_INTERVAL_SECS;
        }
        if self.memory_limit == 0 {
            self.memory_limit = DEFAULT_MEMORY_LIMIT;
        }
        if self.memory_limit > MAX_MEMORY_LIMIT {
            self.memory_limit = MAX_MEMORY_LIMIT;
        }
        if self.api_rate_limit == 0 {
            self.api_rate_limit = DEFAULT_API_RATE_LIMIT;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Unloaded,
    Loaded,
    Initialized,
    Running,
    Suspended,
    Error,
}

impl PluginState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::Unloaded => "unloaded",
            PluginState::Loaded => "loaded",
            PluginState::Initialized => "initialized",
            PluginState::Running => "running",
            PluginState::Suspended => "suspended",
            PluginState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PluginStats {
    pub memory_used: u32,
    pub memory_peak: u32,
    pub api_calls_count: u32,
    pub update_count: u32,
    pub error_count: u32,
}

/// Mutable state the registry tracks per plugin, separate from the
/// plugin's own instance state — the registry owns this descriptor and
/// its lifecycle, never the plugin's own code.
#[derive(Debug, Clone)]
pub struct PluginRuntime {
    pub state: PluginState,
    pub error_count: u32,
    pub last_update_unix_ms: u64,
    pub suspended_until_unix_ms: u64,
}

impl Default for PluginRuntime {
    fn default() -> Self {
        Self {
            state: PluginState::Unloaded,
            error_count: 0,
            last_update_unix_ms: 0,
            suspended_until_unix_ms: 0,
        }
    }
}

bitflags::bitflags! {
    /// Suspension/scheduling flags carried on [`crate::callbacks::PluginContext`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PluginFlags: u8 {
        const SUSPENDED          = 0b0000_0001;
        const SCHEDULED_UPDATE   = 0b0000_0010;
        const RESOURCE_VIOLATION = 0b0000_0100;
    }
}

/// Per-plugin allocated display rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetRegion {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}
