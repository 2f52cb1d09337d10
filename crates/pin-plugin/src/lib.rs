//! The plugin runtime: a fixed-capacity registry, the lifecycle state
//! machine, resource quota enforcement (memory and a sliding API-call
//! rate window), the capability-restricted host API, and the per-plugin
//! worker / supervisor concurrency model.

pub mod allowlist;
pub mod bus;
pub mod callbacks;
pub mod dispatch;
pub mod error;
pub mod fsm;
pub mod quota;
pub mod registry;
pub mod supervisor;
pub mod types;
pub mod worker;

pub use allowlist::AllowList;
pub use bus::EventBus;
pub use callbacks::{HostApi, PluginCallbacks, PluginContext, RecordingHostApi};
pub use dispatch::PluginHostHandle;
pub use error::PluginError;
pub use registry::{PluginSummary, Registry};
pub use supervisor::{Supervisor, SupervisorMessage};
pub use types::{
    PluginConfig, PluginFlags, PluginMetadata, PluginRuntime, PluginState, PluginStats, WidgetRegion,
    MAX_ERRORS, MAX_PLUGINS, SUSPENSION_COOLDOWN,
};
pub use worker::spawn_worker;
