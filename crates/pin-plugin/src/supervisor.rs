//! The plugin runtime's single supervisor worker: a bounded queue
//! (capacity 10) carrying enable/disable and config-change
//! requests, processed on a dedicated thread so it never contends with
//! the async per-plugin workers for a tokio executor thread.

use crate::callbacks::PluginCallbacks;
use crate::registry::Registry;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

pub const SUPERVISOR_QUEUE_CAPACITY: usize = 10;

pub enum SupervisorMessage {
    Enable(String),
    Disable(String),
    ConfigChanged { name: String, key: String },
    Shutdown,
}

pub struct Supervisor {
    tx: Sender<SupervisorMessage>,
}

impl Supervisor {
    /// Spawns the supervisor thread. `on_config_changed` is invoked with
    /// the plugin name and key whenever a `ConfigChanged` message arrives,
    /// so the caller can route it to that plugin's own `config_changed`
    /// callback without the supervisor knowing about `dyn PluginCallbacks`
    /// storage directly.
    pub fn spawn(
        registry: Arc<Registry>,
        on_config_changed: impl Fn(&str, &str) + Send + 'static,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx): (Sender<SupervisorMessage>, Receiver<SupervisorMessage>) = bounded(SUPERVISOR_QUEUE_CAPACITY);
        let handle = std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    SupervisorMessage::Enable(name) => {
                        if let Err(e) = registry.set_enabled(&name, true) {
                            tracing::warn!(target: "plugin.supervisor", plugin = %name, error = %e, "enable failed");
                        }
                    }
                    SupervisorMessage::Disable(name) => {
                        if let Err(e) = registry.set_enabled(&name, false) {
                            tracing::warn!(target: "plugin.supervisor", plugin = %name, error = %e, "disable failed");
                        }
                    }
                    SupervisorMessage::ConfigChanged { name, key } => {
                        on_config_changed(&name, &key);
                    }
                    SupervisorMessage::Shutdown => break,
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn enable(&self, name: impl Into<String>) -> Result<(), crossbeam_channel::SendError<SupervisorMessage>> {
        self.tx.send(SupervisorMessage::Enable(name.into()))
    }

    pub fn disable(&self, name: impl Into<String>) -> Result<(), crossbeam_channel::SendError<SupervisorMessage>> {
        self.tx.send(SupervisorMessage::Disable(name.into()))
    }

    pub fn config_changed(&self, name: impl Into<String>, key: impl Into<String>) -> Result<(), crossbeam_channel::SendError<SupervisorMessage>> {
        self.tx.send(SupervisorMessage::ConfigChanged { name: name.into(), key: key.into() })
    }

    pub fn shutdown(&self) -> Result<(), crossbeam_channel::SendError<SupervisorMessage>> {
        self.tx.send(SupervisorMessage::Shutdown)
    }
}

/// Invokes a registered plugin's `config_changed` callback with a fresh
/// context. Kept free-standing (not a `Supervisor` method) because it
/// needs the `dyn PluginCallbacks` table the supervisor itself doesn't own.
pub fn dispatch_config_changed(
    callbacks: &mut dyn PluginCallbacks,
    ctx: &mut crate::callbacks::PluginContext<'_>,
    key: &str,
) {
    if let Err(e) = callbacks.config_changed(ctx, key) {
        tracing::warn!(target: "plugin.supervisor", error = %e, key, "config_changed callback failed");
    }
}
