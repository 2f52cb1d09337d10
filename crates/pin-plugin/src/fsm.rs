//! The plugin lifecycle state machine:
//!
//! ```text
//! Unloaded   --register-->            Loaded
//! Loaded     --enable=true, init OK--> Initialized
//! Initialized--start OK-------------->  Running
//! Running    --resource violation----> Suspended
//! Suspended  --cooldown elapsed------> Running
//! Running    --error_count >= MAX----> Error
//! Running    --enable=false, stop----> Loaded
//! Any        --cleanup---------------> Unloaded
//! ```

use crate::error::PluginError;
use crate::types::{PluginRuntime, PluginState, MAX_ERRORS, SUSPENSION_COOLDOWN};

impl PluginRuntime {
    pub fn mark_loaded(&mut self) {
        self.state = PluginState::Loaded;
    }

    pub fn mark_initialized(&mut self) -> Result<(), PluginError> {
        if self.state != PluginState::Loaded {
            return Err(PluginError::InvalidState(format!(
                "init requires Loaded, was {}",
                self.state.as_str()
            )));
        }
        self.state = PluginState::Initialized;
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<(), PluginError> {
        if !matches!(self.state, PluginState::Initialized | PluginState::Suspended) {
            return Err(PluginError::InvalidState(format!(
                "start requires Initialized or Suspended, was {}",
                self.state.as_str()
            )));
        }
        self.state = PluginState::Running;
        Ok(())
    }

    pub fn mark_suspended(&mut self, now_unix_ms: u64) {
        self.state = PluginState::Suspended;
        self.suspended_until_unix_ms = now_unix_ms + SUSPENSION_COOLDOWN.as_millis() as u64;
    }

    /// Returns `true` and transitions back to `Running` once the cooldown
    /// has elapsed; otherwise leaves the plugin `Suspended`.
    pub fn maybe_resume(&mut self, now_unix_ms: u64) -> bool {
        if self.state == PluginState::Suspended && now_unix_ms >= self.suspended_until_unix_ms {
            self.state = PluginState::Running;
            true
        } else {
            false
        }
    }

    /// Records an `update` failure. Transitions to `Error` once
    /// `error_count` reaches `MAX_ERRORS`.
    pub fn record_error(&mut self) {
        self.error_count += 1;
        if self.error_count >= MAX_ERRORS {
            self.state = PluginState::Error;
        }
    }

    pub fn record_success(&mut self) {
        self.error_count = 0;
    }

    pub fn mark_stopped(&mut self) -> Result<(), PluginError> {
        if !matches!(self.state, PluginState::Running | PluginState::Suspended) {
            return Err(PluginError::InvalidState(format!(
                "stop requires Running or Suspended, was {}",
                self.state.as_str()
            )));
        }
        self.state = PluginState::Loaded;
        Ok(())
    }

    pub fn mark_unloaded(&mut self) {
        self.state = PluginState::Unloaded;
        self.error_count = 0;
    }
}
