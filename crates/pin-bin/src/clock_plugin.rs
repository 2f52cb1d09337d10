//! Built-in clock widget, registered and auto-started at boot so the
//! plugin runtime has at least one live worker out of the box.

use pin_plugin::{PluginCallbacks, PluginContext, PluginError};
use std::time::{SystemTime, UNIX_EPOCH};

pub const NAME: &str = "clock";

#[derive(Default)]
pub struct ClockPlugin;

impl PluginCallbacks for ClockPlugin {
    fn init(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let hh = (secs / 3600) % 24;
        let mm = (secs / 60) % 60;
        ctx.host.update_content(&format!("{hh:02}:{mm:02}"));
        Ok(())
    }
}
