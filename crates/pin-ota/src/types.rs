//! OTA data model: update state, the GitHub-release-compatible manifest
//! shape, and the running configuration.

use serde::{Deserialize, Serialize};

pub const FIRMWARE_ASSET_MARKER: &str = "pin_firmware.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Checking,
    Downloading,
    Installing,
    Complete,
    Error,
}

impl OtaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtaState::Idle => "idle",
            OtaState::Checking => "checking",
            OtaState::Downloading => "downloading",
            OtaState::Installing => "installing",
            OtaState::Complete => "complete",
            OtaState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateManifest {
    pub tag_name: String,
    pub body: String,
    pub assets: Vec<ReleaseAsset>,
}

impl UpdateManifest {
    pub fn firmware_asset(&self) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.contains(FIRMWARE_ASSET_MARKER))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OtaStats {
    pub progress_percent: u8,
    pub current_version: String,
    pub available_update: Option<UpdateManifestSummary>,
    pub update_available: bool,
    pub last_check_time: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateManifestSummary {
    pub tag_name: String,
    pub download_url: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtaConfig {
    /// 0 disables periodic checking.
    pub auto_check_interval_hours: u32,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self { auto_check_interval_hours: 0 }
    }
}
