//! Request/response shapes for the HTTP surface that aren't already part
//! of a domain crate's own wire schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize)]
pub struct WifiStatus {
    pub connected: bool,
    pub ssid: Option<String>,
    pub rssi: Option<i8>,
}

#[derive(Debug, Default, Serialize)]
pub struct SystemStatus {
    pub free_heap: u64,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub firmware_version: String,
    pub device_name: String,
    pub battery_voltage: Option<f32>,
    pub battery_percentage: Option<u8>,
    pub wifi: WifiStatus,
    pub system: SystemStatus,
}

#[derive(Debug, Serialize)]
pub struct CanvasSummaryDto {
    pub id: String,
    pub name: String,
    pub modified_time: u32,
}

#[derive(Debug, Serialize)]
pub struct CanvasListResponse {
    pub canvases: Vec<CanvasSummaryDto>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateCanvasRequest {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CanvasIdQuery {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DisplayCanvasRequest {
    pub canvas_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddElementRequest {
    pub canvas_id: String,
    pub element: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SetPluginEnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl Default for OkResponse {
    fn default() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckUpdateResponse {
    pub update_available: bool,
    pub current_version: String,
    pub available_update: Option<pin_ota::UpdateManifestSummary>,
}
