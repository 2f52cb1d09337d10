//! Captive-portal HTTP handlers. These are plain request/response value
//! functions; wiring them to an actual listener is `pin-http`'s job, the
//! same split `pin-canvas::engine` keeps between domain logic and the
//! framing that carries it over the wire.

use crate::error::WifiError;
use crate::fsm::WifiFsm;
use crate::radio::WifiRadio;
use pin_config::KvStore;
use serde::{Deserialize, Serialize};

pub const REDIRECT_LOCATION: &str = "http://192.168.4.1/config";

#[derive(Debug, Serialize)]
pub struct NetworkDto {
    pub ssid: String,
    pub rssi: i8,
    pub auth: String,
    pub channel: u8,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub networks: Vec<NetworkDto>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: String,
    pub ap_ssid: String,
    pub retry_count: u32,
}

/// `GET /` (or any unmatched GET) redirects to the config page; returns
/// just the Location header value since the HTTP framing lives in
/// `pin-http`.
pub fn handle_root_redirect() -> &'static str {
    REDIRECT_LOCATION
}

pub fn handle_scan<R: WifiRadio, K: KvStore>(fsm: &WifiFsm<R, K>) -> Result<ScanResponse, WifiError> {
    let mut networks = fsm.radio().scan()?;
    networks.sort_by(|a, b| b.rssi.cmp(&a.rssi));
    Ok(ScanResponse {
        networks: networks
            .into_iter()
            .map(|n| NetworkDto { ssid: n.ssid, rssi: n.rssi, auth: n.auth, channel: n.channel })
            .collect(),
    })
}

pub fn handle_connect<R: WifiRadio, K: KvStore>(
    fsm: &mut WifiFsm<R, K>,
    request: ConnectRequest,
) -> Result<ConnectResponse, WifiError> {
    fsm.submit_credentials(request.ssid, request.password)?;
    Ok(ConnectResponse { success: true })
}

pub fn handle_status<R: WifiRadio, K: KvStore>(fsm: &WifiFsm<R, K>) -> StatusResponse {
    StatusResponse {
        state: fsm.state().as_str().to_string(),
        ap_ssid: fsm.ap_ssid().to_string(),
        retry_count: fsm.retry_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::XorBase64Cipher;
    use crate::radio::{ScannedNetwork, SimulatedRadio};
    use crate::types::WifiConfig;
    use pin_config::MemoryKvStore;

    fn fresh() -> WifiFsm<SimulatedRadio, MemoryKvStore> {
        WifiFsm::new(
            SimulatedRadio::new([0, 0, 0, 0, 0x4f, 0x2e]),
            MemoryKvStore::new(),
            Box::new(XorBase64Cipher::default()),
            WifiConfig::default(),
        )
    }

    #[test]
    fn root_redirect_points_at_config_page() {
        assert_eq!(handle_root_redirect(), "http://192.168.4.1/config");
    }

    #[test]
    fn scan_results_sorted_by_descending_rssi() {
        let fsm = fresh();
        fsm.radio().set_scan_results(vec![
            ScannedNetwork { ssid: "weak".to_string(), rssi: -80, auth: "wpa2".to_string(), channel: 6 },
            ScannedNetwork { ssid: "strong".to_string(), rssi: -40, auth: "wpa2".to_string(), channel: 1 },
        ]);
        let response = handle_scan(&fsm).unwrap();
        assert_eq!(response.networks[0].ssid, "strong");
        assert_eq!(response.networks[1].ssid, "weak");
    }

    #[test]
    fn connect_request_stages_credentials_and_reports_success() {
        let mut fsm = fresh();
        let response = handle_connect(&mut fsm, ConnectRequest { ssid: "home".to_string(), password: "secret".to_string() }).unwrap();
        assert!(response.success);
    }

    #[test]
    fn status_reflects_current_fsm_state() {
        let mut fsm = fresh();
        fsm.tick(0).unwrap();
        let status = handle_status(&fsm);
        assert_eq!(status.state, "check_saved");
        assert!(status.ap_ssid.starts_with("Pin-Device-"));
    }
}
