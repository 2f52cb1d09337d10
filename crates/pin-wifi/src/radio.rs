//! The Wi-Fi hardware transport seam, mirroring `pin_bus::PanelBus`'s
//! trait-object split between the real transport and a test double: the
//! FSM drives `dyn WifiRadio` so state-machine tests never touch an
//! actual radio.

use crate::error::WifiError;
use crate::types::LinkStatus;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNetwork {
    pub ssid: String,
    pub rssi: i8,
    pub auth: String,
    pub channel: u8,
}

pub trait WifiRadio: Send + Sync {
    fn mac_address(&self) -> [u8; 6];
    fn start_ap(&self, ssid: &str) -> Result<(), WifiError>;
    fn stop_ap(&self) -> Result<(), WifiError>;
    fn connect(&self, ssid: &str, password: &str) -> Result<(), WifiError>;
    fn disconnect(&self) -> Result<(), WifiError>;
    fn link_status(&self) -> LinkStatus;
    fn scan(&self) -> Result<Vec<ScannedNetwork>, WifiError>;
}

/// In-memory radio for tests: `link_status` is driven by whatever the
/// test last told it to report via `set_link_status`, and every call is
/// tallied for assertions.
pub struct SimulatedRadio {
    mac: [u8; 6],
    status: AtomicU8,
    ap_starts: AtomicU32,
    connect_attempts: AtomicU32,
    last_credentials: Mutex<Option<(String, String)>>,
    scan_results: Mutex<Vec<ScannedNetwork>>,
}

const STATUS_PENDING: u8 = 0;
const STATUS_GOT_IP: u8 = 1;
const STATUS_DISCONNECTED: u8 = 2;

impl SimulatedRadio {
    pub fn new(mac: [u8; 6]) -> Self {
        Self {
            mac,
            status: AtomicU8::new(STATUS_DISCONNECTED),
            ap_starts: AtomicU32::new(0),
            connect_attempts: AtomicU32::new(0),
            last_credentials: Mutex::new(None),
            scan_results: Mutex::new(Vec::new()),
        }
    }

    pub fn set_scan_results(&self, networks: Vec<ScannedNetwork>) {
        *self.scan_results.lock().expect("radio lock poisoned") = networks;
    }

    pub fn set_link_status(&self, status: LinkStatus) {
        let encoded = match status {
            LinkStatus::Pending => STATUS_PENDING,
            LinkStatus::GotIp => STATUS_GOT_IP,
            LinkStatus::Disconnected => STATUS_DISCONNECTED,
        };
        self.status.store(encoded, Ordering::SeqCst);
    }

    pub fn ap_start_count(&self) -> u32 {
        self.ap_starts.load(Ordering::SeqCst)
    }

    pub fn connect_attempt_count(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn last_credentials(&self) -> Option<(String, String)> {
        self.last_credentials.lock().expect("radio lock poisoned").clone()
    }
}

impl WifiRadio for SimulatedRadio {
    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    fn start_ap(&self, _ssid: &str) -> Result<(), WifiError> {
        self.ap_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_ap(&self) -> Result<(), WifiError> {
        Ok(())
    }

    fn connect(&self, ssid: &str, password: &str) -> Result<(), WifiError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_credentials.lock().expect("radio lock poisoned") = Some((ssid.to_string(), password.to_string()));
        self.status.store(STATUS_PENDING, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), WifiError> {
        self.status.store(STATUS_DISCONNECTED, Ordering::SeqCst);
        Ok(())
    }

    fn link_status(&self) -> LinkStatus {
        match self.status.load(Ordering::SeqCst) {
            STATUS_GOT_IP => LinkStatus::GotIp,
            STATUS_DISCONNECTED => LinkStatus::Disconnected,
            _ => LinkStatus::Pending,
        }
    }

    fn scan(&self) -> Result<Vec<ScannedNetwork>, WifiError> {
        Ok(self.scan_results.lock().expect("radio lock poisoned").clone())
    }
}
