//! Wi-Fi provisioning: the captive-portal state machine, its hardware
//! radio seam, encrypted credential persistence, the DNS catch-all, and
//! the portal's HTTP handler functions.

pub mod ap;
pub mod credentials;
pub mod dns;
pub mod error;
pub mod fsm;
pub mod portal;
pub mod radio;
pub mod types;

pub use ap::{format_ap_ssid, is_valid_ap_ssid, AP_IP, AP_NETMASK, AP_SSID_PREFIX};
pub use credentials::{CredentialCipher, XorBase64Cipher};
pub use error::WifiError;
pub use fsm::WifiFsm;
pub use radio::{ScannedNetwork, SimulatedRadio, WifiRadio};
pub use types::{
    LinkStatus, WifiConfig, WifiCounters, WifiCredentials, WifiFlags, WifiFsmState, WifiTimers,
};
