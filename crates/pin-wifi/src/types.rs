//! The Wi-Fi provisioning FSM's data model: eight states, saved
//! credentials, the timers and counters the transition table consults,
//! and a flags bitset for the two external signals (`force_ap`,
//! `config_received`) the portal and caller set.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WifiFsmState {
    Idle,
    CheckSaved,
    ApMode,
    PortalActive,
    Connecting,
    Connected,
    Failed,
    Timeout,
}

impl WifiFsmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WifiFsmState::Idle => "idle",
            WifiFsmState::CheckSaved => "check_saved",
            WifiFsmState::ApMode => "ap_mode",
            WifiFsmState::PortalActive => "portal_active",
            WifiFsmState::Connecting => "connecting",
            WifiFsmState::Connected => "connected",
            WifiFsmState::Failed => "failed",
            WifiFsmState::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WifiFlags: u8 {
        const FORCE_AP         = 0b0000_0001;
        const CONFIG_RECEIVED  = 0b0000_0010;
        const LINK_UP          = 0b0000_0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WifiCounters {
    pub retry_count: u32,
}

/// Monotonic millisecond timestamps the transition table compares
/// against deadlines; advanced externally by `WifiFsm::tick`'s caller
/// supplying wall-clock `now_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WifiTimers {
    pub portal_start_ms: u64,
    pub connecting_since_ms: u64,
    pub wait_until_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiConfig {
    pub max_retry: u32,
    pub connect_timeout: Duration,
    pub config_timeout: Duration,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            max_retry: 3,
            connect_timeout: Duration::from_secs(30),
            config_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Pending,
    GotIp,
    Disconnected,
}
