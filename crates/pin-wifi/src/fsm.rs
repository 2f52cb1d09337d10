//! The Wi-Fi provisioning state machine. `tick` is pure with respect to
//! time: callers supply `now_ms` so the machine never reads the wall
//! clock itself, keeping it testable without sleeping.

use crate::ap::format_ap_ssid;
use crate::credentials::{self, CredentialCipher};
use crate::error::WifiError;
use crate::radio::WifiRadio;
use crate::types::{LinkStatus, WifiConfig, WifiCounters, WifiCredentials, WifiFlags, WifiFsmState, WifiTimers};
use pin_config::KvStore;

const FAILED_RETRY_DELAY_MS: u64 = 5_000;
const TIMEOUT_COOLDOWN_MS: u64 = 3_000;

pub struct WifiFsm<R: WifiRadio, K: KvStore> {
    radio: R,
    kv: K,
    cipher: Box<dyn CredentialCipher>,
    state: WifiFsmState,
    timers: WifiTimers,
    counters: WifiCounters,
    flags: WifiFlags,
    config: WifiConfig,
    target: Option<WifiCredentials>,
    ap_ssid: String,
}

impl<R: WifiRadio, K: KvStore> WifiFsm<R, K> {
    pub fn new(radio: R, kv: K, cipher: Box<dyn CredentialCipher>, config: WifiConfig) -> Self {
        let ap_ssid = format_ap_ssid(radio.mac_address());
        Self {
            radio,
            kv,
            cipher,
            state: WifiFsmState::Idle,
            timers: WifiTimers::default(),
            counters: WifiCounters::default(),
            flags: WifiFlags::empty(),
            config,
            target: None,
            ap_ssid,
        }
    }

    pub fn state(&self) -> WifiFsmState {
        self.state
    }

    pub fn ap_ssid(&self) -> &str {
        &self.ap_ssid
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn retry_count(&self) -> u32 {
        self.counters.retry_count
    }

    pub fn set_force_ap(&mut self, force: bool) {
        self.flags.set(WifiFlags::FORCE_AP, force);
    }

    /// Called by the portal's connect handler: stages the target
    /// credentials and raises `config_received` for the next tick to see.
    pub fn submit_credentials(&mut self, ssid: String, password: String) -> Result<(), WifiError> {
        if ssid.is_empty() || ssid.len() > 32 {
            return Err(WifiError::InvalidArgument("ssid must be 1-32 bytes".to_string()));
        }
        self.target = Some(WifiCredentials { ssid, password });
        self.flags.insert(WifiFlags::CONFIG_RECEIVED);
        Ok(())
    }

    fn enter_connecting(&mut self, creds: WifiCredentials, now_ms: u64) -> Result<(), WifiError> {
        self.radio.connect(&creds.ssid, &creds.password)?;
        self.target = Some(creds);
        self.timers.connecting_since_ms = now_ms;
        self.state = WifiFsmState::Connecting;
        Ok(())
    }

    pub fn tick(&mut self, now_ms: u64) -> Result<(), WifiError> {
        match self.state {
            WifiFsmState::Idle => {
                self.state = WifiFsmState::CheckSaved;
            }
            WifiFsmState::CheckSaved => {
                let saved = credentials::load(&self.kv, self.cipher.as_ref())?;
                if let Some(creds) = saved {
                    if !self.flags.contains(WifiFlags::FORCE_AP) {
                        self.enter_connecting(creds, now_ms)?;
                        return Ok(());
                    }
                }
                self.state = WifiFsmState::ApMode;
            }
            WifiFsmState::ApMode => {
                self.radio.start_ap(&self.ap_ssid)?;
                self.timers.portal_start_ms = now_ms;
                self.flags.remove(WifiFlags::CONFIG_RECEIVED);
                self.state = WifiFsmState::PortalActive;
            }
            WifiFsmState::PortalActive => {
                if self.flags.contains(WifiFlags::CONFIG_RECEIVED) {
                    self.radio.stop_ap()?;
                    let creds = self.target.clone().expect("config_received implies submit_credentials ran");
                    self.enter_connecting(creds, now_ms)?;
                } else if now_ms.saturating_sub(self.timers.portal_start_ms) > self.config.config_timeout.as_millis() as u64 {
                    self.state = WifiFsmState::Timeout;
                }
            }
            WifiFsmState::Connecting => {
                match self.radio.link_status() {
                    LinkStatus::GotIp => {
                        self.flags.insert(WifiFlags::LINK_UP);
                        self.state = WifiFsmState::Connected;
                    }
                    LinkStatus::Disconnected => {
                        self.state = WifiFsmState::Failed;
                    }
                    LinkStatus::Pending => {
                        if now_ms.saturating_sub(self.timers.connecting_since_ms) > self.config.connect_timeout.as_millis() as u64 {
                            self.state = WifiFsmState::Failed;
                        }
                    }
                }
            }
            WifiFsmState::Connected => {
                if self.flags.contains(WifiFlags::LINK_UP) && self.counters.retry_count != 0 {
                    self.counters.retry_count = 0;
                }
                if let Some(creds) = &self.target {
                    credentials::save(&self.kv, self.cipher.as_ref(), creds)?;
                }
                if self.radio.link_status() != LinkStatus::GotIp {
                    self.flags.remove(WifiFlags::LINK_UP);
                    self.state = WifiFsmState::Connecting;
                    self.timers.connecting_since_ms = now_ms;
                }
            }
            WifiFsmState::Failed => {
                if self.counters.retry_count < self.config.max_retry {
                    if self.timers.wait_until_ms == 0 {
                        self.timers.wait_until_ms = now_ms;
                    } else if now_ms.saturating_sub(self.timers.wait_until_ms) >= FAILED_RETRY_DELAY_MS {
                        self.counters.retry_count += 1;
                        self.timers.wait_until_ms = 0;
                        let creds = self.target.clone().expect("Failed state always has a target");
                        self.enter_connecting(creds, now_ms)?;
                    }
                } else {
                    self.counters.retry_count = 0;
                    self.timers.wait_until_ms = 0;
                    self.state = WifiFsmState::ApMode;
                }
            }
            WifiFsmState::Timeout => {
                if self.timers.wait_until_ms == 0 {
                    self.radio.stop_ap()?;
                    self.timers.wait_until_ms = now_ms;
                } else if now_ms.saturating_sub(self.timers.wait_until_ms) >= TIMEOUT_COOLDOWN_MS {
                    self.timers.wait_until_ms = 0;
                    self.state = WifiFsmState::ApMode;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::XorBase64Cipher;
    use crate::radio::SimulatedRadio;
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
    fn s5_no_saved_credentials_reaches_ap_mode() {
        let mut fsm = fresh();
        fsm.tick(0).unwrap(); // Idle -> CheckSaved
        fsm.tick(0).unwrap(); // CheckSaved -> ApMode (nothing saved)
        assert_eq!(fsm.state(), WifiFsmState::ApMode);
        fsm.tick(0).unwrap(); // ApMode -> PortalActive
        assert_eq!(fsm.state(), WifiFsmState::PortalActive);
        assert!(fsm.ap_ssid().starts_with("Pin-Device-"));
        assert_eq!(fsm.radio.ap_start_count(), 1);
    }

    #[test]
    fn s5_submitting_credentials_drives_to_connected() {
        let mut fsm = fresh();
        fsm.tick(0).unwrap();
        fsm.tick(0).unwrap();
        fsm.tick(0).unwrap(); // PortalActive
        fsm.submit_credentials("home".to_string(), "secret".to_string()).unwrap();
        fsm.tick(1_000).unwrap(); // PortalActive -> Connecting, connect() issued
        assert_eq!(fsm.state(), WifiFsmState::Connecting);
        fsm.radio.set_link_status(LinkStatus::GotIp);
        fsm.tick(1_500).unwrap();
        assert_eq!(fsm.state(), WifiFsmState::Connected);
        assert!(credentials::has_saved_config(&fsm.kv));
    }

    #[test]
    fn portal_timeout_transitions_to_timeout_state() {
        let mut fsm = fresh();
        fsm.tick(0).unwrap();
        fsm.tick(0).unwrap();
        fsm.tick(0).unwrap(); // PortalActive, portal_start_ms = 0
        let past_deadline = fsm.config.config_timeout.as_millis() as u64 + 1;
        fsm.tick(past_deadline).unwrap();
        assert_eq!(fsm.state(), WifiFsmState::Timeout);
    }

    #[test]
    fn connect_failure_retries_then_falls_back_to_ap_mode() {
        let mut fsm = fresh();
        fsm.tick(0).unwrap();
        fsm.tick(0).unwrap();
        fsm.tick(0).unwrap();
        fsm.submit_credentials("home".to_string(), "badpw".to_string()).unwrap();
        fsm.tick(1).unwrap(); // PortalActive -> Connecting, connect() issued
        fsm.radio.set_link_status(LinkStatus::Disconnected);
        fsm.tick(2).unwrap(); // Connecting -> Failed
        assert_eq!(fsm.state(), WifiFsmState::Failed);

        let mut now = 2u64;
        for _ in 0..fsm.config.max_retry {
            fsm.tick(now).unwrap(); // records wait_until_ms
            assert_eq!(fsm.state(), WifiFsmState::Failed);
            now += FAILED_RETRY_DELAY_MS;
            fsm.tick(now).unwrap(); // retry delay elapsed -> Connecting
            assert_eq!(fsm.state(), WifiFsmState::Connecting);
            fsm.radio.set_link_status(LinkStatus::Disconnected);
            now += 1;
            fsm.tick(now).unwrap(); // Connecting -> Failed again
            assert_eq!(fsm.state(), WifiFsmState::Failed);
        }
        fsm.tick(now).unwrap(); // retry budget exhausted -> ApMode
        assert_eq!(fsm.state(), WifiFsmState::ApMode);
        assert_eq!(fsm.counters.retry_count, 0);
    }
}
