//! The OTA update engine: manifest check, a streaming install worker
//! with cooperative cancellation, and rollback/validation of the running
//! image. Shares `pin_plugin::worker`'s `Arc`-owned, `tokio::spawn`-based
//! background task shape.

use crate::error::OtaError;
use crate::slots::{SlotValidity, UpdateSlots};
use crate::transport::OtaTransport;
use crate::types::{OtaConfig, OtaState, OtaStats, UpdateManifestSummary};
use crate::version::is_newer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const DOWNLOAD_CHUNK_BYTES: u64 = 512;

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

pub struct OtaEngine<T: OtaTransport + 'static, S: UpdateSlots + 'static> {
    transport: Arc<T>,
    slots: Arc<S>,
    config: Mutex<OtaConfig>,
    state: Mutex<OtaState>,
    stats: Mutex<OtaStats>,
    manifest_url: Mutex<Option<String>>,
    firmware_url: Mutex<Option<String>>,
    cancel_flag: Arc<AtomicBool>,
    in_progress: Arc<AtomicBool>,
}

impl<T: OtaTransport + 'static, S: UpdateSlots + 'static> OtaEngine<T, S> {
    /// Boot-time initialization: a pending-verify running image is
    /// equivalent to a successful boot and is marked valid immediately.
    pub fn init(transport: Arc<T>, slots: Arc<S>) -> Result<Self, OtaError> {
        if slots.running_slot_validity() == SlotValidity::PendingVerify {
            slots.mark_valid()?;
        }
        let current_version = slots.current_version();
        Ok(Self {
            transport,
            slots,
            config: Mutex::new(OtaConfig::default()),
            state: Mutex::new(OtaState::Idle),
            stats: Mutex::new(OtaStats { current_version, ..OtaStats::default() }),
            manifest_url: Mutex::new(None),
            firmware_url: Mutex::new(None),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            in_progress: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> OtaState {
        *self.state.lock().expect("ota state lock poisoned")
    }

    pub fn stats(&self) -> OtaStats {
        self.stats.lock().expect("ota stats lock poisoned").clone()
    }

    pub fn set_auto_check_interval(&self, hours: u32) {
        self.config.lock().expect("ota config lock poisoned").auto_check_interval_hours = hours;
    }

    pub fn auto_check_interval_hours(&self) -> u32 {
        self.config.lock().expect("ota config lock poisoned").auto_check_interval_hours
    }

    pub fn check_update(&self, url: &str) -> Result<(), OtaError> {
        *self.state.lock().expect("ota state lock poisoned") = OtaState::Checking;
        let manifest = self.transport.fetch_manifest(url)?;
        let asset = manifest.firmware_asset().ok_or(OtaError::AssetMissing)?.clone();
        let current_version = self.slots.current_version();
        let update_available = is_newer(&manifest.tag_name, &current_version);

        *self.manifest_url.lock().expect("ota manifest lock poisoned") = Some(url.to_string());
        *self.firmware_url.lock().expect("ota firmware lock poisoned") = Some(asset.browser_download_url.clone());

        let mut stats = self.stats.lock().expect("ota stats lock poisoned");
        stats.update_available = update_available;
        stats.available_update = Some(UpdateManifestSummary {
            tag_name: manifest.tag_name,
            download_url: asset.browser_download_url,
            size: asset.size,
        });
        stats.last_check_time = Some(now_ms());
        drop(stats);
        *self.state.lock().expect("ota state lock poisoned") = OtaState::Idle;
        Ok(())
    }

    /// Spawns the streaming install worker. `progress_cb` is invoked with
    /// `(downloaded, total)` after each chunk; `complete_cb` is invoked
    /// exactly once when the worker terminates.
    pub fn start_update<P, C>(self: &Arc<Self>, progress_cb: P, complete_cb: C) -> Result<(), OtaError>
    where
        P: Fn(u64, u64) + Send + Sync + 'static,
        C: Fn(bool) + Send + Sync + 'static,
    {
        let stats = self.stats.lock().expect("ota stats lock poisoned");
        if !stats.update_available {
            return Err(OtaError::InvalidState("no update available".to_string()));
        }
        let size = stats.available_update.as_ref().map(|m| m.size).unwrap_or(0);
        let tag_name = stats.available_update.as_ref().map(|m| m.tag_name.clone()).unwrap_or_default();
        drop(stats);

        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(OtaError::InvalidState("update already in progress".to_string()));
        }
        self.cancel_flag.store(false, Ordering::SeqCst);
        *self.state.lock().expect("ota state lock poisoned") = OtaState::Downloading;

        let firmware_url = self.firmware_url.lock().expect("ota firmware lock poisoned").clone().unwrap_or_default();
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            let result = engine.run_install(&firmware_url, size, &progress_cb).await;
            match result {
                Ok(()) => {
                    *engine.state.lock().expect("ota state lock poisoned") = OtaState::Complete;
                    let _ = engine.slots.commit(tag_name);
                    complete_cb(true);
                    engine.slots.reboot();
                }
                Err(err) => {
                    let mut stats = engine.stats.lock().expect("ota stats lock poisoned");
                    stats.error_message = Some(err.to_string());
                    drop(stats);
                    *engine.state.lock().expect("ota state lock poisoned") = OtaState::Error;
                    complete_cb(false);
                }
            }
            engine.in_progress.store(false, Ordering::SeqCst);
        });
        Ok(())
    }

    async fn run_install(&self, url: &str, total: u64, progress_cb: &(dyn Fn(u64, u64) + Send + Sync)) -> Result<(), OtaError> {
        *self.state.lock().expect("ota state lock poisoned") = OtaState::Downloading;
        let mut downloaded: u64 = 0;
        loop {
            if self.cancel_flag.load(Ordering::SeqCst) {
                return Err(OtaError::Cancelled);
            }
            let chunk = self.transport.fetch_chunk(url, downloaded, DOWNLOAD_CHUNK_BYTES)?;
            if chunk.is_empty() {
                break;
            }
            self.slots.write_chunk(downloaded, &chunk)?;
            downloaded += chunk.len() as u64;
            {
                let mut stats = self.stats.lock().expect("ota stats lock poisoned");
                stats.progress_percent = if total == 0 { 100 } else { ((downloaded * 100) / total).min(100) as u8 };
            }
            progress_cb(downloaded, total);
            tokio::time::sleep(Duration::from_millis(1)).await;
            if downloaded >= total {
                break;
            }
        }
        *self.state.lock().expect("ota state lock poisoned") = OtaState::Installing;
        Ok(())
    }

    pub fn cancel_update(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn rollback(&self) -> Result<(), OtaError> {
        self.slots.mark_invalid()?;
        self.slots.reboot();
        Ok(())
    }

    pub fn mark_valid(&self) -> Result<(), OtaError> {
        self.slots.mark_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::SimulatedSlots;
    use crate::transport::SimulatedTransport;
    use crate::types::{ReleaseAsset, UpdateManifest};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn manifest(tag: &str, size: u64) -> UpdateManifest {
        UpdateManifest {
            tag_name: tag.to_string(),
            body: "notes".to_string(),
            assets: vec![ReleaseAsset {
                name: "pin_firmware.bin".to_string(),
                browser_download_url: "https://example.com/fw".to_string(),
                size,
            }],
        }
    }

    #[test]
    fn init_marks_pending_verify_image_valid() {
        let slots = Arc::new(SimulatedSlots::new("v1.0.0").boot_pending_verify("v1.0.0"));
        assert_eq!(slots.running_slot_validity(), SlotValidity::PendingVerify);
        let engine = OtaEngine::init(Arc::new(SimulatedTransport::new()), Arc::clone(&slots)).unwrap();
        assert_eq!(slots.running_slot_validity(), SlotValidity::Valid);
        assert_eq!(engine.state(), OtaState::Idle);
    }

    #[test]
    fn check_update_flags_available_when_tag_differs() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.set_manifest(manifest("v2.0.0", 10));
        let slots = Arc::new(SimulatedSlots::new("v1.0.0"));
        let engine = OtaEngine::init(transport, slots).unwrap();
        engine.check_update("https://example.com/manifest.json").unwrap();
        assert!(engine.stats().update_available);
        assert_eq!(engine.stats().available_update.unwrap().tag_name, "v2.0.0");
    }

    #[test]
    fn check_update_reports_no_update_when_tag_matches() {
        let transport = Arc::new(SimulatedTransport::new());
        transport.set_manifest(manifest("v1.0.0", 10));
        let slots = Arc::new(SimulatedSlots::new("v1.0.0"));
        let engine = OtaEngine::init(transport, slots).unwrap();
        engine.check_update("https://example.com/manifest.json").unwrap();
        assert!(!engine.stats().update_available);
    }

    #[tokio::test]
    async fn start_update_without_available_update_is_rejected() {
        let engine = Arc::new(OtaEngine::init(Arc::new(SimulatedTransport::new()), Arc::new(SimulatedSlots::new("v1.0.0"))).unwrap());
        let result = engine.start_update(|_, _| {}, |_| {});
        assert!(matches!(result, Err(OtaError::InvalidState(_))));
    }

    #[tokio::test]
    async fn s6_cancel_mid_download_leaves_error_state_and_uncommitted_slot() {
        let transport = Arc::new(SimulatedTransport::new());
        let body = vec![0xAAu8; 10_000];
        transport.set_manifest(manifest("v2.0.0", body.len() as u64));
        transport.set_firmware_body(body);
        let slots = Arc::new(SimulatedSlots::new("v1.0.0"));
        let engine = Arc::new(OtaEngine::init(transport, Arc::clone(&slots)).unwrap());
        engine.check_update("https://example.com/manifest.json").unwrap();

        let completions: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let completions_for_cb = Arc::clone(&completions);
        let last_progress: Arc<AtomicU32> = Arc::new(AtomicU32::new(0));
        let last_progress_for_cb = Arc::clone(&last_progress);

        engine
            .start_update(
                move |downloaded, _total| {
                    last_progress_for_cb.store(downloaded as u32, Ordering::SeqCst);
                },
                move |success| completions_for_cb.lock().unwrap().push(success),
            )
            .unwrap();

        // Wait until roughly 37% has downloaded, then cancel.
        loop {
            if last_progress.load(Ordering::SeqCst) >= 3_700 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        engine.cancel_update();

        for _ in 0..1000 {
            if !completions.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(completions.lock().unwrap().as_slice(), &[false]);
        assert_eq!(engine.state(), OtaState::Error);
        assert_eq!(engine.stats().error_message.as_deref(), Some("cancelled"));
        assert!(!slots.is_committed());
    }
}
