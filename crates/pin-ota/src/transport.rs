//! The HTTPS transport seam, mirroring `pin_bus::PanelBus` and
//! `pin_wifi::WifiRadio`'s split between the real transport and an
//! in-memory test double.

use crate::error::OtaError;
use crate::types::UpdateManifest;

pub trait OtaTransport: Send + Sync {
    fn fetch_manifest(&self, url: &str) -> Result<UpdateManifest, OtaError>;
    /// Fetches one chunk starting at `offset`, returning fewer than
    /// `chunk_size` bytes only at end of stream.
    fn fetch_chunk(&self, url: &str, offset: u64, chunk_size: u64) -> Result<Vec<u8>, OtaError>;
}

/// In-memory transport for tests: manifests and a firmware image body are
/// preloaded; `fetch_chunk` slices the preloaded body.
pub struct SimulatedTransport {
    manifest: std::sync::Mutex<Option<UpdateManifest>>,
    firmware_body: std::sync::Mutex<Vec<u8>>,
    fail_after_bytes: std::sync::Mutex<Option<u64>>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self {
            manifest: std::sync::Mutex::new(None),
            firmware_body: std::sync::Mutex::new(Vec::new()),
            fail_after_bytes: std::sync::Mutex::new(None),
        }
    }

    pub fn set_manifest(&self, manifest: UpdateManifest) {
        *self.manifest.lock().expect("transport lock poisoned") = Some(manifest);
    }

    pub fn set_firmware_body(&self, body: Vec<u8>) {
        *self.firmware_body.lock().expect("transport lock poisoned") = body;
    }

    pub fn fail_after_bytes(&self, offset: u64) {
        *self.fail_after_bytes.lock().expect("transport lock poisoned") = Some(offset);
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl OtaTransport for SimulatedTransport {
    fn fetch_manifest(&self, _url: &str) -> Result<UpdateManifest, OtaError> {
        self.manifest
            .lock()
            .expect("transport lock poisoned")
            .clone()
            .ok_or_else(|| OtaError::FetchFailed("no manifest loaded".to_string()))
    }

    fn fetch_chunk(&self, _url: &str, offset: u64, chunk_size: u64) -> Result<Vec<u8>, OtaError> {
        if let Some(fail_at) = *self.fail_after_bytes.lock().expect("transport lock poisoned") {
            if offset >= fail_at {
                return Err(OtaError::DownloadFailed("simulated transport failure".to_string()));
            }
        }
        let body = self.firmware_body.lock().expect("transport lock poisoned");
        let start = offset.min(body.len() as u64) as usize;
        let end = (start + chunk_size as usize).min(body.len());
        Ok(body[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReleaseAsset;

    #[test]
    fn fetch_manifest_returns_preloaded_value() {
        let transport = SimulatedTransport::new();
        transport.set_manifest(UpdateManifest {
            tag_name: "v2.0.0".to_string(),
            body: "notes".to_string(),
            assets: vec![ReleaseAsset {
                name: "pin_firmware.bin".to_string(),
                browser_download_url: "https://example.com/fw".to_string(),
                size: 1024,
            }],
        });
        let manifest = transport.fetch_manifest("https://example.com/manifest.json").unwrap();
        assert_eq!(manifest.tag_name, "v2.0.0");
        assert_eq!(manifest.firmware_asset().unwrap().size, 1024);
    }

    #[test]
    fn fetch_chunk_slices_preloaded_body() {
        let transport = SimulatedTransport::new();
        transport.set_firmware_body(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(transport.fetch_chunk("u", 0, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(transport.fetch_chunk("u", 4, 4).unwrap(), vec![5, 6]);
    }
}
