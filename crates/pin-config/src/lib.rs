//! Persistent key/value storage contract and device configuration loading.
//!
//! The firmware core never talks to flash or a filesystem directly; every
//! subsystem that needs to persist something (canvases, images, Wi-Fi
//! credentials, plugin config) goes through the four-operation `KvStore`
//! contract below. `pin-bin` wires a real implementation at boot; tests and
//! the simulator use [`MemoryKvStore`] or [`FileKvStore`].

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

pub mod error;
pub use error::ConfigError;

/// Persistence contract every subsystem stores through. Namespacing
/// (`"canvas:"`, `"image:"`, `"wifi:creds"`, `"plugin:<name>:config"`) is a
/// convention of the key string, not part of the trait.
pub trait KvStore: Send + Sync {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError>;
    fn set_blob(&self, key: &str, value: &[u8]) -> Result<(), ConfigError>;
    fn erase(&self, key: &str) -> Result<(), ConfigError>;
    /// Flush any buffered writes. A no-op for stores that write through.
    fn commit(&self) -> Result<(), ConfigError>;

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ConfigError>;
}

/// In-memory reference implementation. Used by unit tests and the simulator
/// binary; nothing survives process exit.
#[derive(Default)]
pub struct MemoryKvStore {
    inner: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        let map = self.inner.lock().expect("memory kv store poisoned");
        Ok(map.get(key).cloned())
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> Result<(), ConfigError> {
        let mut map = self.inner.lock().expect("memory kv store poisoned");
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<(), ConfigError> {
        let mut map = self.inner.lock().expect("memory kv store poisoned");
        map.remove(key);
        Ok(())
    }

    fn commit(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ConfigError> {
        let map = self.inner.lock().expect("memory kv store poisoned");
        Ok(map.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

/// File-backed reference implementation: one regular file per key, under a
/// root directory, key separators mapped to `_` so namespaced keys stay flat
/// files. Not a production flash-wear-aware KV engine — a deterministic
/// stand-in so the persistence layer can be exercised as an external
/// collaborator referenced purely by interface.
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| ConfigError::StorageFail(format!("create kv root: {e}")))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.root.join(sanitized)
    }
}

impl KvStore for FileKvStore {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::StorageFail(format!("read {key}: {e}"))),
        }
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> Result<(), ConfigError> {
        fs::write(self.path_for(key), value)
            .map_err(|e| ConfigError::StorageFail(format!("write {key}: {e}")))
    }

    fn erase(&self, key: &str) -> Result<(), ConfigError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConfigError::StorageFail(format!("erase {key}: {e}"))),
        }
    }

    fn commit(&self) -> Result<(), ConfigError> {
        // Every write above is already synchronous; commit exists so callers
        // that batch writes against other KvStore impls have one call site.
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ConfigError> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.root)
            .map_err(|e| ConfigError::StorageFail(format!("list kv root: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::StorageFail(format!("list entry: {e}")))?;
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    out.push(name.to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Lets a single store be handed to several subsystems by value — each
/// holds an `Arc<FileKvStore>` (or `Arc<MemoryKvStore>`) clone rather than
/// owning a private instance, so `pin_wifi`, `pin_canvas` and the HTTP
/// settings route all read and write the same backing store.
impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        (**self).get_blob(key)
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> Result<(), ConfigError> {
        (**self).set_blob(key, value)
    }

    fn erase(&self, key: &str) -> Result<(), ConfigError> {
        (**self).erase(key)
    }

    fn commit(&self) -> Result<(), ConfigError> {
        (**self).commit()
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ConfigError> {
        (**self).keys_with_prefix(prefix)
    }
}

// -------------------------------------------------------------------------
// Device configuration file (pin.toml)
// -------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_idle_sleep_secs")]
    pub idle_sleep_secs: u64,
    #[serde(default = "DisplayConfig::default_partial_limit")]
    pub partial_refresh_limit: u32,
}

impl DisplayConfig {
    const fn default_idle_sleep_secs() -> u64 {
        600
    }
    const fn default_partial_limit() -> u32 {
        10
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WifiConfig {
    #[serde(default = "WifiConfig::default_ap_prefix")]
    pub ap_ssid_prefix: String,
    #[serde(default = "WifiConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl WifiConfig {
    fn default_ap_prefix() -> String {
        "Pin-Device".to_string()
    }
    const fn default_connect_timeout() -> u64 {
        30
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OtaConfig {
    #[serde(default)]
    pub auto_check: bool,
    #[serde(default = "OtaConfig::default_check_interval")]
    pub check_interval_secs: u64,
}

impl OtaConfig {
    const fn default_check_interval() -> u64 {
        3600
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DeviceConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub wifi: WifiConfig,
    #[serde(default)]
    pub ota: OtaConfig,
}

/// Best-effort config path: local working directory first, then the
/// platform config directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("pin.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("pin").join("pin.toml");
    }
    PathBuf::from("pin.toml")
}

/// Load device configuration from `path`, or [`discover`] a path if none is
/// given. A missing or unparsable file falls back to defaults rather than
/// failing boot.
pub fn load_from(path: Option<PathBuf>) -> Result<DeviceConfig> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<DeviceConfig>(&content) {
            Ok(cfg) => {
                debug!(target: "config", path = %path.display(), "loaded device config");
                Ok(cfg)
            }
            Err(e) => {
                info!(target: "config", path = %path.display(), error = %e, "config parse failed, using defaults");
                Ok(DeviceConfig::default())
            }
        },
        Err(_) => Ok(DeviceConfig::default()),
    }
}

pub fn load(path: &Path) -> Result<DeviceConfig> {
    load_from(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.get_blob("canvas:home").unwrap(), None);
        kv.set_blob("canvas:home", b"abc").unwrap();
        assert_eq!(kv.get_blob("canvas:home").unwrap(), Some(b"abc".to_vec()));
        kv.erase("canvas:home").unwrap();
        assert_eq!(kv.get_blob("canvas:home").unwrap(), None);
    }

    #[test]
    fn memory_store_prefix_listing() {
        let kv = MemoryKvStore::new();
        kv.set_blob("canvas:home", b"1").unwrap();
        kv.set_blob("canvas:away", b"2").unwrap();
        kv.set_blob("image:logo", b"3").unwrap();
        let mut keys = kv.keys_with_prefix("canvas:").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["canvas:away".to_string(), "canvas:home".to_string()]);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKvStore::open(dir.path()).unwrap();
        assert_eq!(kv.get_blob("wifi:creds").unwrap(), None);
        kv.set_blob("wifi:creds", b"ssid=x").unwrap();
        kv.commit().unwrap();
        assert_eq!(kv.get_blob("wifi:creds").unwrap(), Some(b"ssid=x".to_vec()));
        kv.erase("wifi:creds").unwrap();
        assert_eq!(kv.get_blob("wifi:creds").unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let kv = FileKvStore::open(dir.path()).unwrap();
            kv.set_blob("plugin:clock:config", b"{}").unwrap();
        }
        let kv = FileKvStore::open(dir.path()).unwrap();
        assert_eq!(
            kv.get_blob("plugin:clock:config").unwrap(),
            Some(b"{}".to_vec())
        );
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_pin_config__.toml"))).unwrap();
        assert_eq!(cfg.display.idle_sleep_secs, 600);
        assert_eq!(cfg.display.partial_refresh_limit, 10);
        assert!(!cfg.ota.auto_check);
    }

    #[test]
    fn parses_overridden_fields() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[display]\nidle_sleep_secs = 120\n[ota]\nauto_check = true\ncheck_interval_secs = 60\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.display.idle_sleep_secs, 120);
        assert_eq!(cfg.display.partial_refresh_limit, 10);
        assert!(cfg.ota.auto_check);
        assert_eq!(cfg.ota.check_interval_secs, 60);
    }

    #[test]
    fn falls_back_to_defaults_on_parse_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not valid toml {{{").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.wifi.ap_ssid_prefix, "Pin-Device");
    }
}
