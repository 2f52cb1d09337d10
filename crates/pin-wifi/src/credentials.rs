//! Credential persistence: SSID is stored plaintext, the password is
//! encrypted behind a [`CredentialCipher`] trait so a platform secure-key
//! store can replace the default XOR+Base64 encoding without touching
//! the FSM. XOR+Base64 is a weak, easily reversible encoding — adequate
//! only to keep credentials out of plaintext on disk, not a real
//! confidentiality guarantee.

use crate::error::WifiError;
use crate::types::WifiCredentials;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pin_config::KvStore;

const NAMESPACE: &str = "pin_wifi";
const SSID_KEY: &str = "pin_wifi_ssid";
const PASSWORD_KEY: &str = "pin_wifi_password";
const VERSION_KEY: &str = "pin_wifi_version";
const CURRENT_VERSION: u8 = 1;

pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> String;
    fn decrypt(&self, ciphertext: &str) -> Result<String, WifiError>;
}

/// XOR against a compiled key, then Base64-encode. Deliberately simple
/// and explicitly not a substitute for a real secret store.
pub struct XorBase64Cipher {
    key: Vec<u8>,
}

impl XorBase64Cipher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        assert!(!key.is_empty(), "cipher key must not be empty");
        Self { key }
    }
}

impl Default for XorBase64Cipher {
    fn default() -> Self {
        Self::new(*b"pin-device-default-key")
    }
}

impl CredentialCipher for XorBase64Cipher {
    fn encrypt(&self, plaintext: &str) -> String {
        let xored: Vec<u8> = plaintext
            .as_bytes()
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ self.key[i % self.key.len()])
            .collect();
        BASE64.encode(xored)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, WifiError> {
        let bytes = BASE64
            .decode(ciphertext)
            .map_err(|e| WifiError::InvalidArgument(format!("bad base64: {e}")))?;
        let xored: Vec<u8> = bytes
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ self.key[i % self.key.len()])
            .collect();
        String::from_utf8(xored).map_err(|e| WifiError::InvalidArgument(format!("bad utf8: {e}")))
    }
}

pub fn save<K: KvStore>(kv: &K, cipher: &dyn CredentialCipher, creds: &WifiCredentials) -> Result<(), WifiError> {
    kv.set_blob(SSID_KEY, creds.ssid.as_bytes())?;
    kv.set_blob(PASSWORD_KEY, cipher.encrypt(&creds.password).as_bytes())?;
    kv.set_blob(VERSION_KEY, &[CURRENT_VERSION])?;
    kv.commit()?;
    let _ = NAMESPACE;
    Ok(())
}

pub fn load<K: KvStore>(kv: &K, cipher: &dyn CredentialCipher) -> Result<Option<WifiCredentials>, WifiError> {
    let Some(ssid_blob) = kv.get_blob(SSID_KEY)? else {
        return Ok(None);
    };
    let Some(password_blob) = kv.get_blob(PASSWORD_KEY)? else {
        return Ok(None);
    };
    let ssid = String::from_utf8(ssid_blob).map_err(|e| WifiError::InvalidArgument(e.to_string()))?;
    let password_cipher = String::from_utf8(password_blob).map_err(|e| WifiError::InvalidArgument(e.to_string()))?;
    let password = cipher.decrypt(&password_cipher)?;
    Ok(Some(WifiCredentials { ssid, password }))
}

pub fn has_saved_config<K: KvStore>(kv: &K) -> bool {
    matches!(kv.get_blob(SSID_KEY), Ok(Some(_)))
}

pub fn erase<K: KvStore>(kv: &K) -> Result<(), WifiError> {
    kv.erase(SSID_KEY)?;
    kv.erase(PASSWORD_KEY)?;
    kv.erase(VERSION_KEY)?;
    Ok(())
}
