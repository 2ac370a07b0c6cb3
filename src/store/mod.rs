//! Credential persistence.
//!
//! Credentials are stored as two named string values, `ssid` and `pass`,
//! inside the `wifi_config` namespace. An absent key reads as the empty
//! string, and an empty SSID means "no stored credentials".
//!
//! # Components
//!
//! - [`CredentialStore`] - the persistence seam
//! - [`MemoryStore`] - volatile store for tests and experiments
//! - [`host`] - file-backed store for host builds
//! - `nvs` - NVS-backed store (ESP32 only)

mod host;

#[cfg(feature = "esp32")]
mod nvs;

pub use host::FileStore;

#[cfg(feature = "esp32")]
pub use nvs::NvsStore;

use crate::config::Credentials;
use log::warn;
use std::fmt;
use std::io;

/// Namespace holding the persisted credential keys.
pub const STORE_NAMESPACE: &str = "wifi_config";

/// Key for the stored SSID.
pub const SSID_KEY: &str = "ssid";

/// Key for the stored passphrase.
pub const PASS_KEY: &str = "pass";

/// Synchronous persistence of the station credentials.
pub trait CredentialStore {
    /// Load the stored credentials.
    ///
    /// Returns `Ok(None)` when nothing usable is stored; corrupted data is
    /// treated as absent, not as an error.
    fn load(&self) -> Result<Option<Credentials>, StoreError>;

    /// Persist the given credentials, replacing any stored pair.
    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Remove the stored credentials.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Errors from the persistence backends.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem error from the host store.
    Io(io::Error),
    /// NVS error from the device store.
    #[cfg(feature = "esp32")]
    Nvs(esp_idf_sys::EspError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "store I/O error: {}", e),
            #[cfg(feature = "esp32")]
            Self::Nvs(e) => write!(f, "NVS error: {:?}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "esp32")]
            Self::Nvs(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Build credentials from raw stored strings, treating unusable data as
/// absent.
fn credentials_from_raw(ssid: String, passphrase: String) -> Option<Credentials> {
    if ssid.is_empty() {
        return None;
    }
    match Credentials::new(ssid, passphrase) {
        Ok(creds) => Some(creds),
        Err(e) => {
            warn!("Ignoring stored credentials: {}", e);
            None
        }
    }
}

/// Volatile in-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: Option<Credentials>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self.credentials.clone())
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        self.credentials = Some(credentials.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.credentials = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let creds = Credentials::new("esp-net", "secret1").unwrap();
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), Some(creds));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_raw_empty_ssid_is_absent() {
        assert!(credentials_from_raw(String::new(), "secret1".to_string()).is_none());
    }

    #[test]
    fn test_raw_oversized_ssid_is_absent() {
        assert!(credentials_from_raw("a".repeat(40), String::new()).is_none());
    }

    #[test]
    fn test_raw_open_network_loads() {
        let creds = credentials_from_raw("esp-net".to_string(), String::new()).unwrap();
        assert!(creds.is_open());
    }
}
