//! NVS-backed credential store (ESP32 only).
//!
//! Persists the `ssid`/`pass` keys in the ESP32's Non-Volatile Storage so
//! provisioned credentials survive reboots.

use super::{credentials_from_raw, CredentialStore, StoreError, PASS_KEY, SSID_KEY, STORE_NAMESPACE};
use crate::config::{Credentials, MAX_PASSPHRASE_LEN, MAX_SSID_LEN};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_sys::EspError;

/// Credential store persisting to NVS.
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    /// Open the `wifi_config` NVS namespace.
    pub fn open() -> Result<Self, StoreError> {
        let partition = EspNvsPartition::<NvsDefault>::take().map_err(StoreError::Nvs)?;
        let nvs = EspNvs::new(partition, STORE_NAMESPACE, true).map_err(StoreError::Nvs)?;
        Ok(Self { nvs })
    }

    /// Read a string key, treating an absent key as the empty string.
    fn read_key(&self, key: &str, buf: &mut [u8]) -> Result<String, EspError> {
        let value = self.nvs.get_str(key, buf)?;
        Ok(value.unwrap_or_default().to_string())
    }
}

impl CredentialStore for NvsStore {
    fn load(&self) -> Result<Option<Credentials>, StoreError> {
        let mut ssid_buf = [0u8; MAX_SSID_LEN + 1];
        let mut pass_buf = [0u8; MAX_PASSPHRASE_LEN + 1];

        let ssid = self
            .read_key(SSID_KEY, &mut ssid_buf)
            .map_err(StoreError::Nvs)?;
        if ssid.is_empty() {
            return Ok(None);
        }
        let pass = self
            .read_key(PASS_KEY, &mut pass_buf)
            .map_err(StoreError::Nvs)?;

        Ok(credentials_from_raw(ssid, pass))
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        self.nvs
            .set_str(SSID_KEY, &credentials.ssid)
            .map_err(StoreError::Nvs)?;
        self.nvs
            .set_str(PASS_KEY, &credentials.passphrase)
            .map_err(StoreError::Nvs)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.nvs.remove(SSID_KEY).map_err(StoreError::Nvs)?;
        self.nvs.remove(PASS_KEY).map_err(StoreError::Nvs)?;
        Ok(())
    }
}
