//! File-backed credential store for host (development) builds.
//!
//! Stores each key as a plain file under a namespace directory, by default
//! `~/.esp-station/wifi_config/`. This mirrors the NVS layout on device:
//! one string value per key, absent file means absent key.

use super::{credentials_from_raw, CredentialStore, StoreError, PASS_KEY, SSID_KEY, STORE_NAMESPACE};
use crate::config::Credentials;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Credential store persisting to plain files.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Default namespace directory: `~/.esp-station/wifi_config`.
    pub fn default_dir() -> io::Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(PathBuf::from(home).join(".esp-station").join(STORE_NAMESPACE))
    }

    /// Open a store under the given directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open the store under the default directory.
    pub fn open_default() -> io::Result<Self> {
        Self::open(Self::default_dir()?)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Read a key, treating an absent file as the empty string.
    fn read_key(&self, key: &str) -> io::Result<String> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// Write a key with read-back verification to catch silent write
    /// failures.
    fn write_key(&mut self, key: &str, value: &str) -> io::Result<()> {
        let path = self.key_path(key);
        fs::write(&path, value)?;

        let read_back = fs::read_to_string(&path)?;
        if read_back != value {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "verification failed for {:?}: wrote {} bytes, read {} bytes",
                    path,
                    value.len(),
                    read_back.len()
                ),
            ));
        }
        Ok(())
    }

    fn remove_key(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Directory this store persists under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credentials>, StoreError> {
        let ssid = self.read_key(SSID_KEY)?;
        if ssid.is_empty() {
            return Ok(None);
        }
        let pass = self.read_key(PASS_KEY)?;
        Ok(credentials_from_raw(ssid, pass))
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        self.write_key(SSID_KEY, &credentials.ssid)?;
        self.write_key(PASS_KEY, &credentials.passphrase)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.remove_key(SSID_KEY)?;
        self.remove_key(PASS_KEY)?;
        Ok(())
    }
}
