//! Fixed device configuration and credential types.
//!
//! All runtime constants live here: the always-on access-point identity,
//! the provisioning port, and the connection timing knobs. The firmware has
//! no configuration files; changing any of these means reflashing.
//!
//! # Example
//!
//! ```
//! use esp_station::config::Credentials;
//!
//! let creds = Credentials::new("MyNetwork", "MyPassword").unwrap();
//! assert!(!creds.is_open());
//! ```

use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// SSID broadcast by the always-on access point.
pub const AP_SSID: &str = "karch_eeg_88005553535";

/// Passphrase of the always-on access point.
pub const AP_PASSPHRASE: &str = "12345678";

/// Address of the device on its own access-point network.
pub const AP_ADDRESS: &str = "192.168.4.1";

/// TCP port the provisioning server listens on.
pub const PROVISIONING_PORT: u16 = 8888;

/// How long a single connect attempt may remain in `Connecting` before it
/// is recorded as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Minimum time between connect attempts to an unreachable network.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(30_000);

/// Deadline for reading a single provisioning command line. A client that
/// stalls mid-command is disconnected so the control loop keeps ticking.
pub const COMMAND_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for writing a provisioning response.
pub const RESPONSE_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pacing of the cooperative control loop.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum passphrase length for WPA2.
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Credentials for joining an upstream network as a station.
///
/// The passphrase is zeroed when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network passphrase (empty for open networks, up to 64 bytes).
    pub passphrase: String,
}

impl Credentials {
    /// Create validated credentials.
    ///
    /// Returns an error if the SSID is empty or either field exceeds its
    /// length cap.
    pub fn new(
        ssid: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let creds = Self {
            ssid: ssid.into(),
            passphrase: passphrase.into(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Validate the credentials against SSID/passphrase limits.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.ssid.is_empty() {
            return Err(CredentialsError::SsidEmpty);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(CredentialsError::SsidTooLong {
                len: self.ssid.len(),
                max: MAX_SSID_LEN,
            });
        }
        if self.passphrase.len() > MAX_PASSPHRASE_LEN {
            return Err(CredentialsError::PassphraseTooLong {
                len: self.passphrase.len(),
                max: MAX_PASSPHRASE_LEN,
            });
        }
        Ok(())
    }

    /// Check if this is an open network (no passphrase).
    pub fn is_open(&self) -> bool {
        self.passphrase.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never put the passphrase in logs
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("passphrase", &"****")
            .finish()
    }
}

/// Errors produced by credential validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Passphrase exceeds maximum length.
    PassphraseTooLong { len: usize, max: usize },
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PassphraseTooLong { len, max } => {
                write!(f, "passphrase too long: {} bytes (max {})", len, max)
            }
        }
    }
}

impl std::error::Error for CredentialsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let creds = Credentials::new("TestNetwork", "password123").unwrap();
        assert_eq!(creds.ssid, "TestNetwork");
        assert_eq!(creds.passphrase, "password123");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_open_network() {
        let creds = Credentials::new("OpenNetwork", "").unwrap();
        assert!(creds.is_open());
    }

    #[test]
    fn test_empty_ssid() {
        let result = Credentials::new("", "password123");
        assert_eq!(result, Err(CredentialsError::SsidEmpty));
    }

    #[test]
    fn test_ssid_too_long() {
        let long_ssid = "a".repeat(33);
        let result = Credentials::new(long_ssid, "password123");
        assert!(matches!(result, Err(CredentialsError::SsidTooLong { .. })));
    }

    #[test]
    fn test_ssid_max_length() {
        let max_ssid = "a".repeat(32);
        assert!(Credentials::new(max_ssid, "password123").is_ok());
    }

    #[test]
    fn test_passphrase_too_long() {
        let long_pass = "a".repeat(65);
        let result = Credentials::new("TestNetwork", long_pass);
        assert!(matches!(
            result,
            Err(CredentialsError::PassphraseTooLong { .. })
        ));
    }

    #[test]
    fn test_passphrase_max_length() {
        let max_pass = "a".repeat(64);
        assert!(Credentials::new("TestNetwork", max_pass).is_ok());
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let creds = Credentials::new("TestNetwork", "supersecret").unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("TestNetwork"));
        assert!(!rendered.contains("supersecret"));
    }
}
