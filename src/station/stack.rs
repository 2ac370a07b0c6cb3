//! Network stack seam for the station connection.
//!
//! The connection state machine only needs three primitives from the
//! underlying radio stack: start a connect attempt, read the driver-level
//! status, and read the link addressing once associated. Everything else
//! (the always-on access point, DHCP, the driver event loop) stays behind
//! this trait.

use std::fmt;
use std::net::Ipv4Addr;

/// Driver-level station status as reported by the network stack.
///
/// This is raw driver state, distinct from the connection manager's own
/// [`ConnectionState`](crate::station::ConnectionState): the manager decides
/// when a long `Connecting` counts as failed, not the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    /// No connect attempt in flight.
    Idle,
    /// Association/DHCP in progress.
    Connecting,
    /// Associated with an IP address assigned.
    Connected,
    /// The driver gave up on the last attempt.
    Failed,
}

/// Addressing and signal data for an established station link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo {
    /// Address assigned to the station interface.
    pub address: Ipv4Addr,
    /// Gateway of the joined network.
    pub gateway: Ipv4Addr,
    /// Received signal strength in dBm.
    pub rssi_dbm: i32,
}

/// Primitives the connection manager needs from the radio stack.
pub trait NetworkStack {
    /// Start a connect attempt to the given network.
    ///
    /// Must return quickly; association happens in the background and is
    /// observed via [`status`](Self::status).
    fn begin_connect(&mut self, ssid: &str, passphrase: &str) -> Result<(), StackError>;

    /// Current driver-level station status.
    fn status(&self) -> StationStatus;

    /// Addressing for the current link, if connected.
    fn link_info(&self) -> Option<LinkInfo>;
}

/// Error starting a connect attempt.
#[derive(Debug)]
pub struct StackError {
    reason: String,
}

impl StackError {
    /// Create a stack error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network stack error: {}", self.reason)
    }
}

impl std::error::Error for StackError {}
