//! Station connectivity firmware library.
//!
//! The device keeps a fixed access point up for local reachability,
//! opportunistically joins a configured upstream network as a station, and
//! accepts new station credentials at runtime over a line-oriented TCP
//! protocol. This library contains the platform-independent core (the
//! connection state machine, the provisioning protocol, and the credential
//! stores), all testable on the host machine; ESP32 hardware adapters live
//! behind the `esp32` feature.

pub mod config;
pub mod node;
pub mod provision;
pub mod station;
pub mod store;

// Re-export commonly used items
pub use config::{Credentials, CredentialsError};
pub use node::Node;
pub use provision::{Command, ProvisioningServer};
pub use station::{
    ConnectError, ConnectionManager, ConnectionState, FailureReason, LinkInfo, NetworkStack,
    SimulatedStack, StationStatus,
};
pub use store::{CredentialStore, FileStore, MemoryStore, StoreError};

#[cfg(feature = "esp32")]
pub use station::EspStationStack;
#[cfg(feature = "esp32")]
pub use store::NvsStore;
