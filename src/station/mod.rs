//! Station connectivity.
//!
//! # Components
//!
//! - [`manager`] - retry/backoff connection state machine
//! - [`stack`] - trait seam towards the radio driver
//! - [`sim`] - host-side simulated stack
//! - `esp` - ESP-IDF adapter (ESP32 only)

mod manager;
mod sim;
mod stack;

#[cfg(feature = "esp32")]
mod esp;

pub use manager::{ConnectError, ConnectionManager, ConnectionState, FailureReason};
pub use sim::SimulatedStack;
pub use stack::{LinkInfo, NetworkStack, StackError, StationStatus};

#[cfg(feature = "esp32")]
pub use esp::EspStationStack;
