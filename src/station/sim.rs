//! Simulated network stack for host development.
//!
//! Lets the full firmware loop (state machine, provisioning server, stores)
//! run on a development machine with no radio. A connect attempt succeeds
//! after a fixed latency; the link can be severed to exercise the
//! reconnect path.

use super::stack::{LinkInfo, NetworkStack, StackError, StationStatus};
use log::debug;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Time a simulated connect attempt spends in `Connecting`.
const DEFAULT_CONNECT_LATENCY: Duration = Duration::from_secs(2);

struct Attempt {
    started: Instant,
}

/// Host-side stand-in for the radio stack.
pub struct SimulatedStack {
    latency: Duration,
    attempt: Option<Attempt>,
    severed: bool,
}

impl SimulatedStack {
    /// Create a stack with the default connect latency.
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_CONNECT_LATENCY)
    }

    /// Create a stack that connects after the given latency.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            attempt: None,
            severed: false,
        }
    }

    /// Drop the simulated link, as if the upstream network vanished.
    pub fn sever(&mut self) {
        self.severed = true;
    }
}

impl Default for SimulatedStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStack for SimulatedStack {
    fn begin_connect(&mut self, ssid: &str, _passphrase: &str) -> Result<(), StackError> {
        debug!("Simulated connect to \"{}\"", ssid);
        self.severed = false;
        self.attempt = Some(Attempt {
            started: Instant::now(),
        });
        Ok(())
    }

    fn status(&self) -> StationStatus {
        let attempt = match &self.attempt {
            Some(a) => a,
            None => return StationStatus::Idle,
        };
        if self.severed {
            return StationStatus::Failed;
        }
        if attempt.started.elapsed() < self.latency {
            StationStatus::Connecting
        } else {
            StationStatus::Connected
        }
    }

    fn link_info(&self) -> Option<LinkInfo> {
        if self.status() != StationStatus::Connected {
            return None;
        }
        Some(LinkInfo {
            address: Ipv4Addr::new(192, 168, 1, 42),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            rssi_dbm: -58,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_until_connect() {
        let stack = SimulatedStack::with_latency(Duration::ZERO);
        assert_eq!(stack.status(), StationStatus::Idle);
        assert!(stack.link_info().is_none());
    }

    #[test]
    fn test_zero_latency_connects_immediately() {
        let mut stack = SimulatedStack::with_latency(Duration::ZERO);
        stack.begin_connect("esp-net", "secret1").unwrap();
        assert_eq!(stack.status(), StationStatus::Connected);
        assert!(stack.link_info().is_some());
    }

    #[test]
    fn test_latency_holds_connecting() {
        let mut stack = SimulatedStack::with_latency(Duration::from_secs(3600));
        stack.begin_connect("esp-net", "secret1").unwrap();
        assert_eq!(stack.status(), StationStatus::Connecting);
        assert!(stack.link_info().is_none());
    }

    #[test]
    fn test_sever_drops_link() {
        let mut stack = SimulatedStack::with_latency(Duration::ZERO);
        stack.begin_connect("esp-net", "secret1").unwrap();
        assert_eq!(stack.status(), StationStatus::Connected);

        stack.sever();
        assert_eq!(stack.status(), StationStatus::Failed);
        assert!(stack.link_info().is_none());

        // A new attempt clears the severed link
        stack.begin_connect("esp-net", "secret1").unwrap();
        assert_eq!(stack.status(), StationStatus::Connected);
    }
}
