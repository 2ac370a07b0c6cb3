//! Cooperative control loop.
//!
//! [`Node`] wires the three owned pieces together: the connection manager,
//! the credential store, and the provisioning server. One loop iteration
//! advances the state machine and services at most one pending provisioning
//! connection; nothing inside a step blocks beyond the server's per-read
//! deadlines.

use crate::config::TICK_INTERVAL;
use crate::provision::ProvisioningServer;
use crate::station::{ConnectionManager, NetworkStack};
use crate::store::CredentialStore;
use log::{info, warn};
use std::thread;
use std::time::Instant;

/// The device's connectivity runtime: state machine + store + server.
pub struct Node<S, C> {
    manager: ConnectionManager<S>,
    store: C,
    server: ProvisioningServer,
}

impl<S: NetworkStack, C: CredentialStore> Node<S, C> {
    /// Assemble a node from its parts.
    pub fn new(manager: ConnectionManager<S>, store: C, server: ProvisioningServer) -> Self {
        Self {
            manager,
            store,
            server,
        }
    }

    /// Load persisted credentials. The first tick then issues the initial
    /// connect attempt.
    pub fn bootstrap(&mut self) {
        match self.store.load() {
            Ok(Some(credentials)) => {
                if let Err(e) = self.manager.restore_credentials(credentials) {
                    warn!("Stored credentials unusable: {}", e);
                }
            }
            Ok(None) => info!("No stored credentials; waiting for provisioning"),
            Err(e) => warn!("Failed to load stored credentials: {}", e),
        }
    }

    /// One loop iteration: advance the state machine, then service at most
    /// one pending provisioning connection.
    ///
    /// Returns `true` if a provisioning connection was handled.
    pub fn step(&mut self, now: Instant) -> bool {
        self.manager.tick(now);
        self.server.poll(&mut self.manager, &mut self.store, now)
    }

    /// Run the control loop forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step(Instant::now());
            thread::sleep(TICK_INTERVAL);
        }
    }

    /// The connection manager.
    pub fn manager(&self) -> &ConnectionManager<S> {
        &self.manager
    }

    /// Mutable access to the connection manager.
    pub fn manager_mut(&mut self) -> &mut ConnectionManager<S> {
        &mut self.manager
    }

    /// The credential store.
    pub fn store(&self) -> &C {
        &self.store
    }
}
