//! Provisioning server.
//!
//! Listens on a fixed TCP port and services one connection at a time: read
//! a single command, apply it to the connection manager and credential
//! store, write a textual response, close. The listening socket is
//! non-blocking so the control loop keeps ticking while no client is
//! around; once a client is accepted, its reads and writes carry explicit
//! deadlines so a stalled peer cannot starve the loop for long.

use super::command::{read_command, Command, ProtocolError};
use crate::config::{
    Credentials, AP_ADDRESS, AP_SSID, COMMAND_READ_TIMEOUT, RESPONSE_WRITE_TIMEOUT,
};
use crate::station::{ConnectError, ConnectionManager, ConnectionState, NetworkStack};
use crate::store::CredentialStore;
use log::{debug, info, warn};
use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Instant;

/// Response confirming stored credentials and a started attempt.
pub const RESP_SAVED: &str = "Credentials saved. Connecting...";

/// Response to a malformed or invalid `SET`.
pub const RESP_INVALID: &str = "Invalid credentials format.";

/// Response confirming a forced reconnect.
pub const RESP_FORCING: &str = "Forcing reconnection...";

/// Response to `FORCE_RECONNECT` when nothing is stored.
pub const RESP_NO_CREDENTIALS: &str = "No credentials stored.";

/// Response to an unrecognized verb.
pub const RESP_UNKNOWN: &str = "Unknown command. Use SET, STATUS or FORCE_RECONNECT.";

/// One-command-per-connection provisioning server.
pub struct ProvisioningServer {
    listener: TcpListener,
}

impl ProvisioningServer {
    /// Bind the provisioning port on all interfaces.
    pub fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        // Non-blocking accept keeps the control loop ticking
        listener.set_nonblocking(true)?;
        info!(
            "Provisioning server listening on {}",
            listener.local_addr()?
        );
        Ok(Self { listener })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Service at most one pending connection to completion.
    ///
    /// Returns `true` if a connection was handled.
    pub fn poll<S: NetworkStack, C: CredentialStore>(
        &mut self,
        manager: &mut ConnectionManager<S>,
        store: &mut C,
        now: Instant,
    ) -> bool {
        let (stream, peer) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return false,
            Err(e) => {
                warn!("Accept failed: {}", e);
                return false;
            }
        };

        debug!("Provisioning client connected: {}", peer);
        if let Err(e) = handle_client(&stream, manager, store, now) {
            warn!("Provisioning exchange with {} failed: {}", peer, e);
        }
        let _ = stream.shutdown(Shutdown::Both);
        true
    }
}

/// Read one command from the client and answer it.
fn handle_client<S: NetworkStack, C: CredentialStore>(
    stream: &TcpStream,
    manager: &mut ConnectionManager<S>,
    store: &mut C,
    now: Instant,
) -> io::Result<()> {
    // The accepted stream inherits non-blocking mode from the listener;
    // switch to blocking reads bounded by explicit deadlines
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(COMMAND_READ_TIMEOUT))?;
    stream.set_write_timeout(Some(RESPONSE_WRITE_TIMEOUT))?;
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to disable Nagle's algorithm: {}", e);
    }

    let mut reader = BufReader::new(stream);
    let response = match read_command(&mut reader) {
        Ok(command) => execute(command, manager, store, now),
        Err(ProtocolError::MissingCredentials) | Err(ProtocolError::LineTooLong) => {
            RESP_INVALID.to_string()
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Client closed without sending a command");
            return Ok(());
        }
        Err(ProtocolError::Io(e)) => {
            // Deadline expired or the socket broke: discard the partial
            // command, send nothing
            debug!("Discarding partial command: {}", e);
            return Ok(());
        }
    };

    let mut writer = stream;
    writer.write_all(response.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Apply a parsed command and produce the response text.
pub fn execute<S: NetworkStack, C: CredentialStore>(
    command: Command,
    manager: &mut ConnectionManager<S>,
    store: &mut C,
    now: Instant,
) -> String {
    match command {
        Command::Set { ssid, passphrase } => {
            let credentials = match Credentials::new(ssid, passphrase) {
                Ok(creds) => creds,
                Err(e) => {
                    info!("Rejected SET: {}", e);
                    return RESP_INVALID.to_string();
                }
            };

            // Best-effort persistence: a store failure must not block the
            // connect attempt with the just-received credentials
            if let Err(e) = store.save(&credentials) {
                warn!("Failed to persist credentials: {}; connecting anyway", e);
            }

            match manager.request_connect(credentials, now) {
                Ok(()) => RESP_SAVED.to_string(),
                Err(e) => {
                    info!("Rejected SET: {}", e);
                    RESP_INVALID.to_string()
                }
            }
        }
        Command::Status => {
            // Fold in the latest stack state so the report is never stale
            manager.tick(now);
            status_report(manager, now)
        }
        Command::ForceReconnect => match manager.force_reconnect(now) {
            Ok(()) => RESP_FORCING.to_string(),
            Err(ConnectError::NoCredentials) => RESP_NO_CREDENTIALS.to_string(),
            Err(e) => {
                warn!("Forced reconnect failed: {}", e);
                RESP_INVALID.to_string()
            }
        },
        Command::Unknown(verb) => {
            info!("Unknown provisioning command: {:?}", verb);
            RESP_UNKNOWN.to_string()
        }
    }
}

/// Render the multi-line STATUS report.
fn status_report<S: NetworkStack>(manager: &ConnectionManager<S>, now: Instant) -> String {
    let (state, retry_in) = manager.status(now);
    let mut report = String::new();

    report.push_str("=== Network Status ===\n");
    report.push_str(&format!("AP SSID: {}\n", AP_SSID));
    report.push_str(&format!("AP address: {}\n", AP_ADDRESS));

    if state == ConnectionState::Connected {
        report.push_str("Station connected: yes\n");
        if let Some(creds) = manager.credentials() {
            report.push_str(&format!("SSID: {}\n", creds.ssid));
        }
        if let Some(link) = manager.link_info() {
            report.push_str(&format!("Address: {}\n", link.address));
            report.push_str(&format!("Gateway: {}\n", link.gateway));
            report.push_str(&format!("RSSI: {} dBm\n", link.rssi_dbm));
        }
    } else {
        report.push_str("Station connected: no\n");
        match manager.last_failure() {
            Some(reason) => report.push_str(&format!("State: {} ({})\n", state, reason)),
            None => report.push_str(&format!("State: {}\n", state)),
        }
        match retry_in {
            Some(secs) => report.push_str(&format!("Next retry in: {}s\n", secs)),
            None if manager.credentials().is_none() => {
                report.push_str("No credentials stored.\n")
            }
            None => {}
        }
    }

    report.push_str("======================");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::SimulatedStack;
    use crate::store::{MemoryStore, StoreError};
    use std::io::Read;
    use std::thread;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(15);
    const RETRY: Duration = Duration::from_secs(30);

    /// Manager whose simulated network never finishes connecting.
    fn pending_manager() -> ConnectionManager<SimulatedStack> {
        ConnectionManager::with_timing(
            SimulatedStack::with_latency(Duration::from_secs(3600)),
            TIMEOUT,
            RETRY,
        )
    }

    /// Manager whose simulated network connects instantly.
    fn instant_manager() -> ConnectionManager<SimulatedStack> {
        ConnectionManager::with_timing(SimulatedStack::with_latency(Duration::ZERO), TIMEOUT, RETRY)
    }

    fn set(ssid: &str, passphrase: &str) -> Command {
        Command::Set {
            ssid: ssid.to_string(),
            passphrase: passphrase.to_string(),
        }
    }

    #[test]
    fn test_set_persists_and_connects() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let now = Instant::now();

        let response = execute(set("esp-net", "secret1"), &mut manager, &mut store, now);

        assert_eq!(response, RESP_SAVED);
        let stored = store.load().unwrap().expect("Credentials not stored");
        assert_eq!(stored.ssid, "esp-net");
        assert_eq!(stored.passphrase, "secret1");
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_set_empty_ssid_mutates_nothing() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();

        let response = execute(set("", "secret1"), &mut manager, &mut store, Instant::now());

        assert_eq!(response, RESP_INVALID);
        assert!(store.load().unwrap().is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_set_twice_restarts_attempt() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let now = Instant::now();

        assert_eq!(
            execute(set("esp-net", "secret1"), &mut manager, &mut store, now),
            RESP_SAVED
        );
        assert_eq!(
            execute(set("esp-net", "secret1"), &mut manager, &mut store, now),
            RESP_SAVED
        );
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(store.load().unwrap().unwrap().ssid, "esp-net");
    }

    #[test]
    fn test_set_survives_store_failure() {
        struct BrokenStore;

        impl CredentialStore for BrokenStore {
            fn load(&self) -> Result<Option<Credentials>, StoreError> {
                Ok(None)
            }
            fn save(&mut self, _: &Credentials) -> Result<(), StoreError> {
                Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "flash unavailable",
                )))
            }
            fn clear(&mut self) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let mut manager = pending_manager();
        let mut store = BrokenStore;

        let response = execute(
            set("esp-net", "secret1"),
            &mut manager,
            &mut store,
            Instant::now(),
        );

        // Best-effort: the attempt still goes out with the unsaved pair
        assert_eq!(response, RESP_SAVED);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_force_reconnect_with_credentials() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let now = Instant::now();
        execute(set("esp-net", "secret1"), &mut manager, &mut store, now);

        let response = execute(Command::ForceReconnect, &mut manager, &mut store, now);

        assert_eq!(response, RESP_FORCING);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_force_reconnect_without_credentials() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();

        let response = execute(
            Command::ForceReconnect,
            &mut manager,
            &mut store,
            Instant::now(),
        );

        assert_eq!(response, RESP_NO_CREDENTIALS);
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_unknown_command() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();

        let response = execute(
            Command::Unknown("REBOOT".to_string()),
            &mut manager,
            &mut store,
            Instant::now(),
        );

        assert_eq!(response, RESP_UNKNOWN);
    }

    #[test]
    fn test_status_without_credentials() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();

        let report = execute(Command::Status, &mut manager, &mut store, Instant::now());

        assert!(report.starts_with("=== Network Status ==="));
        assert!(report.ends_with("======================"));
        assert!(report.contains(&format!("AP SSID: {}", AP_SSID)));
        assert!(report.contains(&format!("AP address: {}", AP_ADDRESS)));
        assert!(report.contains("Station connected: no"));
        assert!(report.contains("No credentials stored."));
        assert!(!report.contains("Next retry in"));
    }

    #[test]
    fn test_status_when_connected() {
        let mut manager = instant_manager();
        let mut store = MemoryStore::new();
        let now = Instant::now();
        execute(set("esp-net", "secret1"), &mut manager, &mut store, now);

        // STATUS folds in the stack state, observing the connection
        let report = execute(Command::Status, &mut manager, &mut store, now);

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert!(report.contains("Station connected: yes"));
        assert!(report.contains("SSID: esp-net"));
        assert!(report.contains("Address: 192.168.1.42"));
        assert!(report.contains("Gateway: 192.168.1.1"));
        assert!(report.contains("RSSI: -58 dBm"));
    }

    #[test]
    fn test_status_before_first_attempt_has_no_countdown() {
        let mut manager = pending_manager();
        manager
            .restore_credentials(Credentials::new("esp-net", "secret1").unwrap())
            .unwrap();

        // Credentials restored at boot, first tick not yet run
        let report = status_report(&manager, Instant::now());

        assert!(report.contains("State: idle"));
        assert!(!report.contains("Next retry in"));
        assert!(!report.contains("No credentials stored."));
    }

    #[test]
    fn test_status_after_timeout_shows_reason_and_countdown() {
        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let now = Instant::now();
        execute(set("esp-net", "secret1"), &mut manager, &mut store, now);

        let later = now + TIMEOUT + Duration::from_millis(1);
        let report = execute(Command::Status, &mut manager, &mut store, later);

        assert!(report.contains("Station connected: no"));
        assert!(report.contains("State: failed (connect timed out)"));
        assert!(report.contains("Next retry in: 30s"));
    }

    #[test]
    fn test_tcp_status_exchange() {
        let mut server = ProvisioningServer::bind(0).expect("Failed to bind");
        let addr = server.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).expect("Failed to connect");
            stream.write_all(b"STATUS\n").unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut serviced = false;
        while Instant::now() < deadline {
            if server.poll(&mut manager, &mut store, Instant::now()) {
                serviced = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert!(serviced, "No connection was serviced");
        let response = client.join().unwrap();
        assert!(response.contains("=== Network Status ==="));
        assert!(response.contains("Station connected: no"));
    }

    #[test]
    fn test_tcp_overlong_line_is_rejected() {
        let mut server = ProvisioningServer::bind(0).expect("Failed to bind");
        let addr = server.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).expect("Failed to connect");
            // A line far past the cap, never terminated
            stream.write_all("A".repeat(4096).as_bytes()).unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if server.poll(&mut manager, &mut store, Instant::now()) {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        let response = client.join().unwrap();
        assert_eq!(response.trim(), RESP_INVALID);
        assert!(store.load().unwrap().is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_tcp_truncated_set_is_rejected() {
        let mut server = ProvisioningServer::bind(0).expect("Failed to bind");
        let addr = server.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).expect("Failed to connect");
            // SET with an SSID but no passphrase line
            stream.write_all(b"SET\nesp-net\n").unwrap();
            stream.shutdown(Shutdown::Write).unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let mut manager = pending_manager();
        let mut store = MemoryStore::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if server.poll(&mut manager, &mut store, Instant::now()) {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        let response = client.join().unwrap();
        assert_eq!(response.trim(), RESP_INVALID);
        assert!(store.load().unwrap().is_none());
        assert_eq!(manager.state(), ConnectionState::Idle);
    }
}
