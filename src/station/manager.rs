//! Station connection state machine.
//!
//! [`ConnectionManager`] owns the station lifecycle: it issues connect
//! attempts, bounds how long an attempt may hang, and schedules retries
//! against an unreachable network. It is driven by [`tick`], a non-blocking
//! step function called from the control loop, plus two caller-triggered
//! entry points ([`request_connect`] and [`force_reconnect`]) that bypass
//! the retry wait.
//!
//! [`tick`]: ConnectionManager::tick
//! [`request_connect`]: ConnectionManager::request_connect
//! [`force_reconnect`]: ConnectionManager::force_reconnect

use super::stack::{LinkInfo, NetworkStack, StationStatus};
use crate::config::{Credentials, CredentialsError, CONNECT_TIMEOUT, RETRY_INTERVAL};
use log::{info, warn};
use std::fmt;
use std::time::{Duration, Instant};

/// Station connection state.
///
/// Exactly one instance exists, owned by [`ConnectionManager`]; everything
/// else reads it through [`ConnectionManager::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No credentials, or no attempt made yet.
    Idle,
    /// A connect attempt is in flight.
    Connecting,
    /// Station link is up.
    Connected,
    /// The last attempt failed; a retry is scheduled.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why the last attempt ended in [`ConnectionState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The stack never reported success within the connect timeout.
    Timeout,
    /// A previously established link dropped.
    LinkLost,
    /// The stack refused to start the attempt.
    StackRejected,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "connect timed out"),
            Self::LinkLost => write!(f, "link lost"),
            Self::StackRejected => write!(f, "stack rejected the attempt"),
        }
    }
}

/// Errors surfaced to provisioning callers.
///
/// None of these are fatal: the state machine stays in a well-defined state
/// and keeps retrying where applicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Supplied credentials are unusable (empty SSID or over length caps).
    InvalidCredentials(CredentialsError),
    /// A reconnect was requested but no credentials are stored.
    NoCredentials,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials(e) => write!(f, "invalid credentials: {}", e),
            Self::NoCredentials => write!(f, "no credentials stored"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidCredentials(e) => Some(e),
            Self::NoCredentials => None,
        }
    }
}

/// Retry/backoff state machine for the station connection.
pub struct ConnectionManager<S> {
    stack: S,
    credentials: Option<Credentials>,
    state: ConnectionState,
    failure: Option<FailureReason>,
    last_attempt: Option<Instant>,
    connect_timeout: Duration,
    retry_interval: Duration,
}

impl<S: NetworkStack> ConnectionManager<S> {
    /// Create a manager with the default timing from [`crate::config`].
    pub fn new(stack: S) -> Self {
        Self::with_timing(stack, CONNECT_TIMEOUT, RETRY_INTERVAL)
    }

    /// Create a manager with explicit timing.
    pub fn with_timing(stack: S, connect_timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            stack,
            credentials: None,
            state: ConnectionState::Idle,
            failure: None,
            last_attempt: None,
            connect_timeout,
            retry_interval,
        }
    }

    /// Adopt credentials supplied by a caller and connect immediately.
    ///
    /// Overrides any pending retry wait. Durability is the caller's
    /// concern; the manager only keeps the working copy.
    pub fn request_connect(
        &mut self,
        credentials: Credentials,
        now: Instant,
    ) -> Result<(), ConnectError> {
        credentials
            .validate()
            .map_err(ConnectError::InvalidCredentials)?;
        self.credentials = Some(credentials);
        self.start_attempt(now);
        Ok(())
    }

    /// Re-attempt with the last-known credentials, bypassing the retry wait.
    pub fn force_reconnect(&mut self, now: Instant) -> Result<(), ConnectError> {
        if self.credentials.is_none() {
            return Err(ConnectError::NoCredentials);
        }
        self.start_attempt(now);
        Ok(())
    }

    /// Adopt persisted credentials without connecting yet.
    ///
    /// Used at boot: the first [`tick`](Self::tick) issues the initial
    /// attempt since no previous attempt is recorded.
    pub fn restore_credentials(&mut self, credentials: Credentials) -> Result<(), ConnectError> {
        credentials
            .validate()
            .map_err(ConnectError::InvalidCredentials)?;
        info!("Restored credentials for \"{}\"", credentials.ssid);
        self.credentials = Some(credentials);
        Ok(())
    }

    /// Advance time-based transitions. Non-blocking; safe to call on every
    /// loop iteration.
    pub fn tick(&mut self, now: Instant) {
        match self.state {
            ConnectionState::Connecting => {
                if self.stack.status() == StationStatus::Connected {
                    self.state = ConnectionState::Connected;
                    self.failure = None;
                    match self.stack.link_info() {
                        Some(link) => info!("Station connected, IP: {}", link.address),
                        None => info!("Station connected"),
                    }
                } else if self.elapsed_since_attempt(now) > self.connect_timeout {
                    warn!(
                        "Connect attempt timed out after {:?}",
                        self.connect_timeout
                    );
                    self.fail(FailureReason::Timeout, now);
                }
            }
            ConnectionState::Idle | ConnectionState::Failed => {
                if self.credentials.is_some() && self.retry_due(now) {
                    self.start_attempt(now);
                }
            }
            ConnectionState::Connected => {
                if self.stack.status() != StationStatus::Connected {
                    warn!("Station link lost");
                    self.fail(FailureReason::LinkLost, now);
                }
            }
        }
    }

    /// Current state and, when a retry is pending, whole seconds until it.
    ///
    /// The countdown only exists once an attempt has been made; restored
    /// credentials waiting for their first tick report no countdown.
    pub fn status(&self, now: Instant) -> (ConnectionState, Option<u64>) {
        let countdown = match self.state {
            ConnectionState::Idle | ConnectionState::Failed
                if self.credentials.is_some() && self.last_attempt.is_some() =>
            {
                Some(self.seconds_until_retry(now))
            }
            _ => None,
        };
        (self.state, countdown)
    }

    /// Current state only.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Why the last attempt failed, if the state is `Failed`.
    pub fn last_failure(&self) -> Option<FailureReason> {
        self.failure
    }

    /// Working credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Link addressing from the stack, if connected.
    pub fn link_info(&self) -> Option<LinkInfo> {
        self.stack.link_info()
    }

    /// Access the underlying network stack.
    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Mutable access to the underlying network stack.
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Issue a connect attempt with the current credentials.
    fn start_attempt(&mut self, now: Instant) {
        let creds = match self.credentials.clone() {
            Some(c) => c,
            None => return,
        };

        info!("Connecting to \"{}\"", creds.ssid);
        self.last_attempt = Some(now);
        match self.stack.begin_connect(&creds.ssid, &creds.passphrase) {
            Ok(()) => {
                self.state = ConnectionState::Connecting;
                self.failure = None;
            }
            Err(e) => {
                warn!("Connect attempt rejected: {}", e);
                self.fail(FailureReason::StackRejected, now);
            }
        }
    }

    fn fail(&mut self, reason: FailureReason, now: Instant) {
        self.state = ConnectionState::Failed;
        self.failure = Some(reason);
        // Restart the retry window from the failure point
        self.last_attempt = Some(now);
    }

    fn elapsed_since_attempt(&self, now: Instant) -> Duration {
        match self.last_attempt {
            Some(at) => now.saturating_duration_since(at),
            None => Duration::ZERO,
        }
    }

    fn retry_due(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(at) => now.saturating_duration_since(at) >= self.retry_interval,
            None => true,
        }
    }

    fn seconds_until_retry(&self, now: Instant) -> u64 {
        let elapsed = match self.last_attempt {
            Some(at) => now.saturating_duration_since(at),
            None => return 0,
        };
        let remaining = self.retry_interval.saturating_sub(elapsed);
        // Round up so a freshly failed attempt shows the full interval
        remaining.as_millis().div_ceil(1000) as u64
    }
}
