//! Provisioning command parsing.
//!
//! The protocol is plain text, one command per connection. The first line
//! is the verb; `SET` reads two further lines (SSID, then passphrase).
//! Verbs are case-sensitive and every line is trimmed of surrounding
//! whitespace. Lines are capped at [`MAX_LINE_BYTES`]; a longer line
//! aborts the exchange, so a client can never make the device buffer an
//! unbounded amount of input.

use std::fmt;
use std::io::{self, BufRead, Read};

/// Longest accepted command line, terminator included. Generous for the
/// longest legal input, a `SET` passphrase line of 64 bytes plus
/// surrounding whitespace.
pub const MAX_LINE_BYTES: u64 = 128;

/// A parsed provisioning request. Constructed per connection, discarded
/// after the response is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store new station credentials and connect. Fields are raw protocol
    /// input; validation happens at dispatch.
    Set { ssid: String, passphrase: String },
    /// Report access-point and station state.
    Status,
    /// Re-attempt the station connection immediately.
    ForceReconnect,
    /// Anything unrecognized, kept verbatim for the error response.
    Unknown(String),
}

/// Read one command from the connection.
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Command, ProtocolError> {
    let verb = match read_trimmed_line(reader)? {
        Some(line) => line,
        None => return Err(ProtocolError::ConnectionClosed),
    };

    match verb.as_str() {
        "SET" => {
            let ssid = read_trimmed_line(reader)?.ok_or(ProtocolError::MissingCredentials)?;
            let passphrase =
                read_trimmed_line(reader)?.ok_or(ProtocolError::MissingCredentials)?;
            Ok(Command::Set { ssid, passphrase })
        }
        "STATUS" => Ok(Command::Status),
        "FORCE_RECONNECT" => Ok(Command::ForceReconnect),
        _ => Ok(Command::Unknown(verb)),
    }
}

/// Read a single line, trimmed. Returns `None` on a clean end of stream
/// and an error for a line exceeding [`MAX_LINE_BYTES`].
fn read_trimmed_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let mut limited = reader.take(MAX_LINE_BYTES);
    let mut line = String::new();
    let read = limited.read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    // Hitting the cap without a terminator means the real line goes on
    if read as u64 == MAX_LINE_BYTES && !line.ends_with('\n') {
        return Err(ProtocolError::LineTooLong);
    }
    Ok(Some(line.trim().to_string()))
}

/// Errors reading a command off the wire.
#[derive(Debug)]
pub enum ProtocolError {
    /// The client closed the connection before sending a command.
    ConnectionClosed,
    /// `SET` was missing its SSID or passphrase line.
    MissingCredentials,
    /// A line exceeded [`MAX_LINE_BYTES`].
    LineTooLong,
    /// I/O failure, including an expired read deadline.
    Io(io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection closed before a command was sent"),
            Self::MissingCredentials => write!(f, "SET is missing its credential lines"),
            Self::LineTooLong => write!(f, "command line exceeds {} bytes", MAX_LINE_BYTES),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
