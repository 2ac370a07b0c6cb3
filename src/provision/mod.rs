//! Line-oriented provisioning protocol.
//!
//! Remote clients reconfigure the station connection over a plain-text TCP
//! protocol: one request/response exchange per connection, newline
//! delimited.
//!
//! # Commands
//!
//! | Verb              | Follow-up lines        | Response                          |
//! |-------------------|------------------------|-----------------------------------|
//! | `SET`             | `<ssid>`, `<passphrase>` | `Credentials saved. Connecting...` |
//! | `STATUS`          | none                   | multi-line status report          |
//! | `FORCE_RECONNECT` | none                   | `Forcing reconnection...`         |

mod command;
mod server;

pub use command::{read_command, Command, ProtocolError, MAX_LINE_BYTES};
pub use server::{
    execute, ProvisioningServer, RESP_FORCING, RESP_INVALID, RESP_NO_CREDENTIALS, RESP_SAVED,
    RESP_UNKNOWN,
};
