//! Provisioning client for the device's command port.
//!
//! Connects to the device (by default over its access-point network),
//! sends one command, and prints the response.
//!
//! Usage:
//!   provision status
//!   provision set <ssid> [passphrase]
//!   provision force-reconnect
//!
//! The target defaults to 192.168.4.1:8888; override it with the
//! DEVICE_ADDR environment variable or `--addr HOST:PORT`.

use esp_station::config::Credentials;
use std::env;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::process;
use std::time::Duration;

/// Device address on its own access-point network.
const DEFAULT_ADDR: &str = "192.168.4.1:8888";

/// Timeout for establishing the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for each read/write on the established connection.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  provision [--addr HOST:PORT] status");
    eprintln!("  provision [--addr HOST:PORT] set <ssid> [passphrase]");
    eprintln!("  provision [--addr HOST:PORT] force-reconnect");
    eprintln!();
    eprintln!("Default target: {} (or DEVICE_ADDR env var)", DEFAULT_ADDR);
    process::exit(2);
}

fn main() {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut addr = env::var("DEVICE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    if args.first().map(String::as_str) == Some("--addr") {
        if args.len() < 2 {
            usage();
        }
        addr = args[1].clone();
        args.drain(..2);
    }

    let request = match args.first().map(String::as_str) {
        Some("status") => "STATUS\n".to_string(),
        Some("force-reconnect") => "FORCE_RECONNECT\n".to_string(),
        Some("set") => {
            let ssid = match args.get(1) {
                Some(s) => s.as_str(),
                None => usage(),
            };
            let passphrase = args.get(2).map(String::as_str).unwrap_or("");

            // Validate locally before bothering the device
            if let Err(e) = Credentials::new(ssid, passphrase) {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
            format!("SET\n{}\n{}\n", ssid, passphrase)
        }
        _ => usage(),
    };

    match exchange(&addr, &request) {
        Ok(response) => print!("{}", response),
        Err(e) => {
            eprintln!("Error talking to {}: {}", addr, e);
            process::exit(1);
        }
    }
}

/// Send one command and collect the full response.
fn exchange(addr: &str, request: &str) -> io::Result<String> {
    let sock_addr = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address for target"))?;

    let mut stream = TcpStream::connect_timeout(&sock_addr, CONNECT_TIMEOUT)?;
    stream.set_read_timeout(Some(EXCHANGE_TIMEOUT))?;
    stream.set_write_timeout(Some(EXCHANGE_TIMEOUT))?;
    let _ = stream.set_nodelay(true);

    stream.write_all(request.as_bytes())?;
    stream.shutdown(Shutdown::Write)?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}
