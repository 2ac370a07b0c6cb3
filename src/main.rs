//! Station connectivity firmware binary.
//!
//! On ESP32 this brings up the always-on access point, restores any
//! persisted station credentials from NVS, and runs the control loop. On
//! the host it runs the same loop against a simulated radio and a
//! file-backed store, which is enough to exercise the provisioning
//! protocol end to end:
//!
//! ```bash
//! cargo run --bin stationd
//! printf 'STATUS\n' | nc 127.0.0.1 8888
//! ```

use esp_station::config::PROVISIONING_PORT;
use esp_station::{ConnectionManager, Node, ProvisioningServer};

#[cfg(feature = "esp32")]
fn main() {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_station::{EspStationStack, NvsStore};
    use log::error;

    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("=== esp-station starting ===");

    let peripherals = match esp_idf_hal::peripherals::Peripherals::take() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to take peripherals: {:?}", e);
            std::process::exit(1);
        }
    };
    let sysloop = match EspSystemEventLoop::take() {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to take system event loop: {:?}", e);
            std::process::exit(1);
        }
    };

    let stack = match EspStationStack::new(peripherals.modem, sysloop) {
        Ok(s) => s,
        Err(e) => {
            error!("WiFi init failed: {}", e);
            std::process::exit(1);
        }
    };
    let store = match NvsStore::open() {
        Ok(s) => s,
        Err(e) => {
            error!("NVS init failed: {}", e);
            std::process::exit(1);
        }
    };
    let server = match ProvisioningServer::bind(PROVISIONING_PORT) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to bind provisioning port: {}", e);
            std::process::exit(1);
        }
    };

    let mut node = Node::new(ConnectionManager::new(stack), store, server);
    node.bootstrap();
    node.run();
}

#[cfg(not(feature = "esp32"))]
fn main() {
    use esp_station::{FileStore, SimulatedStack};
    use log::{error, info};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== esp-station starting (host simulation) ===");

    let store = match FileStore::open_default() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open credential store: {}", e);
            std::process::exit(1);
        }
    };
    info!("Credential store at {:?}", store.dir());

    let server = match ProvisioningServer::bind(PROVISIONING_PORT) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to bind provisioning port: {}", e);
            std::process::exit(1);
        }
    };

    let mut node = Node::new(ConnectionManager::new(SimulatedStack::new()), store, server);
    node.bootstrap();
    node.run();
}
