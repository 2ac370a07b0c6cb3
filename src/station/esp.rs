//! ESP-IDF network stack adapter.
//!
//! Wraps the ESP-IDF WiFi driver in mixed AP+STA mode: the access point is
//! configured once from the constants in [`crate::config`] and stays up
//! regardless of station state, while the station side is driven through
//! the [`NetworkStack`] trait. Connect attempts are issued non-blocking;
//! the connection manager polls the driver status.

use super::stack::{LinkInfo, NetworkStack, StackError, StationStatus};
use crate::config::{AP_PASSPHRASE, AP_SSID};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};
use log::info;
use std::net::Ipv4Addr;

/// ESP32 WiFi stack in mixed AP+STA mode.
pub struct EspStationStack<'a> {
    wifi: EspWifi<'a>,
    attempt_in_flight: bool,
}

impl<'a> EspStationStack<'a> {
    /// Initialize the driver and bring up the always-on access point.
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, StackError> {
        let mut wifi = EspWifi::new(modem, sysloop, None)
            .map_err(|e| StackError::new(format!("driver init: {:?}", e)))?;

        // AP only until credentials arrive; the station side joins the
        // configuration on the first connect attempt
        wifi.set_configuration(&Configuration::AccessPoint(Self::ap_configuration()?))
            .map_err(|e| StackError::new(format!("AP configuration: {:?}", e)))?;
        wifi.start()
            .map_err(|e| StackError::new(format!("driver start: {:?}", e)))?;

        info!("Access point \"{}\" up", AP_SSID);
        Ok(Self {
            wifi,
            attempt_in_flight: false,
        })
    }

    fn ap_configuration() -> Result<AccessPointConfiguration, StackError> {
        Ok(AccessPointConfiguration {
            ssid: AP_SSID
                .try_into()
                .map_err(|_| StackError::new("AP SSID too long for driver"))?,
            password: AP_PASSPHRASE
                .try_into()
                .map_err(|_| StackError::new("AP passphrase too long for driver"))?,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        })
    }

    /// Station RSSI from the driver, if associated.
    fn rssi_dbm(&self) -> Option<i32> {
        let mut record = esp_idf_sys::wifi_ap_record_t::default();
        let err = unsafe { esp_idf_sys::esp_wifi_sta_get_ap_info(&mut record) };
        (err == esp_idf_sys::ESP_OK).then(|| record.rssi as i32)
    }
}

impl NetworkStack for EspStationStack<'_> {
    fn begin_connect(&mut self, ssid: &str, passphrase: &str) -> Result<(), StackError> {
        let auth_method = if passphrase.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let client = ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| StackError::new("SSID too long for driver"))?,
            password: passphrase
                .try_into()
                .map_err(|_| StackError::new("passphrase too long for driver"))?,
            auth_method,
            ..Default::default()
        };

        // Drop any previous association before reconfiguring
        if self.attempt_in_flight || self.wifi.is_connected().unwrap_or(false) {
            let _ = self.wifi.disconnect();
        }

        self.wifi
            .set_configuration(&Configuration::Mixed(client, Self::ap_configuration()?))
            .map_err(|e| StackError::new(format!("station configuration: {:?}", e)))?;
        self.wifi
            .connect()
            .map_err(|e| StackError::new(format!("connect: {:?}", e)))?;

        self.attempt_in_flight = true;
        Ok(())
    }

    fn status(&self) -> StationStatus {
        if self.wifi.is_connected().unwrap_or(false) {
            StationStatus::Connected
        } else if self.attempt_in_flight {
            StationStatus::Connecting
        } else {
            StationStatus::Idle
        }
    }

    fn link_info(&self) -> Option<LinkInfo> {
        if !self.wifi.is_connected().unwrap_or(false) {
            return None;
        }
        let ip_info = self.wifi.sta_netif().get_ip_info().ok()?;
        Some(LinkInfo {
            address: Ipv4Addr::from(ip_info.ip),
            gateway: Ipv4Addr::from(ip_info.subnet.gateway),
            rssi_dbm: self.rssi_dbm().unwrap_or(0),
        })
    }
}
