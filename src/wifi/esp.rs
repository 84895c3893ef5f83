//! ESP-IDF WiFi radio.
//!
//! Wraps the ESP-IDF WiFi driver with a non-blocking station join and an
//! access point on a fixed router subnet.

use super::{RadioError, WifiRadio};
use crate::config::{AccessPointConfig, Credentials};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::ipv4::{self, Mask, RouterConfiguration, Subnet};
use esp_idf_svc::netif::{EspNetif, NetifConfiguration, NetifStack};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};
use esp_idf_sys::EspError;
use log::{info, warn};

/// WiFi radio backed by the ESP-IDF driver.
pub struct EspRadio<'a> {
    wifi: EspWifi<'a>,
}

impl<'a> EspRadio<'a> {
    /// Create a new radio.
    ///
    /// The NVS partition lets the driver keep its calibration data.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        Ok(Self { wifi })
    }

    /// Replace the access-point interface with one on the configured subnet.
    fn configure_ap_netif(&mut self, config: &AccessPointConfig) -> Result<(), EspError> {
        let ap_netif = EspNetif::new_with_conf(&NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(RouterConfiguration {
                subnet: Subnet {
                    gateway: config.address,
                    mask: Mask(config.prefix_len),
                },
                dhcp_enabled: true,
                dns: None,
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        })?;
        let sta_netif = EspNetif::new(NetifStack::Sta)?;
        self.wifi.swap_netif(sta_netif, ap_netif)?;
        Ok(())
    }
}

impl<'a> WifiRadio for EspRadio<'a> {
    fn begin_client(&mut self, credentials: &Credentials) -> Result<(), RadioError> {
        info!("Connecting to WiFi: {}", credentials.ssid);

        // Determine auth method
        let auth_method = if credentials.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let wifi_config = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| RadioError::InvalidSsid)?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| RadioError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&wifi_config)?;
        self.set_hostname(&credentials.hostname)?;
        self.wifi.start()?;

        // Non-blocking: association completes in the driver task
        self.wifi.connect()?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn begin_access_point(&mut self, config: &AccessPointConfig) -> Result<(), RadioError> {
        info!("Starting access point: {}", config.ssid);

        if let Err(e) = self.wifi.disconnect() {
            warn!("Station disconnect before AP start failed: {:?}", e);
        }
        self.wifi.stop()?;
        self.configure_ap_netif(config)?;

        let auth_method = if config.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let ap_config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| RadioError::InvalidSsid)?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| RadioError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&ap_config)?;
        self.wifi.start()?;

        info!(
            "Access point {} up at {}/{}",
            config.ssid, config.address, config.prefix_len
        );
        Ok(())
    }

    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        self.wifi
            .sta_netif_mut()
            .set_hostname(hostname)
            .map_err(|_| RadioError::InvalidHostname)
    }
}
