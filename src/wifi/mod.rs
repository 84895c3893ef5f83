//! WiFi radio abstraction.
//!
//! This trait abstracts over the station/access-point driver so the
//! bootstrap logic runs unchanged on ESP32 and on the host.
//!
//! # Components
//!
//! - [`simulated`] - scriptable radio for host runs and tests
//! - `esp` - ESP-IDF WiFi driver wrapper (ESP32 only)

#[cfg(feature = "esp32")]
mod esp;
pub mod simulated;

#[cfg(feature = "esp32")]
pub use esp::EspRadio;
pub use simulated::SimulatedRadio;

use crate::config::{AccessPointConfig, Credentials};

/// Station/access-point radio driver.
///
/// All methods must return promptly; `begin_client` only starts the
/// association and the caller polls [`is_connected`](Self::is_connected).
pub trait WifiRadio {
    /// Switch to station mode, apply the hostname and start joining.
    fn begin_client(&mut self, credentials: &Credentials) -> Result<(), RadioError>;

    /// Current station link status.
    fn is_connected(&self) -> bool;

    /// Switch to access-point mode and start hosting the network.
    fn begin_access_point(&mut self, config: &AccessPointConfig) -> Result<(), RadioError>;

    /// Apply a hostname to the active interface.
    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError>;
}

/// Errors that can occur during radio operations.
#[derive(Debug)]
pub enum RadioError {
    /// SSID is invalid (too long or contains invalid characters).
    InvalidSsid,
    /// Password is invalid.
    InvalidPassword,
    /// Hostname is invalid.
    InvalidHostname,
    /// Driver refused the request.
    Driver(String),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for RadioError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}

impl std::fmt::Display for RadioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            Self::InvalidHostname => write!(f, "invalid hostname"),
            Self::Driver(msg) => write!(f, "driver error: {}", msg),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for RadioError {}
