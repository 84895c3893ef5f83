//! Node configuration.
//!
//! # Components
//!
//! - [`credentials`] - the stored network credential set
//! - [`settings`] - bootstrap tunables and environment overrides

pub mod credentials;
pub mod settings;

pub use credentials::{
    Credentials, DEFAULT_HOSTNAME, DEFAULT_PASSWORD, DEFAULT_SSID, HOSTNAME_KEY, PASSWORD_KEY,
    SSID_KEY,
};
pub use settings::{
    AccessPointConfig, BootstrapConfig, ConfigError, JoinPolicy, DEFAULT_AP_ADDRESS,
    DEFAULT_AP_PASSWORD, DEFAULT_AP_SSID, DEFAULT_HTTP_PORT, DEFAULT_JOIN_ATTEMPTS,
    DEFAULT_POLL_INTERVAL, MAX_PASSWORD_LEN, MAX_SSID_LEN, MIN_PASSWORD_LEN,
};
