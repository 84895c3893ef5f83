//! Bootstrap tunables.
//!
//! Platform-independent settings for the join wait, the fallback access
//! point, the configuration portal and the store. Defaults reproduce the
//! behaviour of the stock firmware; every field can be overridden from
//! `NETBOOT_*` variables.
//!
//! # Example
//!
//! ```
//! use netboot_esp32::config::{BootstrapConfig, JoinPolicy};
//!
//! let config = BootstrapConfig::from_lookup(|key| match key {
//!     "NETBOOT_JOIN_ATTEMPTS" => Some("3".to_string()),
//!     "NETBOOT_JOIN_POLICY" => Some("until-connected".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//! assert_eq!(config.join_attempts, 3);
//! assert_eq!(config.join_policy, JoinPolicy::UntilConnected);
//! ```

use crate::store::{FlushMode, StoreOptions, WritePolicy, DEFAULT_REGION_SIZE};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum password length for WPA2.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Default number of link-status polls during the client join.
pub const DEFAULT_JOIN_ATTEMPTS: u32 = 10;

/// Default delay between link-status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fallback access point name.
pub const DEFAULT_AP_SSID: &str = "my_esp";

/// Fallback access point secret.
pub const DEFAULT_AP_PASSWORD: &str = "12345678";

/// Fallback access point address (also gateway).
pub const DEFAULT_AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Fallback access point netmask prefix length.
pub const DEFAULT_AP_PREFIX_LEN: u8 = 24;

/// Default configuration portal port.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// How long the client join keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Stop after `join_attempts` polls, or earlier once connected.
    #[default]
    Bounded,
    /// Poll at least `join_attempts` times, then keep polling until
    /// connected. Never falls back to access-point mode.
    UntilConnected,
}

impl FromStr for JoinPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bounded" => Ok(Self::Bounded),
            "until-connected" => Ok(Self::UntilConnected),
            _ => Err(ConfigError::InvalidValue {
                key: "NETBOOT_JOIN_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

/// Self-hosted access point settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointConfig {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network password (8-64 bytes for WPA2, empty for an open AP).
    pub password: String,
    /// Address of the node on the AP network.
    pub address: Ipv4Addr,
    /// Netmask prefix length.
    pub prefix_len: u8,
}

impl AccessPointConfig {
    /// Create an access point configuration on the default address.
    ///
    /// Returns an error if SSID or password are invalid.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            ssid: ssid.into(),
            password: password.into(),
            address: DEFAULT_AP_ADDRESS,
            prefix_len: DEFAULT_AP_PREFIX_LEN,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the SSID and secret against what the radio will accept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ssid_len = self.ssid.len();
        if !(1..=MAX_SSID_LEN).contains(&ssid_len) {
            return Err(ConfigError::ApSsidLength { len: ssid_len });
        }
        // WPA2 needs 8..=64 bytes; an empty secret means an open AP.
        let password_len = self.password.len();
        if !self.is_open() && !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(ConfigError::ApPasswordLength { len: password_len });
        }
        Ok(())
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: DEFAULT_AP_SSID.to_string(),
            password: DEFAULT_AP_PASSWORD.to_string(),
            address: DEFAULT_AP_ADDRESS,
            prefix_len: DEFAULT_AP_PREFIX_LEN,
        }
    }
}

/// Everything the bootstrap controller needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Link-status polls during the client join.
    pub join_attempts: u32,
    /// Delay between polls.
    pub poll_interval: Duration,
    pub join_policy: JoinPolicy,
    pub access_point: AccessPointConfig,
    /// Port of the configuration portal in access-point mode.
    pub http_port: u16,
    /// Region size in bytes for the store.
    pub region_size: usize,
    pub store: StoreOptions,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            join_attempts: DEFAULT_JOIN_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_policy: JoinPolicy::default(),
            access_point: AccessPointConfig::default(),
            http_port: DEFAULT_HTTP_PORT,
            region_size: DEFAULT_REGION_SIZE,
            store: StoreOptions::default(),
        }
    }
}

impl BootstrapConfig {
    /// Defaults overridden by `NETBOOT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    ///
    /// Recognised keys: `NETBOOT_JOIN_ATTEMPTS`, `NETBOOT_POLL_INTERVAL_MS`,
    /// `NETBOOT_JOIN_POLICY`, `NETBOOT_AP_SSID`, `NETBOOT_AP_PASSWORD`,
    /// `NETBOOT_HTTP_PORT`, `NETBOOT_REGION_SIZE`, `NETBOOT_WRITE_POLICY`,
    /// `NETBOOT_FLUSH`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("NETBOOT_JOIN_ATTEMPTS") {
            config.join_attempts = parse_number("NETBOOT_JOIN_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("NETBOOT_POLL_INTERVAL_MS") {
            config.poll_interval =
                Duration::from_millis(parse_number("NETBOOT_POLL_INTERVAL_MS", &v)?);
        }
        if let Some(v) = lookup("NETBOOT_JOIN_POLICY") {
            config.join_policy = v.parse()?;
        }
        if let Some(v) = lookup("NETBOOT_AP_SSID") {
            config.access_point.ssid = v;
        }
        if let Some(v) = lookup("NETBOOT_AP_PASSWORD") {
            config.access_point.password = v;
        }
        if let Some(v) = lookup("NETBOOT_HTTP_PORT") {
            config.http_port = parse_number("NETBOOT_HTTP_PORT", &v)?;
        }
        if let Some(v) = lookup("NETBOOT_REGION_SIZE") {
            config.region_size = parse_number("NETBOOT_REGION_SIZE", &v)?;
        }
        if let Some(v) = lookup("NETBOOT_WRITE_POLICY") {
            config.store.write_policy = match v.trim().to_lowercase().as_str() {
                "replace" => WritePolicy::ReplaceOnWrite,
                "append" => WritePolicy::Append,
                _ => return Err(invalid("NETBOOT_WRITE_POLICY", &v)),
            };
        }
        if let Some(v) = lookup("NETBOOT_FLUSH") {
            config.store.flush_mode = match v.trim().to_lowercase().as_str() {
                "immediate" => FlushMode::Immediate,
                "deferred" => FlushMode::Deferred,
                _ => return Err(invalid("NETBOOT_FLUSH", &v)),
            };
        }

        config.access_point.validate()?;
        Ok(config)
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

/// Rejected bootstrap setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Access point SSID outside 1..=32 bytes.
    ApSsidLength { len: usize },
    /// Access point secret neither empty nor 8..=64 bytes.
    ApPasswordLength { len: usize },
    /// A setting could not be parsed.
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApSsidLength { len } => write!(
                f,
                "access point SSID is {} bytes, expected 1..={}",
                len, MAX_SSID_LEN
            ),
            Self::ApPasswordLength { len } => write!(
                f,
                "access point password is {} bytes, expected 0 or {}..={}",
                len, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            ),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
