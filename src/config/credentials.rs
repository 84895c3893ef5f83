//! Network credential set.
//!
//! The three string entries that decide how the node joins a network.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Store key for the network name.
pub const SSID_KEY: &str = "ssid";

/// Store key for the network secret.
pub const PASSWORD_KEY: &str = "password";

/// Store key for the device hostname.
pub const HOSTNAME_KEY: &str = "hostname";

/// Placeholder network name written on first boot.
pub const DEFAULT_SSID: &str = "ssid";

/// Placeholder network secret written on first boot.
pub const DEFAULT_PASSWORD: &str = "password";

/// Hostname written on first boot.
pub const DEFAULT_HOSTNAME: &str = "my_esp";

/// Client-mode credentials plus the hostname to announce.
///
/// Memory is wiped on drop. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
    pub hostname: String,
}

impl Credentials {
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            hostname: hostname.into(),
        }
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }

    /// The `(key, value)` pairs as they are persisted.
    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            (SSID_KEY, self.ssid.as_str()),
            (PASSWORD_KEY, self.password.as_str()),
            (HOSTNAME_KEY, self.hostname.as_str()),
        ]
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_SSID, DEFAULT_PASSWORD, DEFAULT_HOSTNAME)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("password", &"****")
            .field("hostname", &self.hostname)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let creds = Credentials::default();
        assert_eq!(creds.ssid, "ssid");
        assert_eq!(creds.password, "password");
        assert_eq!(creds.hostname, "my_esp");
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("HomeNet", "hunter22", "node");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("HomeNet"));
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn test_entries_order() {
        let creds = Credentials::new("X", "Y", "Z");
        assert_eq!(
            creds.entries(),
            [("ssid", "X"), ("password", "Y"), ("hostname", "Z")]
        );
    }

    #[test]
    fn test_zeroize() {
        let mut creds = Credentials::new("X", "secret", "Z");
        creds.zeroize();
        assert!(creds.password.is_empty());
    }
}
