//! Simulated radio.
//!
//! On host systems there is no radio to drive. This radio keeps a list of
//! reachable networks and reports a link once the stored credentials match
//! one of them, optionally after a number of status polls. Clones share
//! state, so a caller can keep a handle to watch what the bootstrap did.

use super::{RadioError, WifiRadio};
use crate::config::{AccessPointConfig, Credentials};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard};

/// Radio operating mode as last requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioMode {
    Off,
    Station { ssid: String },
    AccessPoint { ssid: String },
}

#[derive(Debug)]
struct State {
    networks: Vec<(String, String)>,
    polls_to_connect: u32,
    polls: u32,
    joining: bool,
    mode: RadioMode,
    hostname: Option<String>,
}

/// Host stand-in for the WiFi driver.
#[derive(Debug, Clone)]
pub struct SimulatedRadio {
    state: Arc<Mutex<State>>,
}

impl SimulatedRadio {
    /// A radio with no reachable networks.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                networks: Vec::new(),
                polls_to_connect: 0,
                polls: 0,
                joining: false,
                mode: RadioMode::Off,
                hostname: None,
            })),
        }
    }

    /// Make a network reachable with the given secret.
    pub fn with_network(self, ssid: impl Into<String>, password: impl Into<String>) -> Self {
        self.lock().networks.push((ssid.into(), password.into()));
        self
    }

    /// Report the link only from the `polls`-th status poll onward.
    pub fn connect_after_polls(self, polls: u32) -> Self {
        self.lock().polls_to_connect = polls;
        self
    }

    /// Networks from a `ssid:password,ssid:password` list.
    pub fn from_network_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .fold(Self::new(), |radio, item| {
                let (ssid, password) = item.split_once(':').unwrap_or((item, ""));
                radio.with_network(ssid, password)
            })
    }

    /// Status polls since the last `begin_client`.
    pub fn polls(&self) -> u32 {
        self.lock().polls
    }

    pub fn mode(&self) -> RadioMode {
        self.lock().mode.clone()
    }

    /// Hostname currently applied to the interface.
    pub fn hostname(&self) -> Option<String> {
        self.lock().hostname.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SimulatedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiRadio for SimulatedRadio {
    fn begin_client(&mut self, credentials: &Credentials) -> Result<(), RadioError> {
        if credentials.ssid.is_empty() {
            return Err(RadioError::InvalidSsid);
        }
        let mut state = self.lock();
        state.joining = state
            .networks
            .iter()
            .any(|(ssid, password)| *ssid == credentials.ssid && *password == credentials.password);
        state.polls = 0;
        state.mode = RadioMode::Station {
            ssid: credentials.ssid.clone(),
        };
        state.hostname = Some(credentials.hostname.clone());
        info!("Simulated radio joining {}", credentials.ssid);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let mut state = self.lock();
        if !matches!(state.mode, RadioMode::Station { .. }) {
            return false;
        }
        state.polls += 1;
        state.joining && state.polls >= state.polls_to_connect
    }

    fn begin_access_point(&mut self, config: &AccessPointConfig) -> Result<(), RadioError> {
        let mut state = self.lock();
        state.joining = false;
        state.mode = RadioMode::AccessPoint {
            ssid: config.ssid.clone(),
        };
        info!(
            "Simulated access point {} up at {}",
            config.ssid, config.address
        );
        Ok(())
    }

    fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        self.lock().hostname = Some(hostname.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_network_never_connects() {
        let mut radio = SimulatedRadio::new().with_network("Home", "secret99");
        radio
            .begin_client(&Credentials::new("Other", "secret99", "node"))
            .unwrap();
        assert!(!radio.is_connected());
        assert!(!radio.is_connected());
    }

    #[test]
    fn test_wrong_password_never_connects() {
        let mut radio = SimulatedRadio::new().with_network("Home", "secret99");
        radio
            .begin_client(&Credentials::new("Home", "wrong", "node"))
            .unwrap();
        assert!(!radio.is_connected());
    }

    #[test]
    fn test_connects_after_polls() {
        let mut radio = SimulatedRadio::new()
            .with_network("Home", "secret99")
            .connect_after_polls(3);
        radio
            .begin_client(&Credentials::new("Home", "secret99", "node"))
            .unwrap();
        assert!(!radio.is_connected());
        assert!(!radio.is_connected());
        assert!(radio.is_connected());
        assert_eq!(radio.polls(), 3);
    }

    #[test]
    fn test_hostname_applied_on_join() {
        let mut radio = SimulatedRadio::new();
        let observer = radio.clone();
        radio
            .begin_client(&Credentials::new("Home", "", "greenhouse"))
            .unwrap();
        assert_eq!(observer.hostname().as_deref(), Some("greenhouse"));

        radio.set_hostname("shed").unwrap();
        assert_eq!(observer.hostname().as_deref(), Some("shed"));

        radio.set_hostname("").unwrap();
        assert_eq!(observer.hostname().as_deref(), Some(""));
    }

    #[test]
    fn test_access_point_mode_not_connected() {
        let mut radio = SimulatedRadio::new().with_network("Home", "");
        radio.begin_client(&Credentials::new("Home", "", "n")).unwrap();
        radio
            .begin_access_point(&AccessPointConfig::default())
            .unwrap();
        assert!(!radio.is_connected());
        assert_eq!(
            radio.mode(),
            RadioMode::AccessPoint {
                ssid: "my_esp".to_string()
            }
        );
    }

    #[test]
    fn test_from_network_list() {
        let mut radio = SimulatedRadio::from_network_list("Home:secret99, Cafe:");
        radio.begin_client(&Credentials::new("Cafe", "", "n")).unwrap();
        assert!(radio.is_connected());
        radio
            .begin_client(&Credentials::new("Home", "secret99", "n"))
            .unwrap();
        assert!(radio.is_connected());
    }

    #[test]
    fn test_empty_ssid_rejected() {
        let mut radio = SimulatedRadio::new();
        let result = radio.begin_client(&Credentials::new("", "", "n"));
        assert!(matches!(result, Err(RadioError::InvalidSsid)));
    }
}
