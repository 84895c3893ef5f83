//! Network bootstrap controller.
//!
//! Decides the node's network role at boot and mediates configuration
//! updates afterwards.
//!
//! ```text
//! Uninitialized ──► Joining ──┬──► Connected     (link up within the wait)
//!                             └──► AccessPoint   (timeout or radio refusal)
//! ```
//!
//! Both end states last until the next boot. A new credential set is
//! stored and its hostname applied immediately, but the join decision is
//! only re-made after a restart.
//!
//! # Example
//!
//! ```
//! use netboot_esp32::bootstrap::{BootState, NetworkBootstrap};
//! use netboot_esp32::config::BootstrapConfig;
//! use netboot_esp32::store::{KvStore, MemoryRegion};
//! use netboot_esp32::wifi::SimulatedRadio;
//! use std::time::Duration;
//!
//! let config = BootstrapConfig {
//!     poll_interval: Duration::from_millis(1),
//!     http_port: 0,
//!     ..Default::default()
//! };
//! let store = KvStore::new(MemoryRegion::default());
//! let mut boot = NetworkBootstrap::builder(store, SimulatedRadio::new())
//!     .config(config)
//!     .start();
//!
//! // No reachable network: the node hosts its own access point.
//! assert_eq!(boot.state(), BootState::AccessPoint);
//! assert!(!boot.is_connected());
//! boot.handle();
//! ```

use crate::config::{
    BootstrapConfig, Credentials, JoinPolicy, DEFAULT_HOSTNAME, DEFAULT_PASSWORD, DEFAULT_SSID,
    HOSTNAME_KEY, PASSWORD_KEY, SSID_KEY,
};
use crate::ota::{LogHooks, NoUpdates, UpdateHooks, UpdateTransport};
use crate::portal::ConfigPortal;
use crate::store::{KvStore, StorageRegion, StoreError};
use crate::wifi::{RadioError, WifiRadio};
use log::{error, info, warn};
use std::fmt;
use std::net::SocketAddr;
use std::thread;

/// Network role of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Uninitialized,
    /// Waiting for the client link.
    Joining,
    /// Joined the stored network.
    Connected,
    /// Hosting the configuration access point.
    AccessPoint,
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Joining => "joining",
            Self::Connected => "connected",
            Self::AccessPoint => "access-point",
        };
        write!(f, "{}", name)
    }
}

/// Why the client join did not produce a link.
#[derive(Debug)]
pub enum JoinError {
    /// No link within the attempt budget.
    Timeout { attempts: u32 },
    /// The radio refused to start station mode.
    Radio(RadioError),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { attempts } => {
                write!(f, "no link after {} status polls", attempts)
            }
            Self::Radio(e) => write!(f, "radio error: {}", e),
        }
    }
}

impl std::error::Error for JoinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Radio(e) => Some(e),
            Self::Timeout { .. } => None,
        }
    }
}

impl From<RadioError> for JoinError {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

/// Collects the collaborators before the boot sequence runs.
pub struct BootstrapBuilder<R, W> {
    store: KvStore<R>,
    radio: W,
    config: BootstrapConfig,
    updates: Box<dyn UpdateTransport>,
    hooks: Box<dyn UpdateHooks>,
}

impl<R: StorageRegion, W: WifiRadio> BootstrapBuilder<R, W> {
    pub fn config(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Firmware-update transport serviced from `handle()`.
    pub fn updates(mut self, transport: impl UpdateTransport + 'static) -> Self {
        self.updates = Box::new(transport);
        self
    }

    /// Receiver of update lifecycle events. Defaults to [`LogHooks`].
    pub fn hooks(mut self, hooks: impl UpdateHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Run the boot sequence.
    ///
    /// Blocks for at most the join wait under [`JoinPolicy::Bounded`].
    /// Never fails: storage and join problems end in access-point mode.
    pub fn start(self) -> NetworkBootstrap<R, W> {
        let mut boot = NetworkBootstrap {
            store: self.store,
            radio: self.radio,
            config: self.config,
            updates: self.updates,
            hooks: self.hooks,
            state: BootState::Uninitialized,
            credentials: Credentials::default(),
            portal: None,
        };
        boot.boot();
        boot
    }
}

/// Boot-time network role decision plus main-loop servicing.
pub struct NetworkBootstrap<R, W> {
    store: KvStore<R>,
    radio: W,
    config: BootstrapConfig,
    updates: Box<dyn UpdateTransport>,
    hooks: Box<dyn UpdateHooks>,
    state: BootState,
    credentials: Credentials,
    portal: Option<ConfigPortal>,
}

impl<R: StorageRegion, W: WifiRadio> NetworkBootstrap<R, W> {
    /// Start configuring a controller over `store` and `radio`.
    pub fn builder(store: KvStore<R>, radio: W) -> BootstrapBuilder<R, W> {
        BootstrapBuilder {
            store,
            radio,
            config: BootstrapConfig::default(),
            updates: Box::new(NoUpdates),
            hooks: Box::new(LogHooks::new()),
        }
    }

    /// Boot with default settings and no update transport.
    pub fn start(store: KvStore<R>, radio: W) -> Self {
        Self::builder(store, radio).start()
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    /// Credentials this boot used for the join.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Client link status. Always false outside client mode.
    pub fn is_connected(&self) -> bool {
        self.state == BootState::Connected && self.radio.is_connected()
    }

    /// Apply a hostname to the active interface without persisting it.
    pub fn set_hostname(&mut self, hostname: &str) -> Result<(), RadioError> {
        self.radio.set_hostname(hostname)?;
        info!("Hostname set to {}", hostname);
        Ok(())
    }

    /// Address of the configuration portal, when it is running.
    pub fn portal_addr(&self) -> Option<SocketAddr> {
        self.portal.as_ref().and_then(ConfigPortal::local_addr)
    }

    /// Service pending portal requests and update transport work.
    ///
    /// Call from the main loop; returns without blocking.
    pub fn handle(&mut self) {
        if let Some(portal) = self.portal.as_mut() {
            let store = &mut self.store;
            let radio = &mut self.radio;
            portal.poll(|credentials| {
                persist_and_apply(store, radio, credentials).map_err(|e| e.to_string())
            });
        }
        self.updates.poll(self.hooks.as_mut());
    }

    /// Store a new credential set and apply its hostname now.
    ///
    /// The three keys are committed together or not at all. A hostname the
    /// interface refuses is logged; the set still counts as saved. The join
    /// decision itself changes only after a restart.
    pub fn submit_configuration(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        persist_and_apply(&mut self.store, &mut self.radio, credentials)
    }

    pub fn store_mut(&mut self) -> &mut KvStore<R> {
        &mut self.store
    }

    pub fn radio(&self) -> &W {
        &self.radio
    }

    fn boot(&mut self) {
        self.credentials = self.load_or_seed_credentials();
        self.state = BootState::Joining;
        info!(
            "Joining {} as {}",
            self.credentials.ssid, self.credentials.hostname
        );

        match self.join_client() {
            Ok(attempts) => {
                self.state = BootState::Connected;
                info!("Client link up after {} status polls", attempts);
            }
            Err(e) => {
                warn!("Client join failed ({}), starting access point", e);
                self.start_access_point();
            }
        }
    }

    fn load_or_seed_credentials(&mut self) -> Credentials {
        let ssid = self.load_or_seed(SSID_KEY, DEFAULT_SSID);
        let password = self.load_or_seed(PASSWORD_KEY, DEFAULT_PASSWORD);
        let hostname = self.load_or_seed(HOSTNAME_KEY, DEFAULT_HOSTNAME);
        if let Err(e) = self.store.flush() {
            error!("Failed to store defaults: {}", e);
        }
        Credentials::new(ssid, password, hostname)
    }

    /// Stored value, or `default` after writing it. A failed write still
    /// yields the default so boot can continue.
    fn load_or_seed(&mut self, key: &str, default: &str) -> String {
        if let Some(value) = self.store.load_string(key) {
            return value;
        }
        info!("No {} stored, writing default", key);
        if let Err(e) = self.store.add_string(key, default) {
            error!("Failed to store default {}: {}", key, e);
        }
        default.to_string()
    }

    /// Start station mode and wait for the link.
    ///
    /// Returns the number of status polls that preceded the link.
    fn join_client(&mut self) -> Result<u32, JoinError> {
        self.radio.begin_client(&self.credentials)?;

        let max = self.config.join_attempts;
        let mut attempts = 0;
        let connected = loop {
            let connected = self.radio.is_connected();
            let keep_polling = match self.config.join_policy {
                JoinPolicy::Bounded => !connected && attempts < max,
                JoinPolicy::UntilConnected => !connected || attempts < max,
            };
            if !keep_polling {
                break connected;
            }
            thread::sleep(self.config.poll_interval);
            attempts += 1;
        };

        if connected {
            Ok(attempts)
        } else {
            Err(JoinError::Timeout { attempts })
        }
    }

    fn start_access_point(&mut self) {
        self.state = BootState::AccessPoint;

        if let Err(e) = self.radio.begin_access_point(&self.config.access_point) {
            error!("Failed to start access point: {}", e);
        }

        match ConfigPortal::start(None, self.config.http_port) {
            Ok(portal) => self.portal = Some(portal),
            Err(e) => error!("Configuration portal unavailable: {}", e),
        }
    }
}

fn persist_and_apply<R: StorageRegion, W: WifiRadio>(
    store: &mut KvStore<R>,
    radio: &mut W,
    credentials: &Credentials,
) -> Result<(), StoreError> {
    store.add_strings(credentials.entries())?;
    store.flush()?;
    info!(
        "Stored configuration for {}; restart to join",
        credentials.ssid
    );

    if let Err(e) = radio.set_hostname(&credentials.hostname) {
        warn!(
            "Hostname {:?} not applied until restart: {}",
            credentials.hostname, e
        );
    }
    Ok(())
}
