//! Network bootstrap for ESP32 nodes.
//!
//! At boot the node joins the WiFi network whose credentials are kept in a
//! small persistent key-value store. When that fails it hosts its own
//! access point with an HTTP form for entering new credentials.
//!
//! Everything except the ESP-IDF radio and NVS region builds and tests on
//! the host machine.

pub mod bootstrap;
pub mod config;
pub mod ota;
pub mod portal;
pub mod store;
pub mod wifi;

// Re-export commonly used items
pub use bootstrap::{BootState, BootstrapBuilder, JoinError, NetworkBootstrap};
pub use config::{AccessPointConfig, BootstrapConfig, ConfigError, Credentials, JoinPolicy};
pub use ota::{LogHooks, NoUpdates, UpdateError, UpdateHooks, UpdateTransport};
pub use store::{KvStore, MemoryRegion, StorageRegion, StoreError, StoreOptions};
pub use wifi::{RadioError, SimulatedRadio, WifiRadio};
