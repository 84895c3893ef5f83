//! Network bootstrap firmware binary.
//!
//! On ESP32 the store lives in NVS and the real radio is driven. On the
//! host the store is a file under `~/.netboot-esp32/` and the radio is
//! simulated; reachable networks come from `NETBOOT_HOST_NETWORKS` as
//! `ssid:password,ssid:password`.

use log::info;
use netboot_esp32::{BootstrapConfig, KvStore, LogHooks, NetworkBootstrap, NoUpdates};
use std::time::Duration;

/// Main loop period between `handle()` calls.
const LOOP_INTERVAL: Duration = Duration::from_millis(10);

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Settings baked in at build time; there is no process environment on the
/// device.
#[cfg(feature = "esp32")]
fn load_config() -> BootstrapConfig {
    let lookup = |key: &str| -> Option<String> {
        let value = match key {
            "NETBOOT_JOIN_ATTEMPTS" => option_env!("NETBOOT_JOIN_ATTEMPTS"),
            "NETBOOT_POLL_INTERVAL_MS" => option_env!("NETBOOT_POLL_INTERVAL_MS"),
            "NETBOOT_JOIN_POLICY" => option_env!("NETBOOT_JOIN_POLICY"),
            "NETBOOT_AP_SSID" => option_env!("NETBOOT_AP_SSID"),
            "NETBOOT_AP_PASSWORD" => option_env!("NETBOOT_AP_PASSWORD"),
            "NETBOOT_HTTP_PORT" => option_env!("NETBOOT_HTTP_PORT"),
            "NETBOOT_REGION_SIZE" => option_env!("NETBOOT_REGION_SIZE"),
            "NETBOOT_WRITE_POLICY" => option_env!("NETBOOT_WRITE_POLICY"),
            "NETBOOT_FLUSH" => option_env!("NETBOOT_FLUSH"),
            _ => None,
        };
        value.map(str::to_string)
    };
    BootstrapConfig::from_lookup(lookup).unwrap_or_else(|e| {
        log::warn!("Invalid build-time setting ({}), using defaults", e);
        BootstrapConfig::default()
    })
}

#[cfg(not(feature = "esp32"))]
fn load_config() -> BootstrapConfig {
    BootstrapConfig::from_env().unwrap_or_else(|e| {
        log::warn!("Invalid environment setting ({}), using defaults", e);
        BootstrapConfig::default()
    })
}

#[cfg(feature = "esp32")]
fn main() {
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use netboot_esp32::store::NvsRegion;
    use netboot_esp32::wifi::EspRadio;

    platform_init();
    info!("=== Netboot starting ===");

    let config = load_config();
    let peripherals = Peripherals::take().expect("Failed to take peripherals");
    let sysloop = EspSystemEventLoop::take().expect("Failed to take event loop");
    let nvs = EspDefaultNvsPartition::take().expect("Failed to take NVS partition");

    let region = NvsRegion::new(nvs.clone(), config.region_size).expect("Failed to open NVS");
    let store = KvStore::with_options(region, config.store);
    let radio = EspRadio::new(peripherals.modem, sysloop, Some(nvs))
        .expect("Failed to initialize WiFi");

    run(store, radio, config);
}

#[cfg(not(feature = "esp32"))]
fn main() {
    use netboot_esp32::store::FileRegion;
    use netboot_esp32::SimulatedRadio;

    platform_init();
    info!("=== Netboot starting (host) ===");

    let config = load_config();
    let region = FileRegion::open_default(config.region_size)
        .expect("Failed to locate store file");
    info!("Store file: {}", region.path().display());
    let store = KvStore::with_options(region, config.store);

    let networks = std::env::var("NETBOOT_HOST_NETWORKS").unwrap_or_default();
    let radio = SimulatedRadio::from_network_list(&networks);

    run(store, radio, config);
}

fn run<R, W>(store: KvStore<R>, radio: W, config: BootstrapConfig) -> !
where
    R: netboot_esp32::StorageRegion,
    W: netboot_esp32::WifiRadio,
{
    let mut boot = NetworkBootstrap::builder(store, radio)
        .config(config)
        .updates(NoUpdates)
        .hooks(LogHooks::new())
        .start();

    info!("Boot finished in state {}", boot.state());
    if let Some(addr) = boot.portal_addr() {
        info!("Open http://{}/ to configure", addr);
    }

    loop {
        boot.handle();
        std::thread::sleep(LOOP_INTERVAL);
    }
}
