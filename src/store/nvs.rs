//! NVS-backed region for ESP32.
//!
//! The whole region image is stored as a single NVS blob, so every image
//! write replaces the previous one as a unit.

use super::region::{RegionError, StorageRegion};
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_sys::EspError;
use log::{debug, info};

/// NVS namespace for the key-value store.
const NVS_NAMESPACE: &str = "netboot";

/// NVS key holding the region image.
const NVS_KEY: &str = "kvstore";

/// Region image stored in ESP32 Non-Volatile Storage.
pub struct NvsRegion {
    nvs: EspNvs<NvsDefault>,
    capacity: usize,
}

impl NvsRegion {
    /// Open the store namespace on the given partition.
    ///
    /// The partition handle is shared with the WiFi driver, so it is taken
    /// once by the caller and cloned here.
    pub fn new(partition: EspDefaultNvsPartition, capacity: usize) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        Ok(Self { nvs, capacity })
    }
}

impl StorageRegion for NvsRegion {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_image(&mut self) -> Result<Vec<u8>, RegionError> {
        let mut buf = vec![0xFF; self.capacity];
        let len = match self.nvs.get_raw(NVS_KEY, &mut buf)? {
            Some(bytes) => bytes.len(),
            None => {
                debug!("No store image in NVS, using erased region");
                0
            }
        };
        buf[len..].fill(0xFF);
        Ok(buf)
    }

    fn write_image(&mut self, image: &[u8]) -> Result<(), RegionError> {
        if image.len() != self.capacity {
            return Err(RegionError::SizeMismatch {
                expected: self.capacity,
                actual: image.len(),
            });
        }

        self.nvs.set_raw(NVS_KEY, image)?;

        // Read back and verify to catch silent flash write failures
        let mut verify_buf = vec![0u8; self.capacity];
        let read_back = self
            .nvs
            .get_raw(NVS_KEY, &mut verify_buf)?
            .ok_or(RegionError::VerifyFailed)?;
        if read_back != image {
            log::error!("Store image verification failed - data mismatch after save");
            return Err(RegionError::VerifyFailed);
        }

        info!("Store image saved and verified in NVS");
        Ok(())
    }
}
