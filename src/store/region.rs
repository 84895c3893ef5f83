//! Backing regions for the key-value store.
//!
//! A region is a fixed-size byte image that is always read and written whole.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Default region size, matching the 4 KiB emulated EEPROM of small modules.
pub const DEFAULT_REGION_SIZE: usize = 4096;

/// A fixed-capacity non-volatile byte region.
pub trait StorageRegion {
    /// Region size in bytes. Constant for the lifetime of the region.
    fn capacity(&self) -> usize;

    /// Read the whole region image (`capacity()` bytes).
    fn read_image(&mut self) -> Result<Vec<u8>, RegionError>;

    /// Replace the whole region image. `image.len()` must equal `capacity()`.
    ///
    /// Returns only after the image is committed.
    fn write_image(&mut self, image: &[u8]) -> Result<(), RegionError>;
}

/// In-memory region.
///
/// Clones share the same image, so a test can keep a handle to inspect
/// what the store wrote or to "reboot" a new store over the same data.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    capacity: usize,
    image: Arc<Mutex<Vec<u8>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryRegion {
    /// Create an erased region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            image: Arc::new(Mutex::new(vec![0xFF; capacity])),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of committed image writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Copy of the current image.
    pub fn snapshot(&self) -> Vec<u8> {
        match self.image.lock() {
            Ok(image) => image.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Overwrite bytes at `offset` (for corruption tests).
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        let mut image = match self.image.lock() {
            Ok(image) => image,
            Err(poisoned) => poisoned.into_inner(),
        };
        image[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl Default for MemoryRegion {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_SIZE)
    }
}

impl StorageRegion for MemoryRegion {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_image(&mut self) -> Result<Vec<u8>, RegionError> {
        Ok(self.snapshot())
    }

    fn write_image(&mut self, data: &[u8]) -> Result<(), RegionError> {
        let mut image = self.image.lock().map_err(|_| RegionError::Poisoned)?;
        if data.len() != self.capacity {
            return Err(RegionError::SizeMismatch {
                expected: self.capacity,
                actual: data.len(),
            });
        }
        image.copy_from_slice(data);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Errors from a backing region.
#[derive(Debug)]
pub enum RegionError {
    /// Image size does not match region capacity.
    SizeMismatch { expected: usize, actual: usize },
    /// Data read back after a write differs from what was written.
    VerifyFailed,
    /// Shared image lock was poisoned by a panicking holder.
    Poisoned,
    /// Host file I/O error.
    Io(std::io::Error),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl std::fmt::Display for RegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "image size {} does not match region size {}", actual, expected)
            }
            Self::VerifyFailed => write!(f, "read-back verification failed"),
            Self::Poisoned => write!(f, "region lock poisoned"),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for RegionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RegionError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for RegionError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_region_is_erased() {
        let mut region = MemoryRegion::new(16);
        assert_eq!(region.capacity(), 16);
        assert_eq!(region.read_image().unwrap(), vec![0xFF; 16]);
        assert_eq!(region.write_count(), 0);
    }

    #[test]
    fn test_clones_share_image() {
        let mut region = MemoryRegion::new(4);
        let observer = region.clone();
        region.write_image(&[1, 2, 3, 4]).unwrap();
        assert_eq!(observer.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(observer.write_count(), 1);
    }

    #[test]
    fn test_size_mismatch() {
        let mut region = MemoryRegion::new(4);
        let result = region.write_image(&[1, 2]);
        assert!(matches!(
            result,
            Err(RegionError::SizeMismatch {
                expected: 4,
                actual: 2
            })
        ));
        assert_eq!(region.write_count(), 0);
    }
}
