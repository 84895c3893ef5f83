//! File-backed region for host (development) builds.
//!
//! Stores the region image in a file so configuration persists across runs.
//! Uses `~/.netboot-esp32/store.bin` by default.

use super::region::{RegionError, StorageRegion};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Get the default store file path.
///
/// Returns `~/.netboot-esp32/store.bin`
pub fn default_store_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".netboot-esp32").join("store.bin"))
}

/// Region image kept in a host file.
///
/// A missing file reads as an erased region. Writes go to a sibling
/// temporary file which is renamed over the image, so a torn write leaves
/// the previous image intact.
#[derive(Debug, Clone)]
pub struct FileRegion {
    path: PathBuf,
    capacity: usize,
}

impl FileRegion {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    /// Region at the default path.
    pub fn open_default(capacity: usize) -> io::Result<Self> {
        Ok(Self::new(default_store_path()?, capacity))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StorageRegion for FileRegion {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_image(&mut self) -> Result<Vec<u8>, RegionError> {
        let mut image = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No store file at {:?}, using erased region", self.path);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        // Short or missing files read as erased flash past their end.
        image.resize(self.capacity, 0xFF);
        Ok(image)
    }

    fn write_image(&mut self, image: &[u8]) -> Result<(), RegionError> {
        if image.len() != self.capacity {
            return Err(RegionError::SizeMismatch {
                expected: self.capacity,
                actual: image.len(),
            });
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        fs::write(&temp, image)?;
        fs::rename(&temp, &self.path)?;

        // Verify write by reading back
        let read_back = fs::read(&self.path)?;
        if read_back != image {
            return Err(RegionError::VerifyFailed);
        }

        info!("Store image written to {:?}", self.path);
        Ok(())
    }
}
