//! Persistent key-value store.
//!
//! A flat store of typed entries kept as fixed-width records in a
//! [`StorageRegion`]. Every mutation rewrites the whole region image, and
//! every lookup re-reads it, so the region is always the source of truth.
//!
//! # Components
//!
//! - [`entry`] - entry type and record codec
//! - [`region`] - region trait and in-memory region
//! - `file` - host file region (host only)
//! - `nvs` - NVS blob region (ESP32 only)
//!
//! # Example
//!
//! ```
//! use netboot_esp32::store::{KvStore, MemoryRegion};
//!
//! let mut store = KvStore::new(MemoryRegion::default());
//! store.add_string("hostname", "greenhouse").unwrap();
//! store.add_byte("channel", 6).unwrap();
//!
//! assert_eq!(store.load_string("hostname").as_deref(), Some("greenhouse"));
//! assert_eq!(store.load_byte("channel"), Some(6));
//! assert_eq!(store.load_string("missing"), None);
//! ```

pub mod entry;
#[cfg(not(feature = "esp32"))]
mod file;
#[cfg(feature = "esp32")]
mod nvs;
pub mod region;

pub use entry::{Entry, Value, MAX_KEY_LEN, MAX_VALUE_LEN, RECORD_WIDTH};
#[cfg(not(feature = "esp32"))]
pub use file::{default_store_path, FileRegion};
#[cfg(feature = "esp32")]
pub use nvs::NvsRegion;
pub use region::{MemoryRegion, RegionError, StorageRegion, DEFAULT_REGION_SIZE};

use log::{debug, warn};

/// What an add does when the key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Replace the existing entry in place. Keys stay unique.
    #[default]
    ReplaceOnWrite,
    /// Append a new record. Lookups return the first match, so the older
    /// record keeps shadowing the new one until the store is cleared.
    Append,
}

/// When the working set is written to the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Every add is committed before it returns.
    #[default]
    Immediate,
    /// Adds stay in memory until [`KvStore::flush`].
    Deferred,
}

/// Store behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreOptions {
    pub write_policy: WritePolicy,
    pub flush_mode: FlushMode,
}

/// Key-value store over a fixed-size region.
pub struct KvStore<R> {
    region: R,
    entries: Vec<Entry>,
    options: StoreOptions,
    /// Working set holds adds not yet written (deferred mode only).
    dirty: bool,
}

impl<R: StorageRegion> KvStore<R> {
    /// Create a store with immediate flush and replace-on-write.
    pub fn new(region: R) -> Self {
        Self::with_options(region, StoreOptions::default())
    }

    pub fn with_options(region: R, options: StoreOptions) -> Self {
        Self {
            region,
            entries: Vec::new(),
            options,
            dirty: false,
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Number of record slots the region holds.
    pub fn slot_count(&self) -> usize {
        self.region.capacity() / RECORD_WIDTH
    }

    /// Whether adds are waiting for [`flush`](Self::flush).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn into_region(self) -> R {
        self.region
    }

    /// Add a string entry.
    pub fn add_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.add(Entry::string(key, value)?)
    }

    /// Add a byte entry.
    pub fn add_byte(&mut self, key: &str, value: u8) -> Result<(), StoreError> {
        self.add(Entry::byte(key, value)?)
    }

    /// Add several string entries as one change.
    ///
    /// Either every entry is applied and committed in a single region write,
    /// or on error none is and the working set is untouched.
    pub fn add_strings<I, K, V>(&mut self, pairs: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let batch = pairs
            .into_iter()
            .map(|(key, value)| Entry::string(key.as_ref(), value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.add_batch(batch)
    }

    /// Value of the first string entry named `key`.
    ///
    /// Read failures are logged and reported as not found.
    pub fn load_string(&mut self, key: &str) -> Option<String> {
        self.lookup(key, |entry| entry.as_str().map(str::to_string))
    }

    /// Value of the first byte entry named `key`.
    pub fn load_byte(&mut self, key: &str) -> Option<u8> {
        self.lookup(key, Entry::as_byte)
    }

    /// All live entries in stored order.
    pub fn entries(&mut self) -> Result<&[Entry], StoreError> {
        self.refresh()?;
        Ok(&self.entries)
    }

    /// Number of live entries.
    pub fn len(&mut self) -> Result<usize, StoreError> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&mut self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Write a pending deferred working set. No-op when nothing is pending.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let image = self.encode(&self.entries);
        self.region.write_image(&image)?;
        self.dirty = false;
        debug!("Flushed {} entries", self.entries.len());
        Ok(())
    }

    /// Erase every entry. Always committed immediately.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let image = self.encode(&[]);
        self.region.write_image(&image)?;
        self.entries.clear();
        self.dirty = false;
        warn!("Store cleared");
        Ok(())
    }

    fn add(&mut self, entry: Entry) -> Result<(), StoreError> {
        self.add_batch(vec![entry])
    }

    fn add_batch(&mut self, batch: Vec<Entry>) -> Result<(), StoreError> {
        self.refresh()?;

        let slots = self.slot_count();
        let mut next = self.entries.clone();
        for entry in batch {
            let existing = match self.options.write_policy {
                WritePolicy::ReplaceOnWrite => next.iter().position(|e| e.key() == entry.key()),
                WritePolicy::Append => None,
            };
            match existing {
                Some(index) => next[index] = entry,
                None if next.len() >= slots => {
                    return Err(StoreError::CapacityExceeded { slots });
                }
                None => next.push(entry),
            }
        }

        match self.options.flush_mode {
            FlushMode::Immediate => {
                let image = self.encode(&next);
                self.region.write_image(&image)?;
            }
            FlushMode::Deferred => self.dirty = true,
        }
        self.entries = next;
        Ok(())
    }

    fn lookup<T>(&mut self, key: &str, pick: impl Fn(&Entry) -> Option<T>) -> Option<T> {
        if let Err(e) = self.refresh() {
            warn!("Failed to load store: {}", e);
            return None;
        }
        self.entries
            .iter()
            .filter(|entry| entry.key() == key)
            .find_map(pick)
    }

    /// Reload the working set from the region unless it holds unflushed adds.
    fn refresh(&mut self) -> Result<(), StoreError> {
        if self.dirty {
            return Ok(());
        }
        let image = self.region.read_image()?;
        self.entries = image
            .chunks_exact(RECORD_WIDTH)
            .enumerate()
            .filter_map(|(slot, record)| match Entry::decode(record) {
                Ok(entry) => entry,
                Err(reason) => {
                    warn!("Skipping corrupt store slot {}: {}", slot, reason);
                    None
                }
            })
            .collect();
        Ok(())
    }

    /// Full region image for `entries`; unused slots are zeroed.
    fn encode(&self, entries: &[Entry]) -> Vec<u8> {
        let mut image = vec![0u8; self.region.capacity()];
        for (entry, record) in entries.iter().zip(image.chunks_exact_mut(RECORD_WIDTH)) {
            entry.encode_into(record);
        }
        image
    }
}

/// Errors from store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Key is empty.
    KeyEmpty,
    /// Key exceeds [`MAX_KEY_LEN`].
    KeyTooLong { len: usize, max: usize },
    /// Key contains a NUL byte, which the record format uses as padding.
    KeyContainsNul,
    /// String value exceeds [`MAX_VALUE_LEN`].
    ValueTooLong { len: usize, max: usize },
    /// String value contains a NUL byte.
    ValueContainsNul,
    /// Every record slot is in use.
    CapacityExceeded { slots: usize },
    /// Backing region failed.
    Region(RegionError),
}

impl PartialEq for StoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyEmpty, Self::KeyEmpty)
            | (Self::KeyContainsNul, Self::KeyContainsNul)
            | (Self::ValueContainsNul, Self::ValueContainsNul) => true,
            (Self::KeyTooLong { len: a, max: b }, Self::KeyTooLong { len: c, max: d })
            | (Self::ValueTooLong { len: a, max: b }, Self::ValueTooLong { len: c, max: d }) => {
                a == c && b == d
            }
            (Self::CapacityExceeded { slots: a }, Self::CapacityExceeded { slots: b }) => a == b,
            // Region errors carry I/O errors, which have no equality.
            _ => false,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyEmpty => write!(f, "key cannot be empty"),
            Self::KeyTooLong { len, max } => {
                write!(f, "key too long: {} bytes (max {})", len, max)
            }
            Self::KeyContainsNul => write!(f, "key contains a NUL byte"),
            Self::ValueTooLong { len, max } => {
                write!(f, "value too long: {} bytes (max {})", len, max)
            }
            Self::ValueContainsNul => write!(f, "value contains a NUL byte"),
            Self::CapacityExceeded { slots } => {
                write!(f, "store full: all {} slots in use", slots)
            }
            Self::Region(e) => write!(f, "storage region error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Region(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegionError> for StoreError {
    fn from(e: RegionError) -> Self {
        Self::Region(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Region with room for exactly `slots` records.
    fn region_with_slots(slots: usize) -> MemoryRegion {
        MemoryRegion::new(slots * RECORD_WIDTH)
    }

    #[test]
    fn test_slot_count_from_capacity() {
        let store = KvStore::new(MemoryRegion::new(DEFAULT_REGION_SIZE));
        assert_eq!(store.slot_count(), 14);

        let store = KvStore::new(MemoryRegion::new(RECORD_WIDTH - 1));
        assert_eq!(store.slot_count(), 0);
    }

    #[test]
    fn test_string_roundtrip() {
        let mut store = KvStore::new(MemoryRegion::default());
        store.add_string("ssid", "HomeNet").unwrap();
        assert_eq!(store.load_string("ssid").as_deref(), Some("HomeNet"));
    }

    #[test]
    fn test_byte_roundtrip() {
        let mut store = KvStore::new(MemoryRegion::default());
        store.add_byte("channel", 11).unwrap();
        assert_eq!(store.load_byte("channel"), Some(11));
    }

    #[test]
    fn test_not_found() {
        let mut store = KvStore::new(MemoryRegion::default());
        assert_eq!(store.load_string("ssid"), None);
        assert_eq!(store.load_byte("ssid"), None);
    }

    #[test]
    fn test_lookup_respects_tag() {
        let mut store = KvStore::new(MemoryRegion::default());
        store.add_byte("flag", 1).unwrap();
        store.add_string("name", "x").unwrap();
        assert_eq!(store.load_string("flag"), None);
        assert_eq!(store.load_byte("name"), None);
    }

    #[test]
    fn test_repeated_loads_identical() {
        let mut store = KvStore::new(MemoryRegion::default());
        store.add_string("hostname", "node").unwrap();
        store.add_byte("mode", 2).unwrap();

        let first = (store.load_string("hostname"), store.load_byte("mode"));
        for _ in 0..5 {
            assert_eq!((store.load_string("hostname"), store.load_byte("mode")), first);
        }
    }

    #[test]
    fn test_boundary_lengths_persist() {
        let region = MemoryRegion::default();
        let key = "k".repeat(MAX_KEY_LEN);
        let value = "v".repeat(MAX_VALUE_LEN);

        let mut store = KvStore::new(region.clone());
        store.add_string(&key, &value).unwrap();

        let mut reopened = KvStore::new(region);
        assert_eq!(reopened.load_string(&key), Some(value));
    }

    #[test]
    fn test_over_bound_rejected_without_write() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());

        let result = store.add_string("ssid", &"v".repeat(MAX_VALUE_LEN + 1));
        assert_eq!(
            result,
            Err(StoreError::ValueTooLong { len: 256, max: 255 })
        );
        let result = store.add_byte(&"k".repeat(MAX_KEY_LEN + 1), 1);
        assert_eq!(result, Err(StoreError::KeyTooLong { len: 33, max: 32 }));

        assert_eq!(region.write_count(), 0);
        assert_eq!(store.load_string("ssid"), None);
    }

    #[test]
    fn test_every_add_is_written() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store.add_string("a", "1").unwrap();
        store.add_string("b", "2").unwrap();
        store.add_byte("c", 3).unwrap();
        assert_eq!(region.write_count(), 3);
    }

    #[test]
    fn test_persists_across_instances() {
        let region = MemoryRegion::default();
        {
            let mut store = KvStore::new(region.clone());
            store.add_string("password", "hunter22").unwrap();
        }
        let mut store = KvStore::new(region);
        assert_eq!(store.load_string("password").as_deref(), Some("hunter22"));
    }

    #[test]
    fn test_reads_see_external_writes() {
        let region = MemoryRegion::default();
        let mut reader = KvStore::new(region.clone());
        assert_eq!(reader.load_string("ssid"), None);

        let mut writer = KvStore::new(region);
        writer.add_string("ssid", "Late").unwrap();

        assert_eq!(reader.load_string("ssid").as_deref(), Some("Late"));
    }

    #[test]
    fn test_replace_on_write_updates_value() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store.add_string("hostname", "old").unwrap();
        store.add_string("hostname", "new").unwrap();

        assert_eq!(store.load_string("hostname").as_deref(), Some("new"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_replace_on_write_changes_tag() {
        let mut store = KvStore::new(MemoryRegion::default());
        store.add_string("mode", "auto").unwrap();
        store.add_byte("mode", 4).unwrap();

        assert_eq!(store.load_string("mode"), None);
        assert_eq!(store.load_byte("mode"), Some(4));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_append_policy_first_match_wins() {
        let options = StoreOptions {
            write_policy: WritePolicy::Append,
            ..Default::default()
        };
        let mut store = KvStore::with_options(MemoryRegion::default(), options);
        store.add_string("hostname", "first").unwrap();
        store.add_string("hostname", "second").unwrap();

        // The newer record exists but the older one is still returned.
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.load_string("hostname").as_deref(), Some("first"));
    }

    #[test]
    fn test_capacity_exceeded() {
        let region = region_with_slots(2);
        let mut store = KvStore::new(region.clone());
        store.add_string("a", "1").unwrap();
        store.add_string("b", "2").unwrap();

        let result = store.add_string("c", "3");
        assert_eq!(result, Err(StoreError::CapacityExceeded { slots: 2 }));
        assert_eq!(region.write_count(), 2);
        assert_eq!(store.load_string("a").as_deref(), Some("1"));
        assert_eq!(store.load_string("b").as_deref(), Some("2"));
        assert_eq!(store.load_string("c"), None);
    }

    #[test]
    fn test_replace_allowed_when_full() {
        let mut store = KvStore::new(region_with_slots(1));
        store.add_string("ssid", "one").unwrap();
        store.add_string("ssid", "two").unwrap();
        assert_eq!(store.load_string("ssid").as_deref(), Some("two"));
    }

    #[test]
    fn test_append_policy_hits_capacity() {
        let options = StoreOptions {
            write_policy: WritePolicy::Append,
            ..Default::default()
        };
        let mut store = KvStore::with_options(region_with_slots(1), options);
        store.add_string("ssid", "one").unwrap();
        assert_eq!(
            store.add_string("ssid", "two"),
            Err(StoreError::CapacityExceeded { slots: 1 })
        );
    }

    #[test]
    fn test_add_strings_single_write() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store
            .add_strings([("ssid", "Net"), ("password", "secret99"), ("hostname", "shed")])
            .unwrap();

        assert_eq!(region.write_count(), 1);
        assert_eq!(store.load_string("hostname").as_deref(), Some("shed"));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_add_strings_over_capacity_applies_nothing() {
        let region = region_with_slots(3);
        let mut store = KvStore::new(region.clone());
        store.add_string("ssid", "Old").unwrap();
        store.add_string("password", "oldsecret").unwrap();

        let result = store.add_strings([("ssid", "New"), ("hostname", "a"), ("extra", "b")]);
        assert_eq!(result, Err(StoreError::CapacityExceeded { slots: 3 }));
        assert_eq!(region.write_count(), 2);
        assert_eq!(store.load_string("ssid").as_deref(), Some("Old"));
        assert_eq!(store.load_string("hostname"), None);
    }

    #[test]
    fn test_add_strings_invalid_entry_applies_nothing() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        let long = "v".repeat(MAX_VALUE_LEN + 1);

        let result = store.add_strings([("ssid", "New"), ("password", long.as_str())]);
        assert!(matches!(result, Err(StoreError::ValueTooLong { .. })));
        assert_eq!(region.write_count(), 0);
        assert_eq!(store.load_string("ssid"), None);
    }

    #[test]
    fn test_deferred_failed_batch_stays_clean() {
        let region = region_with_slots(4);
        let options = StoreOptions {
            write_policy: WritePolicy::Append,
            flush_mode: FlushMode::Deferred,
        };
        let mut store = KvStore::with_options(region.clone(), options);
        store
            .add_strings([("ssid", "ssid"), ("password", "password"), ("hostname", "my_esp")])
            .unwrap();
        store.flush().unwrap();

        let result = store.add_strings([("ssid", "X"), ("password", "Y"), ("hostname", "Z")]);
        assert_eq!(result, Err(StoreError::CapacityExceeded { slots: 4 }));
        assert!(!store.is_dirty());

        store.flush().unwrap();
        assert_eq!(region.write_count(), 1);
        assert_eq!(KvStore::new(region).len().unwrap(), 3);
    }

    #[test]
    fn test_deferred_flush() {
        let region = MemoryRegion::default();
        let options = StoreOptions {
            flush_mode: FlushMode::Deferred,
            ..Default::default()
        };
        let mut store = KvStore::with_options(region.clone(), options);
        store.add_string("ssid", "Net").unwrap();
        store.add_string("password", "secret99").unwrap();

        assert!(store.is_dirty());
        assert_eq!(region.write_count(), 0);
        // Reads are served from the pending working set.
        assert_eq!(store.load_string("ssid").as_deref(), Some("Net"));

        store.flush().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(region.write_count(), 1);

        let mut reopened = KvStore::new(region);
        assert_eq!(reopened.load_string("password").as_deref(), Some("secret99"));
    }

    #[test]
    fn test_flush_when_clean_is_noop() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store.flush().unwrap();
        assert_eq!(region.write_count(), 0);
    }

    #[test]
    fn test_clear() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store.add_string("ssid", "Net").unwrap();
        store.clear().unwrap();

        assert!(store.is_empty().unwrap());
        assert_eq!(KvStore::new(region).load_string("ssid"), None);
    }

    #[test]
    fn test_corrupt_slot_skipped() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store.add_string("a", "1").unwrap();
        store.add_string("b", "2").unwrap();

        // Garbage tag in the first slot.
        region.poke(RECORD_WIDTH - 1, &[0x5A]);

        assert_eq!(store.load_string("a"), None);
        assert_eq!(store.load_string("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_rewrite_drops_corrupt_slot() {
        let region = MemoryRegion::default();
        let mut store = KvStore::new(region.clone());
        store.add_string("a", "1").unwrap();
        region.poke(RECORD_WIDTH - 1, &[0x5A]);

        store.add_string("b", "2").unwrap();

        let image = region.snapshot();
        assert_eq!(&image[..1], b"b");
        assert_eq!(image[RECORD_WIDTH + RECORD_WIDTH - 1], 0);
    }

    #[test]
    fn test_erased_region_is_empty() {
        let mut store = KvStore::new(MemoryRegion::new(DEFAULT_REGION_SIZE));
        assert!(store.is_empty().unwrap());
    }
}
