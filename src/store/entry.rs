//! Entry type and fixed-width record codec.
//!
//! Every entry occupies one record of [`RECORD_WIDTH`] bytes:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────┬─────┐
//! │ key: [u8; 32]        │ value: [u8; 255]             │ tag │
//! │ NUL padded           │ string NUL padded, or byte   │ u8  │
//! └──────────────────────┴──────────────────────────────┴─────┘
//! ```

use super::StoreError;

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 32;

/// Maximum string value length in bytes.
pub const MAX_VALUE_LEN: usize = 255;

/// Width of one serialized record: key + value + tag byte.
pub const RECORD_WIDTH: usize = MAX_KEY_LEN + MAX_VALUE_LEN + 1;

const VALUE_OFFSET: usize = MAX_KEY_LEN;
const TAG_OFFSET: usize = MAX_KEY_LEN + MAX_VALUE_LEN;

const TAG_STRING: u8 = 1;
const TAG_BYTE: u8 = 2;
// Zeroed and erased-flash slots both read as empty.
const TAG_EMPTY_ZERO: u8 = 0x00;
const TAG_EMPTY_ERASED: u8 = 0xFF;

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 string, at most [`MAX_VALUE_LEN`] bytes.
    String(String),
    /// Single byte.
    Byte(u8),
}

/// One persisted key/value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: String,
    value: Value,
}

impl Entry {
    /// Create a string entry, rejecting keys or values outside the record bounds.
    pub fn string(key: &str, value: &str) -> Result<Self, StoreError> {
        validate_key(key)?;
        if value.len() > MAX_VALUE_LEN {
            return Err(StoreError::ValueTooLong {
                len: value.len(),
                max: MAX_VALUE_LEN,
            });
        }
        if value.as_bytes().contains(&0) {
            return Err(StoreError::ValueContainsNul);
        }
        Ok(Self {
            key: key.to_string(),
            value: Value::String(value.to_string()),
        })
    }

    /// Create a byte entry.
    pub fn byte(key: &str, value: u8) -> Result<Self, StoreError> {
        validate_key(key)?;
        Ok(Self {
            key: key.to_string(),
            value: Value::Byte(value),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the string value if this is a string entry.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            Value::Byte(_) => None,
        }
    }

    /// Returns the byte value if this is a byte entry.
    pub fn as_byte(&self) -> Option<u8> {
        match self.value {
            Value::Byte(b) => Some(b),
            Value::String(_) => None,
        }
    }

    /// Serialize into a record slot.
    ///
    /// `record` must be exactly [`RECORD_WIDTH`] bytes. Unused bytes are zeroed.
    pub(crate) fn encode_into(&self, record: &mut [u8]) {
        debug_assert_eq!(record.len(), RECORD_WIDTH);
        record.fill(0);
        record[..self.key.len()].copy_from_slice(self.key.as_bytes());
        match &self.value {
            Value::String(s) => {
                record[VALUE_OFFSET..VALUE_OFFSET + s.len()].copy_from_slice(s.as_bytes());
                record[TAG_OFFSET] = TAG_STRING;
            }
            Value::Byte(b) => {
                record[VALUE_OFFSET] = *b;
                record[TAG_OFFSET] = TAG_BYTE;
            }
        }
    }

    /// Deserialize a record slot.
    ///
    /// Returns `Ok(None)` for an empty slot and `Err(reason)` for a corrupt one.
    pub(crate) fn decode(record: &[u8]) -> Result<Option<Self>, &'static str> {
        if record.len() != RECORD_WIDTH {
            return Err("record has wrong width");
        }

        let tag = record[TAG_OFFSET];
        if tag == TAG_EMPTY_ZERO || tag == TAG_EMPTY_ERASED {
            return Ok(None);
        }
        if tag != TAG_STRING && tag != TAG_BYTE {
            return Err("unknown tag");
        }

        let key_bytes = until_nul(&record[..MAX_KEY_LEN]);
        if key_bytes.is_empty() {
            return Err("empty key");
        }
        let key = core::str::from_utf8(key_bytes).map_err(|_| "key is not UTF-8")?;

        let value = if tag == TAG_STRING {
            let raw = until_nul(&record[VALUE_OFFSET..TAG_OFFSET]);
            let s = core::str::from_utf8(raw).map_err(|_| "value is not UTF-8")?;
            Value::String(s.to_string())
        } else {
            Value::Byte(record[VALUE_OFFSET])
        };

        Ok(Some(Self {
            key: key.to_string(),
            value,
        }))
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::KeyEmpty);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    if key.as_bytes().contains(&0) {
        return Err(StoreError::KeyContainsNul);
    }
    Ok(())
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(entry: &Entry) -> Vec<u8> {
        let mut record = vec![0u8; RECORD_WIDTH];
        entry.encode_into(&mut record);
        record
    }

    #[test]
    fn test_record_width() {
        assert_eq!(RECORD_WIDTH, 288);
    }

    #[test]
    fn test_string_record_layout() {
        let record = encoded(&Entry::string("ssid", "HomeNet").unwrap());
        assert_eq!(&record[..4], b"ssid");
        assert!(record[4..MAX_KEY_LEN].iter().all(|&b| b == 0));
        assert_eq!(&record[32..39], b"HomeNet");
        assert_eq!(record[TAG_OFFSET], TAG_STRING);
    }

    #[test]
    fn test_byte_record_layout() {
        let record = encoded(&Entry::byte("mode", 0xAB).unwrap());
        assert_eq!(record[VALUE_OFFSET], 0xAB);
        assert_eq!(record[TAG_OFFSET], TAG_BYTE);
    }

    #[test]
    fn test_decode_string_and_byte() {
        let s = Entry::string("hostname", "node-7").unwrap();
        let b = Entry::byte("retries", 3).unwrap();
        assert_eq!(Entry::decode(&encoded(&s)).unwrap(), Some(s));
        assert_eq!(Entry::decode(&encoded(&b)).unwrap(), Some(b));
    }

    #[test]
    fn test_max_length_key_and_value() {
        let key = "k".repeat(MAX_KEY_LEN);
        let value = "v".repeat(MAX_VALUE_LEN);
        let entry = Entry::string(&key, &value).unwrap();
        let decoded = Entry::decode(&encoded(&entry)).unwrap().unwrap();
        assert_eq!(decoded.key(), key);
        assert_eq!(decoded.as_str(), Some(value.as_str()));
    }

    #[test]
    fn test_empty_string_value() {
        let entry = Entry::string("password", "").unwrap();
        let decoded = Entry::decode(&encoded(&entry)).unwrap().unwrap();
        assert_eq!(decoded.as_str(), Some(""));
    }

    #[test]
    fn test_key_too_long() {
        let key = "k".repeat(MAX_KEY_LEN + 1);
        assert_eq!(
            Entry::string(&key, "x"),
            Err(StoreError::KeyTooLong { len: 33, max: 32 })
        );
    }

    #[test]
    fn test_value_too_long() {
        let value = "v".repeat(MAX_VALUE_LEN + 1);
        assert_eq!(
            Entry::string("key", &value),
            Err(StoreError::ValueTooLong { len: 256, max: 255 })
        );
    }

    #[test]
    fn test_invalid_keys() {
        assert_eq!(Entry::byte("", 1), Err(StoreError::KeyEmpty));
        assert_eq!(Entry::byte("a\0b", 1), Err(StoreError::KeyContainsNul));
        assert_eq!(
            Entry::string("key", "a\0b"),
            Err(StoreError::ValueContainsNul)
        );
    }

    #[test]
    fn test_empty_slots() {
        assert_eq!(Entry::decode(&[0x00; RECORD_WIDTH]).unwrap(), None);
        assert_eq!(Entry::decode(&[0xFF; RECORD_WIDTH]).unwrap(), None);
    }

    #[test]
    fn test_corrupt_slots() {
        let mut record = encoded(&Entry::string("ssid", "x").unwrap());
        record[TAG_OFFSET] = 0x7E;
        assert!(Entry::decode(&record).is_err());

        let mut record = encoded(&Entry::string("ssid", "x").unwrap());
        record[0] = 0;
        assert_eq!(Entry::decode(&record), Err("empty key"));

        let mut record = encoded(&Entry::string("ssid", "x").unwrap());
        record[VALUE_OFFSET] = 0xC3;
        record[VALUE_OFFSET + 1] = 0x28;
        assert_eq!(Entry::decode(&record), Err("value is not UTF-8"));
    }
}
