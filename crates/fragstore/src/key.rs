//! CacheKey: a BLAKE3 hash of a model's logical name, truncated to 128 bits
//! (32 hex chars).
//!
//! Clients address models by arbitrary names; hashing the name gives a
//! filesystem-safe key regardless of what the client sends. The 128-bit
//! truncation keeps keys human-manageable while making accidental
//! collisions between distinct names vanishingly unlikely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A cache key - 128 bits (16 bytes, 32 hex chars) of BLAKE3 over the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

/// Errors that can occur when deriving or parsing cache keys.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("model name must not be empty")]
    EmptyName,

    #[error("invalid key length: expected 32 hex chars, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex character in key")]
    InvalidHex,
}

impl CacheKey {
    /// Derive the key for a logical model name.
    ///
    /// Deterministic: the same name always yields the same key. Rejects
    /// empty and whitespace-only names; those are caller errors.
    pub fn derive(name: &str) -> Result<Self, KeyError> {
        if name.trim().is_empty() {
            return Err(KeyError::EmptyName);
        }
        let hash_bytes = blake3::hash(name.as_bytes());
        let hash_hex = hex::encode(&hash_bytes.as_bytes()[..16]); // Truncate to 16 bytes (128 bits)
        Ok(Self(hash_hex))
    }

    /// Create from an existing key string (validates format).
    pub fn from_str_checked(s: &str) -> Result<Self, KeyError> {
        if s.len() != 32 {
            return Err(KeyError::InvalidLength(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KeyError::InvalidHex);
        }
        Ok(Self(s.to_lowercase()))
    }

    /// File name of the fragment payload for this key.
    pub fn fragment_file_name(&self) -> String {
        format!("{}.frag", self.0)
    }

    /// File name of the properties document for this key.
    pub fn properties_file_name(&self) -> String {
        format!("{}.json", self.0)
    }

    /// Get the full key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CacheKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_checked(s)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_produces_32_hex_chars() {
        let key = CacheKey::derive("office-tower.ifc").unwrap();
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derive_is_deterministic() {
        let key1 = CacheKey::derive("model-a").unwrap();
        let key2 = CacheKey::derive("model-a").unwrap();
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_derive_distinct_names_distinct_keys() {
        let key1 = CacheKey::derive("model-a").unwrap();
        let key2 = CacheKey::derive("model-b").unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_derive_rejects_empty_name() {
        assert!(matches!(CacheKey::derive(""), Err(KeyError::EmptyName)));
        assert!(matches!(CacheKey::derive("   "), Err(KeyError::EmptyName)));
    }

    #[test]
    fn test_file_names_share_the_key() {
        let key = CacheKey::derive("model-a").unwrap();
        assert_eq!(key.fragment_file_name(), format!("{}.frag", key.as_str()));
        assert_eq!(key.properties_file_name(), format!("{}.json", key.as_str()));
    }

    #[test]
    fn test_from_str_valid() {
        let key_str = "abcdef01234567890123456789abcdef";
        let key: CacheKey = key_str.parse().unwrap();
        assert_eq!(key.as_str(), key_str);
    }

    #[test]
    fn test_from_str_invalid_length() {
        let result: Result<CacheKey, _> = "short".parse();
        assert!(matches!(result, Err(KeyError::InvalidLength(5))));
    }

    #[test]
    fn test_from_str_invalid_hex() {
        let result: Result<CacheKey, _> = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz".parse();
        assert!(matches!(result, Err(KeyError::InvalidHex)));
    }

    #[test]
    fn test_serde_roundtrip() {
        let key = CacheKey::derive("serde test").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        let restored: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, restored);
    }

    #[test]
    fn test_display() {
        let key = CacheKey::derive("display test").unwrap();
        assert_eq!(format!("{}", key), key.as_str());
    }
}
