//! Content-addressed hashing primitives
//!
//! Provides [`ContentHash`], a strongly-typed 32-byte Blake3 digest, and the
//! stable structural hashing used for finding ids, patch ids, precondition
//! hashes, reconcile signatures and style signatures.
//!
//! Structural hashing goes through [`serde_json::Value`] with every object's
//! keys sorted recursively, so two values that differ only in field order
//! hash identically.

use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Structural hash of a JSON value, independent of object key order
    #[must_use]
    pub fn of_json(value: &Value) -> Self {
        let canonical = canonicalize(value);
        Self::compute(canonical.to_string().as_bytes())
    }

    /// Structural hash of any serializable value
    ///
    /// # Errors
    /// Returns error if the value cannot be represented as JSON
    pub fn compute_serializable<T>(value: &T) -> Result<Self, HashError>
    where
        T: serde::Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        Ok(Self::of_json(&value))
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Content-addressed identifier with a kind prefix, e.g. `finding-3fa1...`
    #[inline]
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.short())
    }

    /// Check if hash is all zeros (placeholder/uninitialized)
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

/// Rebuild a JSON value with every object's keys in sorted order
///
/// Inserting in sorted order keeps the result stable whether or not
/// `serde_json` was built with `preserve_order`.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, nested) in entries {
                sorted.insert(key.clone(), canonicalize(nested));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl Default for ContentHash {
    fn default() -> Self {
        Self([0; 32])
    }
}

// Persisted state is plain JSON, so hashes always travel as hex strings.
impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when working with content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(ContentHash::compute(b"deck"), ContentHash::compute(b"deck"));
        assert_ne!(ContentHash::compute(b"deck"), ContentHash::compute(b"desk"));
    }

    #[test]
    fn of_json_ignores_key_order() {
        let a = json!({"fontFamily": "Aptos", "bold": true, "nested": {"z": 1, "a": 2}});
        let b = json!({"nested": {"a": 2, "z": 1}, "bold": true, "fontFamily": "Aptos"});
        assert_eq!(ContentHash::of_json(&a), ContentHash::of_json(&b));
    }

    #[test]
    fn of_json_distinguishes_null_from_missing() {
        let with_null = json!({"bulletIndent": null});
        let empty = json!({});
        assert_ne!(ContentHash::of_json(&with_null), ContentHash::of_json(&empty));
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!(["slide-1", "shape-1"]);
        let b = json!(["shape-1", "slide-1"]);
        assert_ne!(ContentHash::of_json(&a), ContentHash::of_json(&b));
    }

    #[test]
    fn prefixed_uses_short_form() {
        let hash = ContentHash::compute(b"finding");
        let id = hash.prefixed("finding");
        assert!(id.starts_with("finding-"));
        assert_eq!(id.len(), "finding-".len() + 16);
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let result = ContentHash::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = ContentHash::compute(b"signature");
        let encoded = serde_json::to_string(&hash).unwrap();
        assert_eq!(encoded, format!("\"{hash}\""));
        let decoded: ContentHash = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, hash);
    }

    #[test]
    fn default_is_zero() {
        assert!(ContentHash::default().is_zero());
        assert!(!ContentHash::compute(b"x").is_zero());
    }
}
