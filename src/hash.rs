//! SHA-256 content hashes as used by RRDP.
//!
//! RFC 8182 identifies snapshot, delta and object content by the SHA-256
//! digest of the raw bytes, written as hexadecimal in `hash` attributes.

use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Result, RrdpError};

/// Length in bytes of a SHA-256 digest.
pub const HASH_LEN: usize = 32;

/// SHA-256 digest of an RRDP artifact or repository object.
///
/// Parsing from hex is case-insensitive; formatting always produces
/// lowercase hex, so two hashes compare equal regardless of how the server
/// spelled them.
///
/// # Example
///
/// ```rust
/// use rrdp_mirror::ContentHash;
///
/// let hash = ContentHash::compute(b"abc");
/// let upper: ContentHash =
///     "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD".parse().unwrap();
/// assert_eq!(hash, upper);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Compute the SHA-256 hash of `data`.
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Compute the hash from a reader without loading it into memory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails.
    pub fn compute_streaming<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self(hasher.finalize().into()))
    }

    /// Create a `ContentHash` from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hexadecimal digest (either case).
    ///
    /// # Errors
    ///
    /// Returns [`RrdpError::Validation`] if `s` is not exactly 64 hex digits.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| RrdpError::validation(format!("invalid SHA-256 hash {s:?}: {e}")))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes of the hash.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check whether `data` hashes to this value.
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({}...)", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for ContentHash {
    type Err = RrdpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
