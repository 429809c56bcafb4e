//! Interface to the signed-object decoder.
//!
//! Decoding manifests, certificates, CRLs and signed objects is not part of
//! this crate. The reconciliation engine and the content scan only need a
//! best-effort timestamp per object and, for manifests, the listed files;
//! both come from an [`ObjectInspector`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A file entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FileAndHash {
    /// File name relative to the publication point.
    pub file_name: String,
    /// Hash listed for the file.
    pub hash: Vec<u8>,
}

impl fmt::Display for FileAndHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sha256={}", self.file_name, hex::encode(&self.hash))
    }
}

/// Decoded manifest fields used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestInfo {
    /// Manifest number, as decimal text (it can exceed 64 bits).
    pub manifest_number: String,
    /// CMS signing time.
    pub signing_time: Option<DateTime<Utc>>,
    /// Authority information access URI of the EE certificate.
    pub authority_information_access: Option<String>,
    /// Files listed on the manifest.
    pub file_list: BTreeSet<FileAndHash>,
}

/// Extracts metadata from signed RPKI objects.
///
/// Implementations must not panic on malformed input; `None` means "could
/// not decode" and callers fall back to defaults.
pub trait ObjectInspector: Send + Sync {
    /// Best-effort timestamp of an object: `thisUpdate` for a CRL,
    /// `notBefore` for a certificate, CMS signing time for signed objects.
    ///
    /// `file_name` is only used for its extension.
    fn object_time(&self, file_name: &str, content: &[u8]) -> Option<DateTime<Utc>>;

    /// Decode a manifest.
    fn manifest(&self, _content: &[u8]) -> Option<ManifestInfo> {
        None
    }
}

/// Inspector that decodes nothing; every object gets the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl ObjectInspector for WallClock {
    fn object_time(&self, _file_name: &str, _content: &[u8]) -> Option<DateTime<Utc>> {
        None
    }
}

/// Object time from `inspector`, or now if it cannot be determined.
#[must_use]
pub fn object_time_or_now(
    inspector: &dyn ObjectInspector,
    file_name: &str,
    content: &[u8],
) -> DateTime<Utc> {
    inspector
        .object_time(file_name, content)
        .unwrap_or_else(Utc::now)
}
