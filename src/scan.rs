//! Scan of stored RRDP documents for objects of interest.
//!
//! Every `*.xml` file below a directory is parsed (in parallel, one document
//! per task) and the publish elements whose URI matches a pattern are
//! collected in serial order. Manifests are decoded through the
//! [`ObjectInspector`] so consecutive versions can be diffed.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info};

use crate::document::{parse_document, AnyDocument, RrdpDocument, RrdpElement};
use crate::error::{Result, RrdpError};
use crate::hash::ContentHash;
use crate::object::{FileAndHash, ManifestInfo, ObjectInspector, WallClock};

/// Default `--file-match` pattern: manifests only.
pub const DEFAULT_FILE_MATCH: &str = r".*\.mft";

/// Configuration for [`scan_directory`].
///
/// Without a pattern, URIs containing `.mft` are collected, which is what
/// [`DEFAULT_FILE_MATCH`] selects.
#[derive(Clone)]
pub struct ScanConfig {
    file_match: Option<Regex>,
    inspector: Arc<dyn ObjectInspector>,
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("file_match", &self.file_match.as_ref().map(Regex::as_str))
            .finish_non_exhaustive()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            file_match: None,
            inspector: Arc::new(WallClock),
        }
    }
}

impl ScanConfig {
    /// Only collect URIs that match `pattern` from their first character.
    ///
    /// # Errors
    ///
    /// Returns [`RrdpError::InvalidFilter`] if the pattern does not compile.
    pub fn file_match(mut self, pattern: &str) -> Result<Self> {
        self.file_match = Some(Regex::new(&format!("^(?:{pattern})"))?);
        Ok(self)
    }

    /// Decode objects with `inspector`.
    #[must_use]
    pub fn inspector(mut self, inspector: Arc<dyn ObjectInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Check whether `uri` is collected.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        match &self.file_match {
            Some(pattern) => pattern.is_match(uri),
            None => uri.contains(".mft"),
        }
    }
}

/// A matching publish element found by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEntry {
    /// A manifest the inspector could decode.
    Manifest {
        /// Serial of the document it was found in.
        serial: u64,
        /// Session of the document it was found in.
        session_id: String,
        /// Object URI.
        uri: String,
        /// Object bytes.
        content: Vec<u8>,
        /// Decoded manifest.
        manifest: ManifestInfo,
    },
    /// Any other object.
    Publish {
        /// Serial of the document it was found in.
        serial: u64,
        /// Session of the document it was found in.
        session_id: String,
        /// Object URI.
        uri: String,
        /// Object bytes.
        content: Vec<u8>,
        /// Time the object declares, if it could be decoded.
        object_time: Option<DateTime<Utc>>,
    },
}

impl ScanEntry {
    /// Serial of the document the entry came from.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        match self {
            Self::Manifest { serial, .. } | Self::Publish { serial, .. } => *serial,
        }
    }

    /// Object URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Manifest { uri, .. } | Self::Publish { uri, .. } => uri,
        }
    }

    /// Object bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        match self {
            Self::Manifest { content, .. } | Self::Publish { content, .. } => content,
        }
    }

    /// Last path segment of the URI.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.uri().rsplit('/').next().unwrap_or_default()
    }
}

fn format_time(time: Option<&DateTime<Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

impl fmt::Display for ScanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = ContentHash::compute(self.content());
        write!(f, "{:>6} {} {hash}", self.serial(), self.uri())?;
        match self {
            Self::Manifest { manifest, .. } => write!(
                f,
                " {:>4} {} {}",
                manifest.manifest_number,
                format_time(manifest.signing_time.as_ref()),
                manifest
                    .authority_information_access
                    .as_deref()
                    .unwrap_or("-")
            ),
            Self::Publish { object_time, .. } => {
                write!(f, " {}", format_time(object_time.as_ref()))
            }
        }
    }
}

fn entries_of(document: &RrdpDocument, config: &ScanConfig) -> Vec<ScanEntry> {
    document
        .elements()
        .iter()
        .filter_map(|element| match element {
            RrdpElement::Publish(publish) if config.matches(publish.uri()) => Some(publish),
            _ => None,
        })
        .map(|publish| {
            let uri = publish.uri().to_string();
            let content = publish.content().to_vec();
            let manifest = if uri.ends_with(".mft") {
                config.inspector.manifest(&content)
            } else {
                None
            };
            match manifest {
                Some(manifest) => ScanEntry::Manifest {
                    serial: document.serial(),
                    session_id: document.session_id().to_string(),
                    uri,
                    content,
                    manifest,
                },
                None => {
                    let file_name = uri.rsplit('/').next().unwrap_or_default();
                    let object_time = config.inspector.object_time(file_name, &content);
                    ScanEntry::Publish {
                        serial: document.serial(),
                        session_id: document.session_id().to_string(),
                        uri,
                        content,
                        object_time,
                    }
                }
            }
        })
        .collect()
}

fn scan_file(path: &Path, config: &ScanConfig) -> Vec<ScanEntry> {
    debug!(path = %path.display(), "scanning");
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %path.display(), "cannot read: {e}");
            return Vec::new();
        }
    };
    match parse_document(&bytes) {
        Ok(AnyDocument::Rrdp(document)) => entries_of(&document, config),
        Ok(AnyDocument::Notification(_)) => {
            info!(path = %path.display(), "skipping: not a snapshot or delta document");
            Vec::new()
        }
        Err(e) => {
            error!(path = %path.display(), "not a valid RRDP document: {e}");
            Vec::new()
        }
    }
}

/// Collect matching publish elements from every `*.xml` file below `dir`.
///
/// Unreadable or invalid files are logged and skipped. The result is
/// ordered by serial; entries with equal serials keep file and document
/// order.
///
/// # Errors
///
/// Returns an I/O error if `dir` cannot be listed.
pub fn scan_directory(dir: &Path, config: &ScanConfig) -> Result<Vec<ScanEntry>> {
    let pattern = format!(
        "{}/**/*.xml",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| RrdpError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?
        .collect::<std::result::Result<Vec<PathBuf>, _>>()
        .map_err(glob::GlobError::into_error)?;
    info!(dir = %dir.display(), "found {} files", paths.len());

    let mut entries: Vec<ScanEntry> = paths
        .par_iter()
        .flat_map_iter(|path| scan_file(path, config))
        .collect();
    entries.sort_by_key(ScanEntry::serial);
    Ok(entries)
}

/// Files added to and removed from a manifest since its previous version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Manifest URI.
    pub uri: String,
    /// Serial the new version was found in.
    pub serial: u64,
    /// Serial the previous version was found in.
    pub previous_serial: u64,
    /// Entries only on the new version.
    pub added: BTreeSet<FileAndHash>,
    /// Entries only on the previous version.
    pub removed: BTreeSet<FileAndHash>,
}

impl ManifestDiff {
    /// Check if the file lists are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Diff every manifest against the previous manifest with the same URI.
///
/// `entries` must be in scan order; the first version of each manifest has
/// nothing to compare with and yields no diff.
#[must_use]
pub fn manifest_diffs(entries: &[ScanEntry]) -> Vec<ManifestDiff> {
    let mut previous: FxHashMap<&str, (u64, &ManifestInfo)> = FxHashMap::default();
    let mut diffs = Vec::new();

    for entry in entries {
        let ScanEntry::Manifest {
            serial,
            uri,
            manifest,
            ..
        } = entry
        else {
            continue;
        };
        if let Some((previous_serial, before)) = previous.insert(uri.as_str(), (*serial, manifest)) {
            diffs.push(ManifestDiff {
                uri: uri.clone(),
                serial: *serial,
                previous_serial,
                added: manifest
                    .file_list
                    .difference(&before.file_list)
                    .cloned()
                    .collect(),
                removed: before
                    .file_list
                    .difference(&manifest.file_list)
                    .cloned()
                    .collect(),
            });
        }
    }
    diffs
}

/// Write each entry's content to `dir` as `<serial:06>_<file name>`.
///
/// Entries sharing a serial and file name land in the same file, the later
/// one winning. Returns the number of distinct files written.
///
/// # Errors
///
/// Returns an I/O error if a file cannot be written.
pub fn store_content(entries: &[ScanEntry], dir: &Path) -> Result<usize> {
    let mut written = BTreeSet::new();
    for entry in entries {
        let path = dir.join(format!("{:06}_{}", entry.serial(), entry.file_name()));
        std::fs::write(&path, entry.content())?;
        written.insert(path);
    }
    Ok(written.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DeltaDocument, PublishElement, SnapshotDocument};

    /// Treats the content of a `.mft` as a comma-separated file list.
    struct ListInspector;

    impl ObjectInspector for ListInspector {
        fn object_time(&self, _file_name: &str, _content: &[u8]) -> Option<DateTime<Utc>> {
            None
        }

        fn manifest(&self, content: &[u8]) -> Option<ManifestInfo> {
            let text = std::str::from_utf8(content).ok()?;
            Some(ManifestInfo {
                manifest_number: text.len().to_string(),
                signing_time: None,
                authority_information_access: None,
                file_list: text
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .map(|name| FileAndHash {
                        file_name: name.to_string(),
                        hash: vec![0],
                    })
                    .collect(),
            })
        }
    }

    fn write_delta(dir: &Path, name: &str, serial: u64, objects: &[(&str, &str)]) {
        let doc = RrdpDocument::Delta(DeltaDocument {
            session_id: "0a0b".to_string(),
            serial,
            elements: objects
                .iter()
                .map(|(uri, content)| {
                    RrdpElement::Publish(PublishElement::new(*uri, None, content.as_bytes().to_vec()))
                })
                .collect(),
        });
        std::fs::write(dir.join(name), doc.to_xml()).unwrap();
    }

    // ==========================================================================
    // MATCHING
    // ==========================================================================

    #[test]
    fn default_matches_manifests_only() {
        let config = ScanConfig::default();
        assert!(config.matches("rsync://host/repo/ca.mft"));
        assert!(!config.matches("rsync://host/repo/ca.crl"));
    }

    #[test]
    fn file_match_is_anchored_at_start() {
        let config = ScanConfig::default().file_match("repo").unwrap();
        assert!(!config.matches("rsync://host/repo/a.roa"));
        let config = ScanConfig::default().file_match("rsync://host/repo").unwrap();
        assert!(config.matches("rsync://host/repo/a.roa"));
        assert!(ScanConfig::default().file_match("(").is_err());
    }

    // ==========================================================================
    // SCAN
    // ==========================================================================

    #[test]
    fn scan_orders_by_serial_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        write_delta(dir.path(), "b.xml", 3, &[("rsync://h/r/ca.mft", "c")]);
        write_delta(&dir.path().join("nested"), "a.xml", 2, &[("rsync://h/r/ca.mft", "b")]);
        write_delta(dir.path(), "c.xml", 1, &[
            ("rsync://h/r/ca.mft", "a"),
            ("rsync://h/r/ca.crl", "x"),
        ]);
        std::fs::write(dir.path().join("junk.xml"), b"<not-rrdp/>").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"whatever").unwrap();

        let entries = scan_directory(dir.path(), &ScanConfig::default()).unwrap();
        let serials: Vec<u64> = entries.iter().map(ScanEntry::serial).collect();
        assert_eq!(serials, vec![1, 2, 3]);
        assert!(entries.iter().all(|e| matches!(e, ScanEntry::Publish { .. })));
        assert_eq!(entries[0].file_name(), "ca.mft");
    }

    #[test]
    fn scan_skips_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDocument {
            session_id: "0a0b".to_string(),
            serial: 1,
            elements: Vec::new(),
        };
        std::fs::write(
            dir.path().join("snapshot.xml"),
            RrdpDocument::Snapshot(snapshot).to_xml(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("notification.xml"),
            format!(
                r#"<notification xmlns="http://www.ripe.net/rpki/rrdp" version="1" session_id="0a0b" serial="1"><snapshot uri="https://h/s.xml" hash="{}"/></notification>"#,
                ContentHash::compute(b"")
            ),
        )
        .unwrap();
        assert!(scan_directory(dir.path(), &ScanConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn manifests_are_diffed_per_uri() {
        let dir = tempfile::tempdir().unwrap();
        write_delta(dir.path(), "1.xml", 1, &[
            ("rsync://h/r/ca.mft", "a.roa,b.roa"),
            ("rsync://h/r/other.mft", "z.roa"),
        ]);
        write_delta(dir.path(), "2.xml", 2, &[("rsync://h/r/ca.mft", "b.roa,c.roa")]);

        let config = ScanConfig::default().inspector(Arc::new(ListInspector));
        let entries = scan_directory(dir.path(), &config).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], ScanEntry::Manifest { .. }));

        let diffs = manifest_diffs(&entries);
        assert_eq!(diffs.len(), 1);
        let diff = &diffs[0];
        assert_eq!(diff.uri, "rsync://h/r/ca.mft");
        assert_eq!((diff.previous_serial, diff.serial), (1, 2));
        let added: Vec<&str> = diff.added.iter().map(|f| f.file_name.as_str()).collect();
        let removed: Vec<&str> = diff.removed.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(added, vec!["c.roa"]);
        assert_eq!(removed, vec!["a.roa"]);
        assert!(!diff.is_empty());
    }

    #[test]
    fn store_content_names_by_serial() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        write_delta(source.path(), "7.xml", 7, &[("rsync://h/r/ca.mft", "bytes")]);

        let entries = scan_directory(source.path(), &ScanConfig::default()).unwrap();
        assert_eq!(store_content(&entries, target.path()).unwrap(), 1);
        assert_eq!(
            std::fs::read(target.path().join("000007_ca.mft")).unwrap(),
            b"bytes"
        );
    }

    #[test]
    fn store_content_counts_distinct_files() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        write_delta(
            source.path(),
            "7.xml",
            7,
            &[("rsync://h/a/ca.mft", "first"), ("rsync://h/b/ca.mft", "second")],
        );

        let entries = scan_directory(source.path(), &ScanConfig::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(store_content(&entries, target.path()).unwrap(), 1);
        assert_eq!(std::fs::read_dir(target.path()).unwrap().count(), 1);
    }

    #[test]
    fn entry_display() {
        let entry = ScanEntry::Publish {
            serial: 12,
            session_id: "0a".to_string(),
            uri: "rsync://h/r/a.roa".to_string(),
            content: b"x".to_vec(),
            object_time: None,
        };
        assert_eq!(
            entry.to_string(),
            format!("    12 rsync://h/r/a.roa {} -", ContentHash::compute(b"x"))
        );
    }
}
