//! Mapping of object URIs onto a local directory tree.
//!
//! An object lives at `root` + the path component of its URI. The mapping is
//! lexical: `.` and `..` segments are resolved without touching the file
//! system, and any URI that would end up outside of (or exactly at) the root
//! is rejected with [`RrdpError::PathEscape`].

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Result, RrdpError};
use crate::hash::ContentHash;

/// Path component of `uri`: everything after the authority, up to `?` or `#`.
///
/// No percent-decoding or dot-segment removal is done here.
///
/// ```rust
/// use rrdp_mirror::store::uri_path;
///
/// assert_eq!(uri_path("rsync://rpki.example.net/repo/a.cer"), "/repo/a.cer");
/// assert_eq!(uri_path("https://host/x.xml?v=1"), "/x.xml");
/// ```
#[must_use]
pub fn uri_path(uri: &str) -> &str {
    let path = match uri.find("://") {
        Some(scheme_end) => {
            let rest = &uri[scheme_end + 3..];
            rest.find('/').map_or("", |authority_end| &rest[authority_end..])
        }
        None => uri.split_once(':').map_or(uri, |(_, rest)| rest),
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Resolve the on-disk location of `uri` below `root`.
///
/// # Errors
///
/// Returns [`RrdpError::PathEscape`] if the path is not strictly inside `root`.
pub fn object_path(root: &Path, uri: &str) -> Result<PathBuf> {
    let escape = || RrdpError::PathEscape {
        uri: uri.to_string(),
        root: root.to_path_buf(),
    };

    let mut path = root.to_path_buf();
    let mut depth = 0usize;

    for segment in uri_path(uri).split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if depth == 0 {
                    return Err(escape());
                }
                path.pop();
                depth -= 1;
            }
            name => {
                if name.contains(['\\', '\0']) {
                    return Err(escape());
                }
                path.push(name);
                depth += 1;
            }
        }
    }

    // A segment that the platform treats as absolute replaces the whole path.
    if depth == 0 || !path.starts_with(root) {
        return Err(escape());
    }
    Ok(path)
}

/// Hash of the file at `path`, or `None` if there is no regular file there.
///
/// A directory (or other non-file) at `path` is not an object.
///
/// # Errors
///
/// Returns an I/O error for anything but a missing file.
pub fn file_hash(path: &Path) -> Result<Option<ContentHash>> {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_file() => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let file = File::open(path)?;
    Ok(Some(ContentHash::compute_streaming(&mut BufReader::new(
        file,
    ))?))
}

/// Write `content` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an I/O error if a directory or the file cannot be written.
pub fn write_object(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Set the modification time of the file at `path`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or updated.
pub fn stamp_mtime(path: &Path, time: SystemTime) -> std::io::Result<()> {
    File::options().write(true).open(path)?.set_modified(time)
}
