//! # rrdp-mirror
//!
//! Client side of the RPKI Repository Delta Protocol (RFC 8182).
//!
//! An RRDP repository is published as a notification document that names a
//! full snapshot and a series of deltas. This crate parses and validates
//! those documents, replays them onto a directory tree, and mirrors the raw
//! documents from a server.
//!
//! ## Features
//!
//! - **Document model**: strict parsing of notification, snapshot and delta
//!   documents, with SHA-256 content hashes computed at parse time
//! - **Reconciliation**: ordered replay of publish/withdraw elements with
//!   path containment and advisory hash checks
//! - **Fetching** (feature `async`): concurrent, content-addressed download
//!   of snapshots and deltas
//! - **Scanning**: parallel search through stored documents, with manifest
//!   diffs
//!
//! ## Example
//!
//! ```rust
//! use rrdp_mirror::{parse_snapshot_or_delta, ReconcileBuilder};
//!
//! let xml = br#"<snapshot xmlns="http://www.ripe.net/rpki/rrdp" version="1"
//!     session_id="9df4b597-af9e-4dca-bdda-719cce2c4e28" serial="3">
//!   <publish uri="rsync://rpki.example.net/repo/hello.cer">aGVsbG8=</publish>
//! </snapshot>"#;
//!
//! let document = parse_snapshot_or_delta(xml).unwrap();
//! assert_eq!(document.serial(), 3);
//! assert_eq!(document.publish_count(), 1);
//!
//! let root = tempfile::tempdir().unwrap();
//! let summary = ReconcileBuilder::new()
//!     .build()
//!     .apply(&document, root.path())
//!     .unwrap();
//! assert_eq!(summary.published, 1);
//! assert_eq!(
//!     std::fs::read(root.path().join("repo/hello.cer")).unwrap(),
//!     b"hello"
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

mod document;
mod error;
#[cfg(feature = "async")]
pub mod fetch;
mod hash;
pub mod object;
mod reconcile;
pub mod scan;
mod schema;
pub mod state;
pub mod store;
mod xml;

pub use document::{
    parse_document, parse_notification, parse_snapshot_or_delta, AnyDocument, DeltaDocument,
    DeltaRef, NotificationDocument, PublishElement, RrdpDocument, RrdpElement, SnapshotDocument,
    SnapshotRef, WithdrawElement,
};
pub use error::{Result, RrdpError};
#[cfg(feature = "async")]
pub use fetch::{DeltaSelection, FetchBuilder, FetchConfig, FetchReport, Fetcher};
pub use hash::{ContentHash, HASH_LEN};
pub use object::{ObjectInspector, WallClock};
pub use reconcile::{
    Issue, IssueKind, Outcome, ReconcileBuilder, ReconcileConfig, ReconcileSummary, Reconciler,
    Reporter, TracingReporter, UriFilter,
};
pub use state::RepositoryState;
pub use xml::NS_RRDP;
