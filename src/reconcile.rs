//! Reconciliation engine: applies a snapshot or delta to a directory tree.
//!
//! Elements are replayed strictly in document order. Hash disagreements and
//! missing objects are recorded as [`Issue`]s and do not stop the replay, so
//! a drifted mirror still converges toward the declared state. The one
//! condition that aborts a run is a URI that maps outside the output root.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::document::{PublishElement, RrdpDocument, RrdpElement, WithdrawElement};
use crate::error::Result;
use crate::hash::ContentHash;
use crate::object::{object_time_or_now, ObjectInspector};
use crate::state::RepositoryState;
use crate::store;

/// Set of URI patterns; an element is processed if any pattern matches.
///
/// Patterns are unanchored regular expressions. An empty filter matches
/// every URI.
#[derive(Debug, Clone, Default)]
pub struct UriFilter {
    patterns: Vec<Regex>,
}

impl UriFilter {
    /// Filter that accepts every URI.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile a filter from regular expressions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RrdpError::InvalidFilter`] if a pattern does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Check whether `uri` passes the filter.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(uri))
    }

    /// Check if the filter accepts everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// What was inconsistent about an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// The URI already appeared earlier in the same document.
    DuplicateEntry {
        /// URI the element was stored under instead.
        effective_uri: String,
        /// Hashes of the earlier elements for this URI.
        previous: Vec<ContentHash>,
    },
    /// A replacing publish found an object with another hash.
    PreviousHashMismatch {
        /// Hash the publish declared for the object it replaces.
        expected: ContentHash,
        /// Hash of the object on disk.
        actual: ContentHash,
    },
    /// A replacing publish found no object.
    PreviousMissing {
        /// Hash the publish declared for the object it replaces.
        expected: ContentHash,
    },
    /// A delta publish without `hash` found an existing object.
    UnexpectedExisting {
        /// Hash of the object on disk.
        actual: ContentHash,
    },
    /// A withdraw found an object with another hash.
    WithdrawHashMismatch {
        /// Hash the withdraw declared.
        expected: ContentHash,
        /// Hash of the object on disk.
        actual: ContentHash,
    },
    /// A withdraw found no object.
    WithdrawMissing {
        /// Hash the withdraw declared.
        expected: ContentHash,
    },
}

/// A consistency problem found while applying an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// URI of the element as it appears in the document.
    pub uri: String,
    /// What went wrong.
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uri = &self.uri;
        match &self.kind {
            IssueKind::DuplicateEntry {
                effective_uri,
                previous,
            } => {
                write!(f, "repeated entry {uri} (stored as {effective_uri}); previous entries:")?;
                for hash in previous {
                    write!(f, " {hash}")?;
                }
                Ok(())
            }
            IssueKind::PreviousHashMismatch { expected, actual } => write!(
                f,
                "{uri}: publish replaces {expected} but the stored object is {actual}"
            ),
            IssueKind::PreviousMissing { expected } => write!(
                f,
                "{uri}: publish replaces {expected} but no object is stored"
            ),
            IssueKind::UnexpectedExisting { actual } => write!(
                f,
                "{uri}: publish without hash but an object is stored ({actual})"
            ),
            IssueKind::WithdrawHashMismatch { expected, actual } => write!(
                f,
                "{uri}: withdraw of {expected} but the stored object is {actual}"
            ),
            IssueKind::WithdrawMissing { expected } => write!(
                f,
                "{uri}: withdraw of {expected} but no object is stored"
            ),
        }
    }
}

/// What happened to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Object written (or would have been, in verify-only mode).
    Published,
    /// Object removed (or would have been).
    Withdrawn,
    /// Element did not match the filter.
    Skipped,
}

/// Receives the events of a reconciliation run.
pub trait Reporter: Send + Sync {
    /// A consistency problem was found.
    fn issue(&self, issue: &Issue);

    /// An element was processed.
    fn element(&self, _uri: &str, _outcome: Outcome, _path: Option<&Path>) {}
}

/// Reporter that forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn issue(&self, issue: &Issue) {
        match issue.kind {
            IssueKind::UnexpectedExisting { .. } => warn!("{issue}"),
            _ => error!("{issue}"),
        }
    }

    fn element(&self, uri: &str, outcome: Outcome, path: Option<&Path>) {
        match (outcome, path) {
            (Outcome::Skipped, _) => debug!(uri, "skipped: did not match filter"),
            (_, Some(path)) => debug!(uri, path = %path.display(), ?outcome, "applied"),
            (_, None) => debug!(uri, ?outcome, "applied"),
        }
    }
}

/// Configuration for reconciliation runs.
#[derive(Clone, Default)]
pub struct ReconcileConfig {
    /// Compute and report, but never modify the store.
    pub verify_only: bool,
    /// Only elements whose URI passes the filter are processed.
    pub filter: UriFilter,
    /// Stamp written objects with the time their content declares.
    pub assign_mtime: Option<Arc<dyn ObjectInspector>>,
    /// Require deltas to follow the stored session/serial and record the
    /// state reached.
    pub track_state: bool,
}

impl fmt::Debug for ReconcileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileConfig")
            .field("verify_only", &self.verify_only)
            .field("filter", &self.filter)
            .field("assign_mtime", &self.assign_mtime.is_some())
            .field("track_state", &self.track_state)
            .finish()
    }
}

/// Builder for [`Reconciler`].
///
/// # Example
///
/// ```rust
/// use rrdp_mirror::{ReconcileBuilder, UriFilter};
///
/// let reconciler = ReconcileBuilder::new()
///     .verify_only(true)
///     .filter(UriFilter::new([r"\.roa$"]).unwrap())
///     .build();
/// assert!(reconciler.config().verify_only);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReconcileBuilder {
    config: ReconcileConfig,
}

impl ReconcileBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only verify; never write or delete.
    #[must_use]
    pub fn verify_only(mut self, verify_only: bool) -> Self {
        self.config.verify_only = verify_only;
        self
    }

    /// Restrict processing to URIs passing `filter`.
    #[must_use]
    pub fn filter(mut self, filter: UriFilter) -> Self {
        self.config.filter = filter;
        self
    }

    /// Set file modification times from object content.
    #[must_use]
    pub fn assign_mtime(mut self, inspector: Arc<dyn ObjectInspector>) -> Self {
        self.config.assign_mtime = Some(inspector);
        self
    }

    /// Enable serial-continuity checks and state recording.
    #[must_use]
    pub fn track_state(mut self, track: bool) -> Self {
        self.config.track_state = track;
        self
    }

    /// Build the reconciler.
    #[must_use]
    pub fn build(self) -> Reconciler {
        Reconciler {
            config: self.config,
        }
    }
}

/// Totals of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// `snapshot` or `delta`.
    pub kind: &'static str,
    /// Session of the applied document.
    pub session_id: String,
    /// Serial of the applied document.
    pub serial: u64,
    /// Output root (canonical).
    pub root: PathBuf,
    /// Whether the store was left untouched.
    pub verify_only: bool,
    /// Publish elements processed.
    pub published: usize,
    /// Withdraw elements processed.
    pub withdrawn: usize,
    /// Elements skipped by the filter.
    pub skipped: usize,
    /// Consistency problems, in document order.
    pub issues: Vec<Issue>,
}

impl ReconcileSummary {
    /// Check if the run found no inconsistencies.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct SeenEntry {
    hash: ContentHash,
}

/// Applies RRDP documents to a directory tree.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

struct Run<'a> {
    config: &'a ReconcileConfig,
    reporter: &'a dyn Reporter,
    root: PathBuf,
    is_delta: bool,
    summary: ReconcileSummary,
}

impl Run<'_> {
    fn issue(&mut self, uri: &str, kind: IssueKind) {
        let issue = Issue {
            uri: uri.to_string(),
            kind,
        };
        self.reporter.issue(&issue);
        self.summary.issues.push(issue);
    }

    fn publish(&mut self, publish: &PublishElement, effective_uri: &str) -> Result<()> {
        let path = store::object_path(&self.root, effective_uri)?;

        let current = if publish.previous_hash().is_some() || self.is_delta {
            store::file_hash(&path)?
        } else {
            None
        };
        match (publish.previous_hash(), current) {
            (Some(expected), Some(actual)) if *expected != actual => self.issue(
                publish.uri(),
                IssueKind::PreviousHashMismatch {
                    expected: *expected,
                    actual,
                },
            ),
            (Some(expected), None) => self.issue(
                publish.uri(),
                IssueKind::PreviousMissing {
                    expected: *expected,
                },
            ),
            (None, Some(actual)) => {
                self.issue(publish.uri(), IssueKind::UnexpectedExisting { actual });
            }
            _ => {}
        }

        if !self.config.verify_only {
            // Empty content is a valid (empty) object.
            store::write_object(&path, publish.content())?;
            if let Some(inspector) = &self.config.assign_mtime {
                let file_name = publish.uri().rsplit('/').next().unwrap_or_default();
                let time = object_time_or_now(inspector.as_ref(), file_name, publish.content());
                if let Err(e) = store::stamp_mtime(&path, SystemTime::from(time)) {
                    warn!(path = %path.display(), "could not set modification time: {e}");
                }
            }
        }

        self.summary.published += 1;
        self.reporter
            .element(publish.uri(), Outcome::Published, Some(&path));
        Ok(())
    }

    fn withdraw(&mut self, withdraw: &WithdrawElement, effective_uri: &str) -> Result<()> {
        let path = store::object_path(&self.root, effective_uri)?;

        match store::file_hash(&path)? {
            Some(actual) => {
                if actual != withdraw.hash {
                    self.issue(
                        &withdraw.uri,
                        IssueKind::WithdrawHashMismatch {
                            expected: withdraw.hash,
                            actual,
                        },
                    );
                }
                if !self.config.verify_only {
                    std::fs::remove_file(&path)?;
                }
            }
            None => self.issue(
                &withdraw.uri,
                IssueKind::WithdrawMissing {
                    expected: withdraw.hash,
                },
            ),
        }

        self.summary.withdrawn += 1;
        self.reporter
            .element(&withdraw.uri, Outcome::Withdrawn, Some(&path));
        Ok(())
    }
}

impl Reconciler {
    /// Create a reconciler with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Apply `document` to the tree at `root`, logging through `tracing`.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::apply_with`].
    pub fn apply(&self, document: &RrdpDocument, root: &Path) -> Result<ReconcileSummary> {
        self.apply_with(document, root, &TracingReporter)
    }

    /// Apply `document` to the tree at `root`, sending events to `reporter`.
    ///
    /// `root` must exist. Elements are processed in document order; a URI
    /// seen earlier in the same document is stored under `<uri>-<hash>` so
    /// both versions are kept.
    ///
    /// # Errors
    ///
    /// - [`crate::RrdpError::PathEscape`] if an element maps outside `root`; the
    ///   run stops before anything is written for that element.
    /// - [`crate::RrdpError::SerialGap`] / [`crate::RrdpError::SessionMismatch`]
    ///   when state tracking is enabled and the delta does not follow.
    /// - I/O errors from the store.
    pub fn apply_with(
        &self,
        document: &RrdpDocument,
        root: &Path,
        reporter: &dyn Reporter,
    ) -> Result<ReconcileSummary> {
        let root = root.canonicalize()?;

        if self.config.track_state {
            match RepositoryState::load(&root)? {
                Some(state) => state.check_next(document)?,
                None if !document.is_snapshot() => warn!(
                    root = %root.display(),
                    "no recorded state; cannot check that delta {} follows",
                    document.serial()
                ),
                None => {}
            }
        }

        let mut run = Run {
            config: &self.config,
            reporter,
            is_delta: !document.is_snapshot(),
            summary: ReconcileSummary {
                kind: document.kind(),
                session_id: document.session_id().to_string(),
                serial: document.serial(),
                root: root.clone(),
                verify_only: self.config.verify_only,
                published: 0,
                withdrawn: 0,
                skipped: 0,
                issues: Vec::new(),
            },
            root,
        };

        let mut seen: FxHashMap<&str, Vec<SeenEntry>> = FxHashMap::default();

        for element in document.elements() {
            let uri = element.uri();
            let hash = *element.hash();

            let effective_uri: Cow<'_, str> = match seen.get(uri) {
                Some(previous) => {
                    let effective = format!("{uri}-{hash}");
                    run.issue(
                        uri,
                        IssueKind::DuplicateEntry {
                            effective_uri: effective.clone(),
                            previous: previous.iter().map(|entry| entry.hash).collect(),
                        },
                    );
                    Cow::Owned(effective)
                }
                None => Cow::Borrowed(uri),
            };
            seen.entry(uri).or_default().push(SeenEntry { hash });

            if !self.config.filter.matches(uri) {
                run.summary.skipped += 1;
                reporter.element(uri, Outcome::Skipped, None);
                continue;
            }

            match element {
                RrdpElement::Publish(publish) => run.publish(publish, &effective_uri)?,
                RrdpElement::Withdraw(withdraw) => run.withdraw(withdraw, &effective_uri)?,
            }
        }

        if self.config.track_state && !self.config.verify_only {
            RepositoryState::of(document).store(&run.root)?;
        }

        let summary = run.summary;
        info!(
            published = summary.published,
            withdrawn = summary.withdrawn,
            skipped = summary.skipped,
            issues = summary.issues.len(),
            verify_only = summary.verify_only,
            "applied {} {} to {}",
            summary.kind,
            summary.serial,
            summary.root.display()
        );
        Ok(summary)
    }
}
