//! Concurrent retrieval of RRDP artifacts.
//!
//! The [`Fetcher`] downloads a notification document, stores it as
//! `notification.xml`, and then retrieves the snapshot and deltas it
//! references into a flat directory. Artifacts whose bytes are already on
//! disk are never requested again; the rest are fetched under a
//! concurrency limit, each task failing on its own.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::{Position, Url};

use crate::document::{
    parse_document, parse_notification, parse_snapshot_or_delta, AnyDocument,
    NotificationDocument, RrdpDocument,
};
use crate::error::{Result, RrdpError};
use crate::hash::ContentHash;
use crate::store;

/// File name the notification document is stored under.
pub const NOTIFICATION_FILE: &str = "notification.xml";

/// Response of a [`Transport`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
    /// Parsed `Last-Modified` header.
    pub last_modified: Option<SystemTime>,
}

impl HttpResponse {
    /// Check for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Request `url`.
    ///
    /// Non-2xx answers are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`RrdpError::Transport`] if no response was received.
    async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    ///
    /// # Errors
    ///
    /// Returns [`RrdpError::Transport`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rrdp-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RrdpError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        let transport_error = |e: reqwest::Error| RrdpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);
        let body = response.bytes().await.map_err(transport_error)?.to_vec();

        Ok(HttpResponse {
            status,
            body,
            last_modified,
        })
    }
}

/// Parse an HTTP date such as `Sun, 06 Nov 1994 08:49:37 GMT`.
#[must_use]
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}

/// Which deltas to keep when `max_deltas` limits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeltaSelection {
    /// Highest serials.
    #[default]
    Newest,
    /// Lowest serials.
    Oldest,
}

/// Configuration for [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Replace scheme, host and port of every artifact URL.
    pub override_authority: Option<Url>,
    /// Do not retrieve the snapshot.
    pub skip_snapshot: bool,
    /// Retrieve at most this many deltas.
    pub max_deltas: Option<usize>,
    /// Which deltas `max_deltas` keeps.
    pub delta_selection: DeltaSelection,
    /// Maximum number of requests in flight.
    pub concurrency: usize,
    /// Insert the expected hash into artifact file names.
    pub hash_in_filename: bool,
    /// Store artifacts below a directory named after the session.
    pub include_session: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            override_authority: None,
            skip_snapshot: false,
            max_deltas: None,
            delta_selection: DeltaSelection::Newest,
            concurrency: std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
            hash_in_filename: false,
            include_session: false,
        }
    }
}

/// Builder for [`Fetcher`].
#[derive(Debug, Clone, Default)]
pub struct FetchBuilder {
    config: FetchConfig,
}

impl FetchBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace scheme, host and port of artifact URLs with those of `url`.
    #[must_use]
    pub fn override_authority(mut self, url: Url) -> Self {
        self.config.override_authority = Some(url);
        self
    }

    /// Skip the snapshot.
    #[must_use]
    pub fn skip_snapshot(mut self, skip: bool) -> Self {
        self.config.skip_snapshot = skip;
        self
    }

    /// Limit the number of deltas.
    #[must_use]
    pub fn max_deltas(mut self, max: usize) -> Self {
        self.config.max_deltas = Some(max);
        self
    }

    /// Choose which deltas the limit keeps.
    #[must_use]
    pub fn delta_selection(mut self, selection: DeltaSelection) -> Self {
        self.config.delta_selection = selection;
        self
    }

    /// Set the number of concurrent requests (at least one).
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Insert expected hashes into file names.
    #[must_use]
    pub fn hash_in_filename(mut self, enabled: bool) -> Self {
        self.config.hash_in_filename = enabled;
        self
    }

    /// Store artifacts below `<root>/<session_id>/`.
    #[must_use]
    pub fn include_session(mut self, enabled: bool) -> Self {
        self.config.include_session = enabled;
        self
    }

    /// Build a fetcher using `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<Fetcher> {
        Ok(self.build_with_transport(ReqwestTransport::new()?))
    }

    /// Build a fetcher using a custom transport.
    #[must_use]
    pub fn build_with_transport(self, transport: impl Transport + 'static) -> Fetcher {
        Fetcher {
            config: self.config,
            transport: Arc::new(transport),
        }
    }
}

/// Kind of a planned artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Snapshot document.
    Snapshot,
    /// Delta document.
    Delta,
}

/// A document to retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// What the document is.
    pub kind: ArtifactKind,
    /// Serial of the document.
    pub serial: u64,
    /// URL to request, after authority override.
    pub url: Url,
    /// Expected content hash; probed deltas have none.
    pub hash: Option<ContentHash>,
    /// File name within the output directory.
    pub file_name: String,
}

/// An artifact that could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFailure {
    /// Requested URL.
    pub url: String,
    /// Why it failed.
    pub error: String,
}

/// Outcome of a fetch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    /// Session of the notification, if one was fetched.
    pub session_id: Option<String>,
    /// Serial of the notification, if one was fetched.
    pub serial: Option<u64>,
    /// Artifacts planned.
    pub considered: usize,
    /// Artifacts retrieved and written.
    pub downloaded: usize,
    /// Artifacts already present.
    pub skipped: usize,
    /// Artifacts that failed.
    pub failed: Vec<ArtifactFailure>,
    /// Directory artifacts were written to.
    pub output_dir: PathBuf,
}

impl FetchReport {
    fn new(output_dir: PathBuf, considered: usize) -> Self {
        Self {
            session_id: None,
            serial: None,
            considered,
            downloaded: 0,
            skipped: 0,
            failed: Vec::new(),
            output_dir,
        }
    }

    /// Check if every considered artifact is now on disk.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| RrdpError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

/// Resolve an artifact URI, replacing scheme, host and port if requested.
///
/// # Errors
///
/// Returns [`RrdpError::InvalidUrl`] if `uri` is not an absolute URL.
pub fn artifact_url(uri: &str, override_authority: Option<&Url>) -> Result<Url> {
    let url = parse_url(uri)?;
    match override_authority {
        None => Ok(url),
        Some(authority) => parse_url(&format!(
            "{}://{}{}",
            authority.scheme(),
            authority.authority(),
            &url[Position::BeforePath..]
        )),
    }
}

fn artifact_file_name(prefix: &str, serial: u64, hash: &ContentHash, with_hash: bool) -> String {
    if with_hash {
        format!("{prefix}{serial}-{hash}.xml")
    } else {
        format!("{prefix}{serial}.xml")
    }
}

/// Work out which documents a notification requires.
///
/// The snapshot comes first (unless skipped), then deltas in ascending
/// serial order, limited by `max_deltas`.
///
/// # Errors
///
/// Returns [`RrdpError::InvalidUrl`] if a referenced URI is not a URL.
pub fn plan_artifacts(
    notification: &NotificationDocument,
    config: &FetchConfig,
) -> Result<Vec<Artifact>> {
    let authority = config.override_authority.as_ref();
    let mut artifacts = Vec::with_capacity(notification.deltas.len() + 1);

    if !config.skip_snapshot {
        let snapshot = &notification.snapshot;
        artifacts.push(Artifact {
            kind: ArtifactKind::Snapshot,
            serial: notification.serial,
            url: artifact_url(&snapshot.uri, authority)?,
            hash: Some(snapshot.hash),
            file_name: artifact_file_name(
                "snapshot-",
                notification.serial,
                &snapshot.hash,
                config.hash_in_filename,
            ),
        });
    }

    let deltas = &notification.deltas;
    let selected = match (config.max_deltas, config.delta_selection) {
        (Some(max), DeltaSelection::Newest) => &deltas[deltas.len().saturating_sub(max)..],
        (Some(max), DeltaSelection::Oldest) => &deltas[..max.min(deltas.len())],
        (None, _) => &deltas[..],
    };
    for delta in selected {
        artifacts.push(Artifact {
            kind: ArtifactKind::Delta,
            serial: delta.serial,
            url: artifact_url(&delta.uri, authority)?,
            hash: Some(delta.hash),
            file_name: artifact_file_name("", delta.serial, &delta.hash, config.hash_in_filename),
        });
    }

    Ok(artifacts)
}

fn stamp(path: &Path, last_modified: Option<SystemTime>) {
    if let Some(time) = last_modified {
        if let Err(e) = store::stamp_mtime(path, time) {
            warn!(path = %path.display(), "could not set modification time: {e}");
        }
    }
}

async fn is_cached(path: &Path, artifact: &Artifact, name_has_hash: bool) -> Result<bool> {
    if name_has_hash {
        return Ok(tokio::fs::try_exists(path).await?);
    }
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(match &artifact.hash {
            Some(expected) => expected.matches(&bytes),
            None => true,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn download(transport: &dyn Transport, artifact: &Artifact, path: &Path) -> Result<()> {
    let response = transport.get(&artifact.url).await?;
    if !response.is_success() {
        return Err(RrdpError::Fetch {
            url: artifact.url.to_string(),
            status: response.status,
        });
    }
    if let Some(expected) = artifact.hash {
        let actual = ContentHash::compute(&response.body);
        if actual != expected {
            return Err(RrdpError::HashMismatch {
                uri: artifact.url.to_string(),
                expected,
                actual,
            });
        }
    }
    write_atomic(path, &response.body).await?;
    stamp(path, response.last_modified);
    Ok(())
}

/// Write `bytes` to a temporary sibling of `path` and rename it into place,
/// so `path` only ever holds a complete body.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("xml.tmp");
    if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Retrieves RRDP repositories over HTTP.
#[derive(Clone)]
pub struct Fetcher {
    config: FetchConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get_ok(&self, url: &Url) -> Result<HttpResponse> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(RrdpError::Fetch {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }

    /// Mirror the documents referenced by the notification at
    /// `notification_url` into `root`.
    ///
    /// # Errors
    ///
    /// Fails if the notification cannot be retrieved, parsed or stored, or if
    /// the output directory cannot be created. Artifact failures are listed
    /// in the report instead.
    pub async fn sync(&self, notification_url: &str, root: &Path) -> Result<FetchReport> {
        let url = parse_url(notification_url)?;
        let response = self.get_ok(&url).await?;
        let notification = parse_notification(&response.body)?;
        info!(
            session_id = %notification.session_id,
            serial = notification.serial,
            deltas = notification.deltas.len(),
            "fetched notification {url}"
        );

        let output_dir = if self.config.include_session {
            root.join(&notification.session_id)
        } else {
            root.to_path_buf()
        };
        tokio::fs::create_dir_all(&output_dir).await?;

        let notification_path = output_dir.join(NOTIFICATION_FILE);
        write_atomic(&notification_path, &response.body).await?;
        stamp(&notification_path, response.last_modified);

        let artifacts = plan_artifacts(&notification, &self.config)?;
        let mut report = self.fetch_artifacts(artifacts, output_dir).await?;
        report.session_id = Some(notification.session_id);
        report.serial = Some(notification.serial);
        Ok(report)
    }

    /// Retrieve `<n>.xml` for every `n` in `serials`, substituting `n` for
    /// `{}` in `template`.
    ///
    /// No hashes are known, so nothing is verified and any existing file
    /// counts as present.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated URL is invalid.
    pub async fn probe_deltas(
        &self,
        template: &str,
        serials: Range<u64>,
        dir: &Path,
    ) -> Result<FetchReport> {
        let artifacts = serials
            .map(|serial| {
                Ok(Artifact {
                    kind: ArtifactKind::Delta,
                    serial,
                    url: parse_url(&template.replace("{}", &serial.to_string()))?,
                    hash: None,
                    file_name: format!("{serial}.xml"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.fetch_artifacts(artifacts, dir.to_path_buf()).await
    }

    /// Retrieve a single document.
    ///
    /// A snapshot or delta is returned as is. For a notification, the
    /// snapshot it references is retrieved, verified and returned.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or parsing fails, or if the snapshot
    /// does not match the hash in the notification.
    pub async fn fetch_document(&self, url: &str) -> Result<RrdpDocument> {
        let url = parse_url(url)?;
        let response = self.get_ok(&url).await?;
        match parse_document(&response.body)? {
            AnyDocument::Rrdp(document) => Ok(document),
            AnyDocument::Notification(notification) => {
                let snapshot = &notification.snapshot;
                let snapshot_url =
                    artifact_url(&snapshot.uri, self.config.override_authority.as_ref())?;
                info!(serial = notification.serial, "following notification to {snapshot_url}");
                let body = self.get_ok(&snapshot_url).await?.body;
                let actual = ContentHash::compute(&body);
                if actual != snapshot.hash {
                    return Err(RrdpError::HashMismatch {
                        uri: snapshot_url.to_string(),
                        expected: snapshot.hash,
                        actual,
                    });
                }
                parse_snapshot_or_delta(&body)
            }
        }
    }

    async fn fetch_artifacts(
        &self,
        artifacts: Vec<Artifact>,
        output_dir: PathBuf,
    ) -> Result<FetchReport> {
        let mut report = FetchReport::new(output_dir, artifacts.len());

        let mut pending = Vec::new();
        for artifact in artifacts {
            let path = report.output_dir.join(&artifact.file_name);
            match is_cached(&path, &artifact, self.config.hash_in_filename).await {
                Ok(true) => {
                    debug!(file = %artifact.file_name, "already present");
                    report.skipped += 1;
                }
                Ok(false) => pending.push((artifact, path)),
                Err(e) => {
                    error!(path = %path.display(), "cannot check cached file: {e}");
                    report.failed.push(ArtifactFailure {
                        url: artifact.url.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut urls = FxHashMap::default();

        for (artifact, path) in pending {
            let semaphore = Arc::clone(&semaphore);
            let transport = Arc::clone(&self.transport);
            let url = artifact.url.to_string();
            let handle = tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => download(transport.as_ref(), &artifact, &path).await,
                    Err(e) => Err(RrdpError::Transport {
                        url: artifact.url.to_string(),
                        message: e.to_string(),
                    }),
                };
                (artifact, result)
            });
            urls.insert(handle.id(), url);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((artifact, Ok(()))) => {
                    info!(serial = artifact.serial, file = %artifact.file_name, "downloaded {}", artifact.url);
                    report.downloaded += 1;
                }
                Ok((artifact, Err(e))) => {
                    error!("{e}");
                    report.failed.push(ArtifactFailure {
                        url: artifact.url.to_string(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("download task failed: {e}");
                    report.failed.push(ArtifactFailure {
                        url: urls.remove(&e.id()).unwrap_or_default(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            considered = report.considered,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed.len(),
            "fetch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DeltaRef, SnapshotRef};

    fn notification(deltas: &[u64]) -> NotificationDocument {
        NotificationDocument {
            session_id: "9df4b597".to_string(),
            serial: 42,
            snapshot: SnapshotRef {
                uri: "https://rrdp.example.net/9df4b597/42/snapshot.xml".to_string(),
                hash: ContentHash::compute(b"snapshot"),
            },
            deltas: deltas
                .iter()
                .map(|serial| DeltaRef {
                    serial: *serial,
                    uri: format!("https://rrdp.example.net/9df4b597/{serial}/delta.xml"),
                    hash: ContentHash::compute(serial.to_string().as_bytes()),
                })
                .collect(),
        }
    }

    // ==========================================================================
    // PLANNING
    // ==========================================================================

    #[test]
    fn plan_everything_by_default() {
        let plan = plan_artifacts(&notification(&[40, 41, 42]), &FetchConfig::default()).unwrap();
        let names: Vec<&str> = plan.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["snapshot-42.xml", "40.xml", "41.xml", "42.xml"]);
        assert_eq!(plan[0].kind, ArtifactKind::Snapshot);
    }

    #[test]
    fn plan_newest_and_oldest() {
        let doc = notification(&[40, 41, 42]);
        let newest = FetchBuilder::new().max_deltas(2).skip_snapshot(true);
        let plan = plan_artifacts(&doc, newest.build_with_transport(NoTransport).config()).unwrap();
        let serials: Vec<u64> = plan.iter().map(|a| a.serial).collect();
        assert_eq!(serials, vec![41, 42]);

        let oldest = FetchBuilder::new()
            .max_deltas(2)
            .skip_snapshot(true)
            .delta_selection(DeltaSelection::Oldest);
        let plan = plan_artifacts(&doc, oldest.build_with_transport(NoTransport).config()).unwrap();
        let serials: Vec<u64> = plan.iter().map(|a| a.serial).collect();
        assert_eq!(serials, vec![40, 41]);

        let config = FetchConfig {
            max_deltas: Some(10),
            ..FetchConfig::default()
        };
        assert_eq!(plan_artifacts(&doc, &config).unwrap().len(), 4);
    }

    #[test]
    fn plan_with_hash_in_filename() {
        let config = FetchConfig {
            hash_in_filename: true,
            ..FetchConfig::default()
        };
        let plan = plan_artifacts(&notification(&[41]), &config).unwrap();
        assert_eq!(
            plan[0].file_name,
            format!("snapshot-42-{}.xml", ContentHash::compute(b"snapshot"))
        );
        assert_eq!(
            plan[1].file_name,
            format!("41-{}.xml", ContentHash::compute(b"41"))
        );
    }

    #[test]
    fn override_authority_keeps_path() {
        let authority = Url::parse("http://localhost:8080").unwrap();
        let url = artifact_url(
            "https://rrdp.example.net/a/b/snapshot.xml?x=1",
            Some(&authority),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/a/b/snapshot.xml?x=1");

        let unchanged = artifact_url("https://rrdp.example.net/n.xml", None).unwrap();
        assert_eq!(unchanged.as_str(), "https://rrdp.example.net/n.xml");
    }

    #[test]
    fn invalid_artifact_url() {
        assert!(matches!(
            artifact_url("not a url", None),
            Err(RrdpError::InvalidUrl { .. })
        ));
    }

    // ==========================================================================
    // HTTP HELPERS
    // ==========================================================================

    #[test]
    fn http_date() {
        let time = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(
            time.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
            784_111_777
        );
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn response_success_range() {
        let response = |status| HttpResponse {
            status,
            body: Vec::new(),
            last_modified: None,
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(304).is_success());
        assert!(!response(404).is_success());
    }

    #[test]
    fn builder_clamps_concurrency() {
        let fetcher = FetchBuilder::new()
            .concurrency(0)
            .build_with_transport(NoTransport);
        assert_eq!(fetcher.config().concurrency, 1);
        assert!(FetchConfig::default().concurrency >= 1);
    }

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse> {
            Err(RrdpError::Transport {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn transport_failure_is_fatal_for_notification() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FetchBuilder::new().build_with_transport(NoTransport);
        let err = fetcher
            .sync("https://rrdp.example.net/notification.xml", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RrdpError::Transport { .. }));
    }
}
