//! RRDP document model: notification, snapshot and delta files.
//!
//! Parsing is pure and fully materializes the document, since callers need
//! both ordered replay and random access (counting, sorting by serial).
//! Every document also renders back to RRDP XML through [`std::fmt::Display`].

use std::fmt;

use base64::Engine;

use crate::error::{Result, RrdpError};
use crate::hash::ContentHash;
use crate::schema;
use crate::xml::{self, RawDocument, RawElement, NS_RRDP};

/// Reference to the current snapshot in a notification file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    /// Where the snapshot can be downloaded.
    pub uri: String,
    /// Expected SHA-256 of the snapshot file.
    pub hash: ContentHash,
}

/// Reference to a delta file in a notification file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRef {
    /// Serial the delta brings the repository to.
    pub serial: u64,
    /// Where the delta can be downloaded.
    pub uri: String,
    /// Expected SHA-256 of the delta file.
    pub hash: ContentHash,
}

/// Parsed `notification.xml`.
///
/// Deltas are sorted ascending by serial; serials are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDocument {
    /// Session the serial numbers belong to.
    pub session_id: String,
    /// Current serial of the repository.
    pub serial: u64,
    /// The current full snapshot.
    pub snapshot: SnapshotRef,
    /// Available deltas, ascending by serial.
    pub deltas: Vec<DeltaRef>,
}

impl NotificationDocument {
    /// Look up the delta for `serial`.
    #[must_use]
    pub fn delta(&self, serial: u64) -> Option<&DeltaRef> {
        self.deltas.iter().find(|delta| delta.serial == serial)
    }

    /// Render as RRDP XML.
    #[must_use]
    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

/// A `<publish>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishElement {
    uri: String,
    previous_hash: Option<ContentHash>,
    content: Vec<u8>,
    content_hash: ContentHash,
}

impl PublishElement {
    /// Create a publish element; the content hash is computed here.
    #[must_use]
    pub fn new(uri: impl Into<String>, previous_hash: Option<ContentHash>, content: Vec<u8>) -> Self {
        let content_hash = ContentHash::compute(&content);
        Self {
            uri: uri.into(),
            previous_hash,
            content,
            content_hash,
        }
    }

    /// Object URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Hash of the object this publish replaces, if any.
    #[must_use]
    pub const fn previous_hash(&self) -> Option<&ContentHash> {
        self.previous_hash.as_ref()
    }

    /// Decoded object content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// SHA-256 of [`Self::content`].
    #[must_use]
    pub const fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }
}

/// A `<withdraw>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawElement {
    /// Object URI.
    pub uri: String,
    /// Hash the object is expected to have before removal.
    pub hash: ContentHash,
}

/// One operation of a snapshot or delta, in replay order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RrdpElement {
    /// Create or replace an object.
    Publish(PublishElement),
    /// Remove an object.
    Withdraw(WithdrawElement),
}

impl RrdpElement {
    /// Object URI the element operates on.
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Publish(publish) => publish.uri(),
            Self::Withdraw(withdraw) => &withdraw.uri,
        }
    }

    /// Content hash for a publish, declared hash for a withdraw.
    #[must_use]
    pub const fn hash(&self) -> &ContentHash {
        match self {
            Self::Publish(publish) => publish.content_hash(),
            Self::Withdraw(withdraw) => &withdraw.hash,
        }
    }

    /// Check if this is a publish.
    #[must_use]
    pub const fn is_publish(&self) -> bool {
        matches!(self, Self::Publish(_))
    }

    /// Check if this is a withdraw.
    #[must_use]
    pub const fn is_withdraw(&self) -> bool {
        matches!(self, Self::Withdraw(_))
    }
}

/// Full repository state at `serial`.
///
/// Contains only publish elements without a previous hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDocument {
    /// Session identifier.
    pub session_id: String,
    /// Serial of the state.
    pub serial: u64,
    /// Publish elements in document order.
    pub elements: Vec<RrdpElement>,
}

/// Changes from `serial - 1` to `serial`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaDocument {
    /// Session identifier.
    pub session_id: String,
    /// Serial the delta moves the repository to.
    pub serial: u64,
    /// Operations in replay order.
    pub elements: Vec<RrdpElement>,
}

/// A snapshot or a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RrdpDocument {
    /// Full state.
    Snapshot(SnapshotDocument),
    /// Incremental changes.
    Delta(DeltaDocument),
}

impl RrdpDocument {
    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Snapshot(doc) => &doc.session_id,
            Self::Delta(doc) => &doc.session_id,
        }
    }

    /// Serial number.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        match self {
            Self::Snapshot(doc) => doc.serial,
            Self::Delta(doc) => doc.serial,
        }
    }

    /// Elements in replay order.
    #[must_use]
    pub fn elements(&self) -> &[RrdpElement] {
        match self {
            Self::Snapshot(doc) => &doc.elements,
            Self::Delta(doc) => &doc.elements,
        }
    }

    /// Root element name, `snapshot` or `delta`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::Delta(_) => "delta",
        }
    }

    /// Check if this is a snapshot.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    /// Number of publish elements.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.elements().iter().filter(|e| e.is_publish()).count()
    }

    /// Number of withdraw elements.
    #[must_use]
    pub fn withdraw_count(&self) -> usize {
        self.elements().iter().filter(|e| e.is_withdraw()).count()
    }

    /// Render as RRDP XML.
    #[must_use]
    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

/// Any RRDP document, for callers that do not know what a file contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyDocument {
    /// A notification file.
    Notification(NotificationDocument),
    /// A snapshot or delta.
    Rrdp(RrdpDocument),
}

// =============================================================================
// PARSING
// =============================================================================

struct Header {
    session_id: String,
    serial: u64,
}

fn header(root: &RawElement) -> Result<Header> {
    schema::require_namespace(root)?;
    schema::allowed_attributes(root, &["version", "session_id", "serial"])?;
    schema::version(root)?;
    Ok(Header {
        session_id: schema::session_id(schema::required(root, "session_id")?)?,
        serial: schema::serial(schema::required(root, "serial")?)?,
    })
}

fn no_content(element: &RawElement) -> Result<()> {
    if element.text.trim().is_empty() {
        Ok(())
    } else {
        Err(RrdpError::validation(format!(
            "<{}> must not have content",
            element.name
        )))
    }
}

fn notification_from_raw(raw: &RawDocument) -> Result<NotificationDocument> {
    let Header { session_id, serial } = header(&raw.root)?;

    let mut children = raw.children.iter();
    let snapshot = match children.next() {
        Some(child) if child.name == "snapshot" => {
            schema::require_namespace(child)?;
            schema::allowed_attributes(child, &["uri", "hash"])?;
            no_content(child)?;
            SnapshotRef {
                uri: schema::uri(schema::required(child, "uri")?)?,
                hash: schema::hash(schema::required(child, "hash")?)?,
            }
        }
        Some(child) => {
            return Err(RrdpError::validation(format!(
                "expected <snapshot> as first child of <notification>, found <{}>",
                child.name
            )))
        }
        None => {
            return Err(RrdpError::validation(
                "<notification> has no <snapshot> element",
            ))
        }
    };

    let mut deltas: Vec<DeltaRef> = Vec::new();
    for child in children {
        if child.name != "delta" {
            return Err(RrdpError::validation(format!(
                "unexpected <{}> in <notification>",
                child.name
            )));
        }
        schema::require_namespace(child)?;
        schema::allowed_attributes(child, &["serial", "uri", "hash"])?;
        no_content(child)?;
        let delta = DeltaRef {
            serial: schema::serial(schema::required(child, "serial")?)?,
            uri: schema::uri(schema::required(child, "uri")?)?,
            hash: schema::hash(schema::required(child, "hash")?)?,
        };
        if deltas.iter().any(|d| d.serial == delta.serial) {
            return Err(RrdpError::validation(format!(
                "duplicate delta serial {} in notification",
                delta.serial
            )));
        }
        deltas.push(delta);
    }
    deltas.sort_by_key(|delta| delta.serial);

    Ok(NotificationDocument {
        session_id,
        serial,
        snapshot,
        deltas,
    })
}

fn publish_from_raw(element: &RawElement, allow_hash: bool) -> Result<PublishElement> {
    let allowed: &[&str] = if allow_hash { &["uri", "hash"] } else { &["uri"] };
    schema::allowed_attributes(element, allowed)?;
    let uri = schema::uri(schema::required(element, "uri")?)?;
    let previous_hash = element.attribute("hash").map(schema::hash).transpose()?;
    // Absent text is an empty object, which is valid.
    let content = schema::base64(&element.text)?;
    Ok(PublishElement::new(uri, previous_hash, content))
}

fn withdraw_from_raw(element: &RawElement) -> Result<WithdrawElement> {
    schema::allowed_attributes(element, &["uri", "hash"])?;
    no_content(element)?;
    Ok(WithdrawElement {
        uri: schema::uri(schema::required(element, "uri")?)?,
        hash: schema::hash(schema::required(element, "hash")?)?,
    })
}

fn snapshot_from_raw(raw: &RawDocument) -> Result<SnapshotDocument> {
    let Header { session_id, serial } = header(&raw.root)?;

    let elements = raw
        .children
        .iter()
        .map(|child| {
            schema::require_namespace(child)?;
            match child.name.as_str() {
                "publish" => Ok(RrdpElement::Publish(publish_from_raw(child, false)?)),
                other => Err(RrdpError::validation(format!(
                    "unexpected <{other}> in <snapshot>"
                ))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SnapshotDocument {
        session_id,
        serial,
        elements,
    })
}

fn delta_from_raw(raw: &RawDocument) -> Result<DeltaDocument> {
    let Header { session_id, serial } = header(&raw.root)?;

    if raw.children.is_empty() {
        return Err(RrdpError::validation(
            "<delta> must contain at least one publish or withdraw",
        ));
    }

    let elements = raw
        .children
        .iter()
        .map(|child| {
            schema::require_namespace(child)?;
            match child.name.as_str() {
                "publish" => Ok(RrdpElement::Publish(publish_from_raw(child, true)?)),
                "withdraw" => Ok(RrdpElement::Withdraw(withdraw_from_raw(child)?)),
                other => Err(RrdpError::validation(format!(
                    "unexpected <{other}> in <delta>"
                ))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DeltaDocument {
        session_id,
        serial,
        elements,
    })
}

/// Parse a notification file.
///
/// # Errors
///
/// Returns [`RrdpError::MalformedDocument`] if the root element is not
/// `notification`, and [`RrdpError::Validation`] if the document is not
/// well-formed or violates the RRDP schema.
pub fn parse_notification(bytes: &[u8]) -> Result<NotificationDocument> {
    let raw = xml::read_document(bytes)?;
    if raw.root.name != "notification" {
        return Err(RrdpError::MalformedDocument {
            root: raw.root.name,
        });
    }
    notification_from_raw(&raw)
}

/// Parse a snapshot or delta file, selected by its root element.
///
/// # Errors
///
/// Returns [`RrdpError::UnexpectedDocument`] if the root element is neither
/// `snapshot` nor `delta`, and [`RrdpError::Validation`] on schema violations.
pub fn parse_snapshot_or_delta(bytes: &[u8]) -> Result<RrdpDocument> {
    let raw = xml::read_document(bytes)?;
    match raw.root.name.as_str() {
        "snapshot" => Ok(RrdpDocument::Snapshot(snapshot_from_raw(&raw)?)),
        "delta" => Ok(RrdpDocument::Delta(delta_from_raw(&raw)?)),
        _ => Err(RrdpError::UnexpectedDocument {
            root: raw.root.name,
        }),
    }
}

/// Parse a notification, snapshot or delta file.
///
/// # Errors
///
/// Returns [`RrdpError::UnexpectedDocument`] for unknown root elements and
/// [`RrdpError::Validation`] on schema violations.
pub fn parse_document(bytes: &[u8]) -> Result<AnyDocument> {
    let raw = xml::read_document(bytes)?;
    match raw.root.name.as_str() {
        "notification" => Ok(AnyDocument::Notification(notification_from_raw(&raw)?)),
        "snapshot" => Ok(AnyDocument::Rrdp(RrdpDocument::Snapshot(
            snapshot_from_raw(&raw)?,
        ))),
        "delta" => Ok(AnyDocument::Rrdp(RrdpDocument::Delta(delta_from_raw(&raw)?))),
        _ => Err(RrdpError::UnexpectedDocument {
            root: raw.root.name,
        }),
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

fn write_root(f: &mut fmt::Formatter<'_>, name: &str, session_id: &str, serial: u64) -> fmt::Result {
    write!(
        f,
        r#"<{name} xmlns="{NS_RRDP}" version="{}" session_id="{}" serial="{serial}">"#,
        schema::RRDP_VERSION,
        xml::escape(session_id)
    )
}

impl fmt::Display for NotificationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_root(f, "notification", &self.session_id, self.serial)?;
        write!(
            f,
            r#"<snapshot uri="{}" hash="{}"/>"#,
            xml::escape(&self.snapshot.uri),
            self.snapshot.hash
        )?;
        for delta in &self.deltas {
            write!(
                f,
                r#"<delta serial="{}" uri="{}" hash="{}"/>"#,
                delta.serial,
                xml::escape(&delta.uri),
                delta.hash
            )?;
        }
        write!(f, "</notification>")
    }
}

impl fmt::Display for RrdpElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish(publish) => {
                write!(f, r#"<publish uri="{}""#, xml::escape(publish.uri()))?;
                if let Some(hash) = publish.previous_hash() {
                    write!(f, r#" hash="{hash}""#)?;
                }
                write!(
                    f,
                    ">{}</publish>",
                    base64::engine::general_purpose::STANDARD.encode(publish.content())
                )
            }
            Self::Withdraw(withdraw) => write!(
                f,
                r#"<withdraw uri="{}" hash="{}"/>"#,
                xml::escape(&withdraw.uri),
                withdraw.hash
            ),
        }
    }
}

impl fmt::Display for RrdpDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_root(f, self.kind(), self.session_id(), self.serial())?;
        for element in self.elements() {
            write!(f, "{element}")?;
        }
        write!(f, "</{}>", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = "9df4b597-af9e-4dca-bdda-719cce2c4e28";

    fn b64(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    fn h(data: &[u8]) -> String {
        ContentHash::compute(data).to_hex()
    }

    fn notification_xml(body: &str) -> String {
        format!(
            r#"<notification xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="3">{body}</notification>"#
        )
    }

    // ==========================================================================
    // NOTIFICATION
    // ==========================================================================

    #[test]
    fn notification_parses_and_sorts_deltas() {
        let xml = notification_xml(&format!(
            r#"
            <snapshot uri="https://rrdp.example/s.xml" hash="{0}"/>
            <delta serial="3" uri="https://rrdp.example/3.xml" hash="{0}"/>
            <delta serial="2" uri="https://rrdp.example/2.xml" hash="{1}"/>
            "#,
            h(b"s"),
            h(b"2").to_uppercase()
        ));
        let doc = parse_notification(xml.as_bytes()).unwrap();

        assert_eq!(doc.session_id, SESSION);
        assert_eq!(doc.serial, 3);
        assert_eq!(doc.snapshot.uri, "https://rrdp.example/s.xml");
        assert_eq!(doc.snapshot.hash, ContentHash::compute(b"s"));
        let serials: Vec<u64> = doc.deltas.iter().map(|d| d.serial).collect();
        assert_eq!(serials, vec![2, 3]);
        assert_eq!(doc.delta(2).unwrap().hash, ContentHash::compute(b"2"));
        assert!(doc.delta(7).is_none());
    }

    #[test]
    fn notification_requires_one_snapshot() {
        let none = notification_xml("");
        assert!(matches!(
            parse_notification(none.as_bytes()),
            Err(RrdpError::Validation(_))
        ));

        let two = notification_xml(&format!(
            r#"<snapshot uri="a" hash="{0}"/><snapshot uri="b" hash="{0}"/>"#,
            h(b"s")
        ));
        assert!(parse_notification(two.as_bytes()).is_err());

        let delta_first = notification_xml(&format!(
            r#"<delta serial="1" uri="d" hash="{0}"/><snapshot uri="a" hash="{0}"/>"#,
            h(b"s")
        ));
        assert!(parse_notification(delta_first.as_bytes()).is_err());
    }

    #[test]
    fn notification_rejects_duplicate_delta_serials() {
        let xml = notification_xml(&format!(
            r#"<snapshot uri="s" hash="{0}"/><delta serial="2" uri="a" hash="{0}"/><delta serial="2" uri="b" hash="{0}"/>"#,
            h(b"s")
        ));
        let err = parse_notification(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate delta serial 2"));
    }

    #[test]
    fn notification_rejects_missing_attributes() {
        let xml = format!(
            r#"<notification xmlns="{NS_RRDP}" version="1" serial="3"><snapshot uri="s" hash="{}"/></notification>"#,
            h(b"s")
        );
        let err = parse_notification(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn notification_wrong_root_is_malformed() {
        let xml = format!(r#"<snapshot xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"/>"#);
        let err = parse_notification(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, RrdpError::MalformedDocument { root } if root == "snapshot"));
    }

    #[test]
    fn notification_requires_namespace() {
        let xml = format!(
            r#"<notification version="1" session_id="{SESSION}" serial="1"><snapshot uri="s" hash="{}"/></notification>"#,
            h(b"s")
        );
        assert!(matches!(
            parse_notification(xml.as_bytes()),
            Err(RrdpError::Validation(_))
        ));
    }

    // ==========================================================================
    // SNAPSHOT
    // ==========================================================================

    #[test]
    fn snapshot_parses_publishes() {
        let xml = format!(
            r#"<snapshot xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="7">
                <publish uri="rsync://host/repo/a.cer">{}</publish>
                <publish uri="rsync://host/repo/empty.crl"></publish>
            </snapshot>"#,
            b64(b"certificate")
        );
        let doc = parse_snapshot_or_delta(xml.as_bytes()).unwrap();

        assert!(doc.is_snapshot());
        assert_eq!(doc.serial(), 7);
        assert_eq!(doc.session_id(), SESSION);
        assert_eq!(doc.publish_count(), 2);
        match &doc.elements()[0] {
            RrdpElement::Publish(p) => {
                assert_eq!(p.uri(), "rsync://host/repo/a.cer");
                assert_eq!(p.content(), b"certificate");
                assert_eq!(*p.content_hash(), ContentHash::compute(b"certificate"));
                assert!(p.previous_hash().is_none());
            }
            RrdpElement::Withdraw(_) => panic!("expected publish"),
        }
        match &doc.elements()[1] {
            RrdpElement::Publish(p) => assert!(p.content().is_empty()),
            RrdpElement::Withdraw(_) => panic!("expected publish"),
        }
    }

    #[test]
    fn empty_snapshot_is_valid() {
        let xml = format!(r#"<snapshot xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"/>"#);
        let doc = parse_snapshot_or_delta(xml.as_bytes()).unwrap();
        assert!(doc.elements().is_empty());
    }

    #[test]
    fn snapshot_rejects_hash_and_withdraw() {
        let with_hash = format!(
            r#"<snapshot xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"><publish uri="a" hash="{}">AA==</publish></snapshot>"#,
            h(b"x")
        );
        assert!(parse_snapshot_or_delta(with_hash.as_bytes()).is_err());

        let with_withdraw = format!(
            r#"<snapshot xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"><withdraw uri="a" hash="{}"/></snapshot>"#,
            h(b"x")
        );
        assert!(parse_snapshot_or_delta(with_withdraw.as_bytes()).is_err());
    }

    #[test]
    fn snapshot_rejects_bad_base64() {
        let xml = format!(
            r#"<snapshot xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"><publish uri="a">!!!</publish></snapshot>"#
        );
        let err = parse_snapshot_or_delta(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    // ==========================================================================
    // DELTA
    // ==========================================================================

    #[test]
    fn delta_parses_in_order() {
        let xml = format!(
            r#"<delta xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="8">
                <publish uri="rsync://host/a.roa" hash="{0}">{1}</publish>
                <withdraw uri="rsync://host/b.roa" hash="{2}"/>
                <publish uri="rsync://host/c.roa">{1}</publish>
            </delta>"#,
            h(b"old").to_uppercase(),
            b64(b"new"),
            h(b"gone"),
        );
        let doc = parse_snapshot_or_delta(xml.as_bytes()).unwrap();

        assert!(!doc.is_snapshot());
        assert_eq!(doc.kind(), "delta");
        assert_eq!(doc.publish_count(), 2);
        assert_eq!(doc.withdraw_count(), 1);
        let uris: Vec<&str> = doc.elements().iter().map(RrdpElement::uri).collect();
        assert_eq!(uris, vec!["rsync://host/a.roa", "rsync://host/b.roa", "rsync://host/c.roa"]);

        match &doc.elements()[0] {
            RrdpElement::Publish(p) => {
                assert_eq!(p.previous_hash(), Some(&ContentHash::compute(b"old")));
            }
            RrdpElement::Withdraw(_) => panic!("expected publish"),
        }
        assert_eq!(*doc.elements()[1].hash(), ContentHash::compute(b"gone"));
    }

    #[test]
    fn delta_requires_elements() {
        let xml = format!(r#"<delta xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"></delta>"#);
        assert!(matches!(
            parse_snapshot_or_delta(xml.as_bytes()),
            Err(RrdpError::Validation(_))
        ));
    }

    #[test]
    fn withdraw_requires_hash() {
        let xml = format!(
            r#"<delta xmlns="{NS_RRDP}" version="1" session_id="{SESSION}" serial="1"><withdraw uri="a"/></delta>"#
        );
        let err = parse_snapshot_or_delta(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("\"hash\""));
    }

    #[test]
    fn notification_is_unexpected_for_snapshot_parser() {
        let xml = notification_xml(&format!(r#"<snapshot uri="s" hash="{}"/>"#, h(b"s")));
        let err = parse_snapshot_or_delta(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, RrdpError::UnexpectedDocument { root } if root == "notification"));
    }

    #[test]
    fn parse_document_dispatches() {
        let xml = notification_xml(&format!(r#"<snapshot uri="s" hash="{}"/>"#, h(b"s")));
        assert!(matches!(
            parse_document(xml.as_bytes()).unwrap(),
            AnyDocument::Notification(_)
        ));
        assert!(matches!(
            parse_document(b"<html/>"),
            Err(RrdpError::UnexpectedDocument { .. })
        ));
    }

    // ==========================================================================
    // SERIALIZATION
    // ==========================================================================

    #[test]
    fn to_xml_reparses_to_equal_documents() {
        let delta = RrdpDocument::Delta(DeltaDocument {
            session_id: SESSION.to_string(),
            serial: 12,
            elements: vec![
                RrdpElement::Publish(PublishElement::new(
                    "rsync://host/a&b.cer",
                    Some(ContentHash::compute(b"old")),
                    b"new".to_vec(),
                )),
                RrdpElement::Withdraw(WithdrawElement {
                    uri: "rsync://host/c.cer".to_string(),
                    hash: ContentHash::compute(b"c"),
                }),
                RrdpElement::Publish(PublishElement::new("rsync://host/e.cer", None, Vec::new())),
            ],
        });
        assert_eq!(parse_snapshot_or_delta(delta.to_xml().as_bytes()).unwrap(), delta);

        let notification = NotificationDocument {
            session_id: SESSION.to_string(),
            serial: 12,
            snapshot: SnapshotRef {
                uri: "https://host/s.xml".to_string(),
                hash: ContentHash::compute(b"s"),
            },
            deltas: vec![DeltaRef {
                serial: 12,
                uri: "https://host/12.xml".to_string(),
                hash: ContentHash::compute(b"d"),
            }],
        };
        assert_eq!(parse_notification(notification.to_xml().as_bytes()).unwrap(), notification);
    }
}
