//! Structural rules of the RRDP RELAX NG schema (RFC 8182, section 3.5).
//!
//! The schema is small enough to enforce directly on the flattened element
//! tree produced by [`crate::xml`]: datatype checks for each attribute plus
//! the allowed attribute set per element.

use base64::Engine;

use crate::error::{Result, RrdpError};
use crate::hash::ContentHash;
use crate::xml::RawElement;

/// The only protocol version defined by RFC 8182.
pub const RRDP_VERSION: u64 = 1;

/// Require the element to live in the RRDP namespace.
pub(crate) fn require_namespace(element: &RawElement) -> Result<()> {
    if element.in_rrdp_namespace() {
        Ok(())
    } else {
        Err(RrdpError::validation(format!(
            "element <{}> is not in the RRDP namespace (found {:?})",
            element.name, element.namespace
        )))
    }
}

/// Reject attributes outside of `allowed`.
pub(crate) fn allowed_attributes(element: &RawElement, allowed: &[&str]) -> Result<()> {
    for (key, _) in &element.attributes {
        if !allowed.contains(&key.as_str()) {
            return Err(RrdpError::validation(format!(
                "attribute {key:?} is not allowed on <{}>",
                element.name
            )));
        }
    }
    Ok(())
}

/// Fetch a required attribute.
pub(crate) fn required<'a>(element: &'a RawElement, name: &str) -> Result<&'a str> {
    element.attribute(name).ok_or_else(|| {
        RrdpError::validation(format!(
            "<{}> is missing required attribute {name:?}",
            element.name
        ))
    })
}

fn positive_integer(kind: &str, value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RrdpError::validation(format!(
            "{kind} {value:?} is not a positive integer"
        )));
    }
    match digits.parse::<u64>() {
        Ok(0) => Err(RrdpError::validation(format!("{kind} must be positive, got 0"))),
        Ok(n) => Ok(n),
        Err(e) => Err(RrdpError::validation(format!("{kind} {value:?}: {e}"))),
    }
}

/// `version = xsd:positiveInteger { maxInclusive="1" }`
pub(crate) fn version(element: &RawElement) -> Result<()> {
    let value = required(element, "version")?;
    let version = positive_integer("version", value)?;
    if version > RRDP_VERSION {
        return Err(RrdpError::validation(format!(
            "unsupported RRDP version {version}"
        )));
    }
    Ok(())
}

/// `serial = xsd:positiveInteger`
pub(crate) fn serial(value: &str) -> Result<u64> {
    positive_integer("serial", value)
}

/// `uuid = xsd:string { pattern = "[\-0-9a-fA-F]+" }`
pub(crate) fn session_id(value: &str) -> Result<String> {
    if !value.is_empty() && value.bytes().all(|b| b == b'-' || b.is_ascii_hexdigit()) {
        Ok(value.to_string())
    } else {
        Err(RrdpError::validation(format!(
            "session_id {value:?} is not a UUID"
        )))
    }
}

/// `uri = xsd:anyURI`
///
/// Only rejects empty values; path safety is checked when the URI is mapped
/// onto the store.
pub(crate) fn uri(value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(RrdpError::validation("empty uri attribute"))
    } else {
        Ok(value.to_string())
    }
}

/// `hash = xsd:string { pattern = "[0-9a-fA-F]+" }`, restricted to SHA-256.
pub(crate) fn hash(value: &str) -> Result<ContentHash> {
    ContentHash::from_hex(value)
}

/// `base64 = xsd:base64Binary`; XML whitespace inside the value is ignored.
pub(crate) fn base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| RrdpError::validation(format!("invalid base64 content: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::NS_RRDP;

    fn element(name: &str, attributes: &[(&str, &str)]) -> RawElement {
        RawElement {
            name: name.to_string(),
            namespace: Some(NS_RRDP.to_string()),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            text: String::new(),
        }
    }

    #[test]
    fn version_accepts_one_only() {
        assert!(version(&element("snapshot", &[("version", "1")])).is_ok());
        assert!(version(&element("snapshot", &[("version", "2")])).is_err());
        assert!(version(&element("snapshot", &[("version", "0")])).is_err());
        assert!(version(&element("snapshot", &[])).is_err());
    }

    #[test]
    fn serial_positive_integers() {
        assert_eq!(serial("42").unwrap(), 42);
        assert_eq!(serial(" 007 ").unwrap(), 7);
        assert_eq!(serial("+3").unwrap(), 3);
        assert!(serial("0").is_err());
        assert!(serial("-1").is_err());
        assert!(serial("1.5").is_err());
        assert!(serial("").is_err());
        assert!(serial("99999999999999999999999").is_err());
    }

    #[test]
    fn session_id_pattern() {
        assert!(session_id("9df4b597-af9e-4dca-bdda-719cce2c4e28").is_ok());
        assert!(session_id("ABCDEF").is_ok());
        assert!(session_id("not-a-uuid").is_err());
        assert!(session_id("").is_err());
    }

    #[test]
    fn hash_requires_sha256_hex() {
        let hex = ContentHash::compute(b"x").to_hex();
        assert!(hash(&hex).is_ok());
        assert!(hash(&hex.to_uppercase()).is_ok());
        assert!(hash("abcd").is_err());
    }

    #[test]
    fn base64_ignores_whitespace() {
        assert_eq!(base64("aGVs\n  bG8=\r\n").unwrap(), b"hello");
        assert_eq!(base64("").unwrap(), b"");
        assert_eq!(base64("  \n ").unwrap(), b"");
        assert!(base64("***").is_err());
    }

    #[test]
    fn unknown_attributes_rejected() {
        let el = element("publish", &[("uri", "rsync://a/b"), ("extra", "1")]);
        let err = allowed_attributes(&el, &["uri", "hash"]).unwrap_err();
        assert!(err.to_string().contains("\"extra\""));
    }

    #[test]
    fn namespace_required() {
        let mut el = element("delta", &[]);
        assert!(require_namespace(&el).is_ok());
        el.namespace = None;
        assert!(require_namespace(&el).is_err());
    }

    #[test]
    fn uri_not_empty() {
        assert_eq!(uri(" rsync://a/b ").unwrap(), "rsync://a/b");
        assert!(uri("   ").is_err());
    }
}
