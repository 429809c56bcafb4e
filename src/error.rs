//! Error types for RRDP operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::hash::ContentHash;

/// Errors that can occur while parsing, reconciling or fetching RRDP data.
#[derive(Error, Debug)]
pub enum RrdpError {
    /// I/O error during read/write operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document does not conform to the RRDP schema (or is not well-formed XML).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Expected a notification document, got another root element.
    #[error("Malformed document: expected notification, found <{root}>")]
    MalformedDocument {
        /// Local name of the root element that was found.
        root: String,
    },

    /// Expected a snapshot or delta document, got another root element.
    #[error("Unexpected document: expected snapshot or delta, found <{root}>")]
    UnexpectedDocument {
        /// Local name of the root element that was found.
        root: String,
    },

    /// A URI resolved to a path outside of the output root.
    #[error("Path escape: {uri} resolves outside of {}", root.display())]
    PathEscape {
        /// Offending object URI.
        uri: String,
        /// Output root the object had to stay within.
        root: PathBuf,
    },

    /// Content hash differs from the declared hash.
    #[error("Hash mismatch for {uri}: expected {expected}, got {actual}")]
    HashMismatch {
        /// URI of the artifact or object.
        uri: String,
        /// Declared hash.
        expected: ContentHash,
        /// Hash of the received content.
        actual: ContentHash,
    },

    /// Server answered with a non-2xx status.
    #[error("HTTP {status} for {url}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The HTTP transport failed before a status was received.
    #[error("Transport error for {url}: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Transport failure description.
        message: String,
    },

    /// A URI filter pattern is not a valid regular expression.
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// A URL could not be parsed.
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// Delta belongs to another session than the local mirror.
    #[error("Session mismatch: mirror is at session {expected}, document has {found}")]
    SessionMismatch {
        /// Session recorded for the mirror.
        expected: String,
        /// Session of the document.
        found: String,
    },

    /// Delta does not directly follow the mirror's serial.
    #[error("Serial gap: expected serial {expected}, found {found}")]
    SerialGap {
        /// Serial the next delta must have.
        expected: u64,
        /// Serial of the document.
        found: u64,
    },

    /// The persisted repository state could not be decoded or encoded.
    #[error("State file error: {0}")]
    State(#[from] bincode::Error),
}

impl RrdpError {
    /// Shorthand for a [`RrdpError::Validation`] error.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for RRDP operations.
pub type Result<T> = std::result::Result<T, RrdpError>;
