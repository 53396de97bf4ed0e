//! Error types for the html2pdf-client library.
//!
//! Two error types reflect two distinct failure phases:
//!
//! * [`Html2PdfError`]: **Pre-flight**: the call cannot start at all (empty
//!   source, unreadable source file, bad configuration). Returned
//!   synchronously as `Err(Html2PdfError)` before any network I/O.
//!
//! * [`TransportError`]: **In-flight**: the connection itself failed. These
//!   never escape a `convert*` call as `Err`; the relay turns them into the
//!   `fatal` sink marker and an [`crate::Outcome::Transport`].
//!
//! Upstream rejections (HTTP status `>= 299`) are not errors at this level
//! either. The result has already been handed to a background task by the
//! time the status is known, so it is reported through the sink.

use std::path::PathBuf;
use thiserror::Error;

/// All synchronous errors returned by the html2pdf-client library.
#[derive(Debug, Error)]
pub enum Html2PdfError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// The HTML source (or URI) was empty.
    #[error("Source content is empty; nothing to convert")]
    MissingSource,

    /// The source was not usable for the chosen kind (e.g. a URI without a scheme).
    #[error("Invalid source '{source_str}': {reason}")]
    InvalidSource { source_str: String, reason: String },

    /// The local HTML file was not found.
    #[error("HTML file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The process cannot read the local HTML file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The local HTML file exists but could not be read as UTF-8 text.
    #[error("Failed to read HTML file '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Credentials were not supplied and could not be found in the environment.
    #[error("Missing credentials: {0} is not set.\nExport HTML2PDF_USERNAME and HTML2PDF_API_KEY.")]
    MissingCredentials(&'static str),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `convert` was called outside of a tokio runtime.
    #[error("No tokio runtime available; call convert from within an async context")]
    NoRuntime,

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output file for a file-backed sink.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Task errors ───────────────────────────────────────────────────────
    /// The conversion task was aborted before it completed.
    #[error("Conversion was cancelled")]
    Cancelled,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A connection-level failure reported by a [`crate::transport::Transport`].
///
/// Distinct from an upstream HTTP error status: a `TransportError` means no
/// (complete) response was received at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// DNS resolution failed, or the connection was refused.
    #[error("Connection to {target} failed: {detail}")]
    Connect { target: String, detail: String },

    /// The configured timeout elapsed.
    #[error("Request to {target} timed out")]
    Timeout { target: String },

    /// The response body stream broke off mid-transfer.
    #[error("Response body interrupted: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let target = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if e.is_timeout() {
            TransportError::Timeout { target }
        } else if e.is_connect() {
            TransportError::Connect {
                target,
                detail: e.to_string(),
            }
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_display() {
        let msg = Html2PdfError::MissingSource.to_string();
        assert!(msg.contains("empty"), "got: {msg}");
    }

    #[test]
    fn missing_credentials_names_variable() {
        let e = Html2PdfError::MissingCredentials("HTML2PDF_API_KEY");
        assert!(e.to_string().contains("HTML2PDF_API_KEY"));
    }

    #[test]
    fn connect_error_display() {
        let e = TransportError::Connect {
            target: "http://localhost:1/".into(),
            detail: "connection refused".into(),
        };
        assert!(e.to_string().contains("localhost:1"));
        assert!(e.to_string().contains("refused"));
    }

    #[test]
    fn timeout_display() {
        let e = TransportError::Timeout {
            target: "http://pdfcrowd.com/".into(),
        };
        assert!(e.to_string().contains("timed out"));
    }
}
