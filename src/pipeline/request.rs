//! Request marshalling: options + source + credentials → form-encoded POST.
//!
//! Every call builds its own [`ConversionRequest`] from an owned copy of the
//! caller's options, so neither the caller's map nor the client's defaults
//! are ever mutated or shared between concurrent calls.

use crate::config::Credentials;
use crate::error::Html2PdfError;
use crate::options::ConversionOptions;
use crate::transport::HttpRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Body field carrying the HTML (or URI) to convert.
pub const SOURCE_FIELD: &str = "src";

/// Body field carrying the account identifier.
pub const USERNAME_FIELD: &str = "username";

/// Body field carrying the secret API key.
pub const KEY_FIELD: &str = "key";

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// What the `src` field holds, which decides the endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Raw HTML markup. (default)
    #[default]
    Html,
    /// An `http://` or `https://` URL the service fetches itself.
    Uri,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// The ephemeral per-call request state.
///
/// Injected fields (`src`, `username`, `key`) overwrite caller options of the
/// same name.
#[derive(Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    fields: BTreeMap<String, String>,
}

impl ConversionRequest {
    /// Build the request, failing fast on an empty source.
    pub fn new(
        source: &str,
        options: Option<&ConversionOptions>,
        credentials: &Credentials,
    ) -> Result<Self, Html2PdfError> {
        if source.is_empty() {
            return Err(Html2PdfError::MissingSource);
        }

        let mut fields: BTreeMap<String, String> = options
            .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        fields.insert(SOURCE_FIELD.to_string(), source.to_string());
        fields.insert(USERNAME_FIELD.to_string(), credentials.username().to_string());
        fields.insert(KEY_FIELD.to_string(), credentials.api_key().to_string());

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Number of body fields, including the three injected ones.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize every field as `application/x-www-form-urlencoded`, in sorted key order.
    pub fn encode_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    /// Encode the body and attach `Content-Type` and `Content-Length`.
    pub fn into_http(self, url: String) -> HttpRequest {
        let body = self.encode_body();
        let headers = vec![
            ("Content-Type", FORM_CONTENT_TYPE.to_string()),
            ("Content-Length", body.len().to_string()),
        ];
        HttpRequest { url, headers, body }
    }
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        f.debug_struct("ConversionRequest")
            .field("fields", &fields)
            .field("src_len", &self.get(SOURCE_FIELD).map_or(0, str::len))
            .finish()
    }
}
