//! Configuration types for the conversion client.
//!
//! Connection defaults live in [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Account credentials live separately in
//! [`Credentials`] so a config can be shared between accounts and logged
//! without leaking the secret key.
//!
//! Everything here is fixed once the client is constructed. Each call copies
//! what it needs into its own request, so nothing in a config is ever
//! mutated by a conversion.

use crate::error::Html2PdfError;
use crate::progress::ProgressCallback;
use crate::transport::Transport;
use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

/// Default remote service host.
pub const DEFAULT_HOST: &str = "pdfcrowd.com";

/// Default remote service port (plain HTTP).
pub const DEFAULT_PORT: u16 = 80;

/// Default remote service port when `use_https` is set.
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Resource path for HTML-source conversion.
pub const DEFAULT_HTML_PATH: &str = "/api/pdf/convert/html/";

/// Resource path for URI-source conversion.
pub const DEFAULT_URI_PATH: &str = "/api/pdf/convert/uri/";

/// Environment variable holding the account identifier.
pub const USERNAME_ENV: &str = "HTML2PDF_USERNAME";

/// Environment variable holding the secret API key.
pub const API_KEY_ENV: &str = "HTML2PDF_API_KEY";

/// Account identifier and secret key, injected into every request body.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    api_key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    /// Load credentials from `HTML2PDF_USERNAME` and `HTML2PDF_API_KEY`.
    ///
    /// Fails with [`Html2PdfError::MissingCredentials`] naming the first
    /// variable that is unset or empty.
    pub fn from_env() -> Result<Self, Html2PdfError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Html2PdfError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(Html2PdfError::MissingCredentials(name))
        };
        Ok(Self {
            username: required(USERNAME_ENV)?,
            api_key: required(API_KEY_ENV)?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Connection defaults for the remote conversion service.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use html2pdf_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .host("localhost")
///     .port(8080)
///     .timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url(), "http://localhost:8080");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Remote service host name or IP address. Default: `pdfcrowd.com`.
    pub host: String,

    /// Remote service port. Default: 80, or 443 when built with `use_https`.
    pub port: u16,

    /// Use `https://` instead of `http://`. Default: false.
    pub use_https: bool,

    /// Path for HTML-source conversion. Default: `/api/pdf/convert/html/`.
    pub html_path: String,

    /// Path for URI-source conversion. Default: `/api/pdf/convert/uri/`.
    pub uri_path: String,

    /// Whole-request timeout. Default: None (wait indefinitely).
    pub timeout: Option<Duration>,

    /// Pre-constructed transport. Takes precedence over the default reqwest
    /// transport built from the fields above.
    pub transport: Option<Arc<dyn Transport>>,

    /// Optional per-exchange progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            use_https: false,
            html_path: DEFAULT_HTML_PATH.to_string(),
            uri_path: DEFAULT_URI_PATH.to_string(),
            timeout: None,
            transport: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_https", &self.use_https)
            .field("html_path", &self.html_path)
            .field("uri_path", &self.uri_path)
            .field("timeout", &self.timeout)
            .field("transport", &self.transport.as_ref().map(|_| "<dyn Transport>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
            port: None,
        }
    }

    /// `scheme://host:port`, without a trailing slash.
    ///
    /// IPv6 literals are bracketed (`http://[::1]:8080`).
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("{}://[{}]:{}", scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.port)
        }
    }

    /// Full URL for a resource path on the configured service.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
    // `None` until set explicitly; `build()` fills in the scheme default.
    port: Option<u16>,
}

impl ClientConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Explicit port. Without one, `build()` picks 80 or 443 from the scheme.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn use_https(mut self, v: bool) -> Self {
        self.config.use_https = v;
        self
    }

    pub fn html_path(mut self, path: impl Into<String>) -> Self {
        self.config.html_path = path.into();
        self
    }

    pub fn uri_path(mut self, path: impl Into<String>) -> Self {
        self.config.uri_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, Html2PdfError> {
        self.config.port = self.port.unwrap_or(if self.config.use_https {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_PORT
        });
        let c = &self.config;
        if c.host.trim().is_empty() {
            return Err(Html2PdfError::InvalidConfig("host must not be empty".into()));
        }
        if c.port == 0 {
            return Err(Html2PdfError::InvalidConfig("port must be ≥ 1".into()));
        }
        for (name, path) in [("html_path", &c.html_path), ("uri_path", &c.uri_path)] {
            if !path.starts_with('/') {
                return Err(Html2PdfError::InvalidConfig(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        if c.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Html2PdfError::InvalidConfig(
                "timeout must be non-zero; omit it to wait indefinitely".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_plain_http_port_80() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url(), "http://pdfcrowd.com:80");
        assert_eq!(
            c.endpoint(&c.html_path),
            "http://pdfcrowd.com:80/api/pdf/convert/html/"
        );
        assert!(c.timeout.is_none());
    }

    #[test]
    fn https_moves_default_port() {
        let c = ClientConfig::builder().use_https(true).build().unwrap();
        assert_eq!(c.base_url(), "https://pdfcrowd.com:443");

        let c = ClientConfig::builder()
            .port(8443)
            .use_https(true)
            .build()
            .unwrap();
        assert_eq!(c.port, 8443);
    }

    #[test]
    fn explicit_port_survives_https_in_either_order() {
        let before = ClientConfig::builder()
            .port(80)
            .use_https(true)
            .build()
            .unwrap();
        let after = ClientConfig::builder()
            .use_https(true)
            .port(80)
            .build()
            .unwrap();
        assert_eq!(before.port, 80);
        assert_eq!(after.port, 80);
        assert_eq!(before.base_url(), "https://pdfcrowd.com:80");

        let off_again = ClientConfig::builder()
            .use_https(true)
            .use_https(false)
            .build()
            .unwrap();
        assert_eq!(off_again.base_url(), "http://pdfcrowd.com:80");
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let c = ClientConfig::builder().host("::1").port(8080).build().unwrap();
        assert_eq!(c.base_url(), "http://[::1]:8080");
        assert_eq!(
            c.endpoint(&c.html_path),
            "http://[::1]:8080/api/pdf/convert/html/"
        );

        let v4 = ClientConfig::builder()
            .host("127.0.0.1")
            .port(8080)
            .build()
            .unwrap();
        assert_eq!(v4.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn build_rejects_bad_values() {
        assert!(ClientConfig::builder().host("  ").build().is_err());
        assert!(ClientConfig::builder().port(0).build().is_err());
        assert!(ClientConfig::builder().html_path("api/x").build().is_err());
        assert!(ClientConfig::builder()
            .timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn credentials_debug_redacts_key() {
        let creds = Credentials::new("alice", "s3cr3t");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("alice"));
        assert!(!dbg.contains("s3cr3t"));
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn credentials_lookup_requires_both_values() {
        let creds = Credentials::from_lookup(lookup_from(&[
            (USERNAME_ENV, "alice"),
            (API_KEY_ENV, "s3cr3t"),
        ]))
        .unwrap();
        assert_eq!(creds.username(), "alice");
        assert_eq!(creds.api_key(), "s3cr3t");

        let missing_key = Credentials::from_lookup(lookup_from(&[(USERNAME_ENV, "alice")]));
        assert!(matches!(
            missing_key,
            Err(Html2PdfError::MissingCredentials(API_KEY_ENV))
        ));

        let missing_both = Credentials::from_lookup(lookup_from(&[]));
        assert!(matches!(
            missing_both,
            Err(Html2PdfError::MissingCredentials(USERNAME_ENV))
        ));
    }

    #[test]
    fn credentials_lookup_treats_empty_as_missing() {
        let empty_user = Credentials::from_lookup(lookup_from(&[
            (USERNAME_ENV, ""),
            (API_KEY_ENV, "s3cr3t"),
        ]));
        assert!(matches!(
            empty_user,
            Err(Html2PdfError::MissingCredentials(USERNAME_ENV))
        ));

        let empty_key = Credentials::from_lookup(lookup_from(&[
            (USERNAME_ENV, "alice"),
            (API_KEY_ENV, ""),
        ]));
        assert!(matches!(
            empty_key,
            Err(Html2PdfError::MissingCredentials(API_KEY_ENV))
        ));
    }

    // The only test in the crate that touches the process environment.
    #[test]
    fn credentials_from_env_reads_process_environment() {
        let saved: Vec<_> = [USERNAME_ENV, API_KEY_ENV]
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();

        std::env::set_var(USERNAME_ENV, "env-user");
        std::env::remove_var(API_KEY_ENV);
        let missing = Credentials::from_env();

        std::env::set_var(API_KEY_ENV, "");
        let empty = Credentials::from_env();

        std::env::set_var(API_KEY_ENV, "env-key");
        let loaded = Credentials::from_env();

        for (name, value) in saved {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }

        assert!(matches!(
            missing,
            Err(Html2PdfError::MissingCredentials(API_KEY_ENV))
        ));
        assert!(matches!(
            empty,
            Err(Html2PdfError::MissingCredentials(API_KEY_ENV))
        ));
        let loaded = loaded.unwrap();
        assert_eq!(loaded.username(), "env-user");
        assert_eq!(loaded.api_key(), "env-key");
    }
}
