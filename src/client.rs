//! The conversion client and its entry points.
//!
//! [`Html2PdfClient::convert`] validates synchronously, then hands the
//! exchange to a tokio task and returns a [`ConversionHandle`] at once.
//! Everything that happens after the request leaves (status, chunks,
//! failures) is reported through the sink and the final [`Outcome`].

use crate::config::{ClientConfig, Credentials};
use crate::error::Html2PdfError;
use crate::options::ConversionOptions;
use crate::output::{Completion, Outcome};
use crate::pipeline::relay;
use crate::pipeline::request::{is_url, ConversionRequest, SourceKind};
use crate::sink::{FileSink, MemorySink, OutputSink};
use crate::transport::{ReqwestTransport, Transport};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Client for the remote HTML-to-PDF service.
///
/// Cheap to clone; clones share the same credentials, config and
/// connection pool. All shared state is read-only, so concurrent
/// conversions on one client never observe each other.
///
/// # Example
/// ```rust,no_run
/// use html2pdf_client::{Html2PdfClient, ConversionOptions, MemorySink};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Html2PdfClient::new("username", "api-key");
/// let options = ConversionOptions::new().with("width", "8.5in");
///
/// let done = client
///     .convert("<h1>Hello</h1>", MemorySink::new(), Some(&options))?
///     .await?;
/// if done.outcome.is_delivered() {
///     std::fs::write("hello.pdf", done.sink.bytes())?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Html2PdfClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    credentials: Credentials,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Html2PdfClient {
    /// Create a client for the default service endpoint. No network I/O happens here.
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::from_parts(
            Credentials::new(username, api_key),
            ClientConfig::default(),
            Arc::new(ReqwestTransport::default()),
        )
    }

    /// Create a client with explicit connection settings.
    ///
    /// `config.transport`, when set, is used as-is and `config.timeout` is
    /// not applied to it.
    pub fn with_config(
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Self, Html2PdfError> {
        let transport: Arc<dyn Transport> = match config.transport {
            Some(ref t) => Arc::clone(t),
            None => Arc::new(ReqwestTransport::new(config.timeout)?),
        };
        Ok(Self::from_parts(credentials, config, transport))
    }

    /// Create a default client from `HTML2PDF_USERNAME` / `HTML2PDF_API_KEY`.
    pub fn from_env() -> Result<Self, Html2PdfError> {
        Self::with_config(Credentials::from_env()?, ClientConfig::default())
    }

    fn from_parts(
        credentials: Credentials,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                credentials,
                config,
                transport,
            }),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Start building a call with per-call overrides.
    pub fn call<'a>(&'a self, source: &'a str) -> ConvertCall<'a> {
        ConvertCall {
            client: self,
            source,
            kind: SourceKind::Html,
            path: None,
            options: None,
        }
    }

    /// Convert an HTML string, streaming the result into `sink`.
    ///
    /// # Errors
    /// Returns `Err` only before any I/O starts:
    /// - [`Html2PdfError::MissingSource`] when `html` is empty
    /// - [`Html2PdfError::NoRuntime`] when called outside a tokio runtime
    ///
    /// Upstream error statuses and connection failures are reported via the
    /// sink and [`Completion::outcome`].
    pub fn convert<S: OutputSink>(
        &self,
        html: impl AsRef<str>,
        sink: S,
        options: Option<&ConversionOptions>,
    ) -> Result<ConversionHandle<S>, Html2PdfError> {
        let mut call = self.call(html.as_ref());
        call.options = options;
        call.spawn(sink)
    }

    /// Convert the page at `uri`; the service fetches it itself.
    pub fn convert_uri<S: OutputSink>(
        &self,
        uri: impl AsRef<str>,
        sink: S,
        options: Option<&ConversionOptions>,
    ) -> Result<ConversionHandle<S>, Html2PdfError> {
        let mut call = self.call(uri.as_ref()).uri();
        call.options = options;
        call.spawn(sink)
    }

    /// Read a local HTML file and convert its contents.
    pub async fn convert_file<S: OutputSink>(
        &self,
        path: impl AsRef<Path>,
        sink: S,
        options: Option<&ConversionOptions>,
    ) -> Result<ConversionHandle<S>, Html2PdfError> {
        let html = read_html_file(path.as_ref()).await?;
        self.convert(html, sink, options)
    }

    /// Convert an HTML string into a PDF file at `output_path` and wait for it.
    ///
    /// The file is written atomically (`.part` file + rename). On a failed
    /// conversion the file holds the error marker, as any sink would.
    pub async fn convert_to_file(
        &self,
        html: impl AsRef<str>,
        output_path: impl AsRef<Path>,
        options: Option<&ConversionOptions>,
    ) -> Result<Outcome, Html2PdfError> {
        let html = html.as_ref();
        if html.is_empty() {
            return Err(Html2PdfError::MissingSource);
        }
        let sink = FileSink::create(output_path).await?;
        let done = self.convert(html, sink, options)?.await?;
        Ok(done.outcome)
    }

    /// Blocking wrapper around [`Self::convert`] into memory.
    ///
    /// Creates a temporary tokio runtime internally, so it must not be
    /// called from within an async context.
    pub fn convert_sync(
        &self,
        html: impl AsRef<str>,
        options: Option<&ConversionOptions>,
    ) -> Result<Completion<MemorySink>, Html2PdfError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Html2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(async { self.convert(html, MemorySink::new(), options)?.await })
    }
}

/// A single conversion being configured. Created by [`Html2PdfClient::call`].
#[derive(Debug)]
pub struct ConvertCall<'a> {
    client: &'a Html2PdfClient,
    source: &'a str,
    kind: SourceKind,
    path: Option<&'a str>,
    options: Option<&'a ConversionOptions>,
}

impl<'a> ConvertCall<'a> {
    /// Treat the source as a URI and post to the URI endpoint.
    pub fn uri(mut self) -> Self {
        self.kind = SourceKind::Uri;
        self
    }

    pub fn kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Override the resource path for this call only.
    pub fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn options(mut self, options: &'a ConversionOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Validate, marshal and start the exchange.
    pub fn spawn<S: OutputSink>(self, sink: S) -> Result<ConversionHandle<S>, Html2PdfError> {
        let inner = &self.client.inner;
        let request = ConversionRequest::new(self.source, self.options, &inner.credentials)?;

        if self.kind == SourceKind::Uri && !is_url(self.source) {
            return Err(Html2PdfError::InvalidSource {
                source_str: self.source.to_string(),
                reason: "expected an http:// or https:// URL".into(),
            });
        }

        let path = self.path.unwrap_or(match self.kind {
            SourceKind::Html => inner.config.html_path.as_str(),
            SourceKind::Uri => inner.config.uri_path.as_str(),
        });
        if !path.starts_with('/') {
            return Err(Html2PdfError::InvalidConfig(format!(
                "path must start with '/', got {path:?}"
            )));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Html2PdfError::NoRuntime)?;

        let http = request.into_http(inner.config.endpoint(path));
        info!(
            "Converting {:?} source ({} bytes) via {}",
            self.kind,
            self.source.len(),
            http.url
        );
        debug!("Request body is {} bytes", http.body.len());

        let task = runtime.spawn(relay::run(
            Arc::clone(&inner.transport),
            http,
            sink,
            inner.config.progress_callback.clone(),
        ));
        Ok(ConversionHandle { task })
    }
}

/// A running conversion. Await it (or call [`Self::wait`]) for the [`Completion`].
///
/// Dropping the handle does not stop the conversion; use [`Self::abort`].
#[derive(Debug)]
pub struct ConversionHandle<S> {
    task: JoinHandle<Completion<S>>,
}

impl<S> ConversionHandle<S> {
    pub async fn wait(self) -> Result<Completion<S>, Html2PdfError> {
        self.await
    }

    /// Cancel the conversion. The sink is dropped without being finalized.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<S> Future for ConversionHandle<S> {
    type Output = Result<Completion<S>, Html2PdfError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| {
            joined.map_err(|e| {
                if e.is_cancelled() {
                    Html2PdfError::Cancelled
                } else {
                    Html2PdfError::Internal(format!("conversion task panicked: {e}"))
                }
            })
        })
    }
}

async fn read_html_file(path: &Path) -> Result<String, Html2PdfError> {
    match tokio::fs::read_to_string(path).await {
        Ok(html) => {
            debug!("Read {} bytes of HTML from {}", html.len(), path.display());
            Ok(html)
        }
        Err(e) => Err(match e.kind() {
            std::io::ErrorKind::NotFound => Html2PdfError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Html2PdfError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Html2PdfError::SourceReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        }),
    }
}
