//! # html2pdf-client
//!
//! Client binding for a remote HTML-to-PDF conversion service.
//!
//! The library takes HTML (or a URL, or a local HTML file) plus opaque
//! rendering options, sends them as one form-encoded `POST`, and streams the
//! resulting PDF into a sink you own: a memory buffer, a file, any async
//! writer, or a channel.
//!
//! ## Exchange Overview
//!
//! ```text
//! convert(html, sink, options)
//!  │
//!  ├─ 1. Validate  empty source → Err(MissingSource), no I/O
//!  ├─ 2. Marshal   copy options + src/username/key → form body
//!  ├─ 3. Send      one POST /api/pdf/convert/html/ (spawned task)
//!  ├─ 4. Relay     status < 299 → PDF headers + chunks
//!  │               status ≥ 299 → "error" marker
//!  │               connection failure → "fatal" marker
//!  └─ 5. Finish    sink finalized exactly once, returned in Completion
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use html2pdf_client::{file_sink, Html2PdfClient, ConversionOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from HTML2PDF_USERNAME / HTML2PDF_API_KEY
//!     let client = Html2PdfClient::from_env()?;
//!     let options = ConversionOptions::new()
//!         .with("width", "210mm")
//!         .with("height", "297mm");
//!
//!     let sink = file_sink("hello.pdf").await?;
//!     let done = client.convert("<h1>Hello</h1>", sink, Some(&options))?.await?;
//!     eprintln!("{}", done.outcome.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `html2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! html2pdf-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sink;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ConversionHandle, ConvertCall, Html2PdfClient};
pub use config::{ClientConfig, ClientConfigBuilder, Credentials};
pub use error::{Html2PdfError, TransportError};
pub use options::ConversionOptions;
pub use output::{Completion, Outcome};
pub use pipeline::request::SourceKind;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use sink::{
    file_sink, ChannelSink, FileSink, MemorySink, OutputSink, SinkEvent, SinkEventStream,
    WriterSink,
};
pub use transport::{HttpRequest, ReqwestTransport, Transport, UpstreamResponse};
