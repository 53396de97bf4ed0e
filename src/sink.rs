//! Output sinks: where the converted PDF (or an error marker) ends up.
//!
//! A sink is owned by the caller. The client moves it into the conversion
//! task, pushes header hints and byte chunks into it, finalizes it exactly
//! once, and hands it back in [`crate::Completion`].
//!
//! | Sink | Destination |
//! |------|-------------|
//! | [`MemorySink`]  | in-memory buffer (tests, small documents) |
//! | [`FileSink`]    | local file, written atomically via a `.part` file |
//! | [`WriterSink`]  | any `AsyncWrite` (stdout, a socket, an HTTP response body) |
//! | [`ChannelSink`] | a [`Stream`] of [`SinkEvent`]s for another task to consume |
//!
//! [`Stream`]: tokio_stream::Stream

use crate::error::Html2PdfError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Headers set on a sink before a successful PDF body is relayed.
pub const PDF_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/pdf"),
    ("Cache-Control", "no-cache"),
    ("Accept-Ranges", "none"),
    ("Content-Disposition", "attachment; filename=\"generated.pdf\""),
];

/// Written instead of PDF bytes when the service answers with an error status.
pub const UPSTREAM_ERROR_MARKER: &[u8] = b"error";

/// Written instead of PDF bytes when the connection itself fails.
pub const TRANSPORT_ERROR_MARKER: &[u8] = b"fatal";

/// A push-based destination for conversion output.
///
/// `set_header` carries download metadata (content type, filename) for
/// sinks that relay to an HTTP client; sinks without a header concept keep
/// the default no-op.
#[async_trait]
pub trait OutputSink: Send + 'static {
    fn set_header(&mut self, name: &str, value: &str) {
        let _ = (name, value);
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Flush and close. Called exactly once per conversion.
    async fn finish(&mut self) -> io::Result<()>;
}

#[async_trait]
impl OutputSink for Box<dyn OutputSink> {
    fn set_header(&mut self, name: &str, value: &str) {
        (**self).set_header(name, value)
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (**self).write_chunk(chunk).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        (**self).finish().await
    }
}

fn already_finished() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "sink already finished")
}

// ── MemorySink ───────────────────────────────────────────────────────────

/// Collects everything in memory, including headers and finalization count.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
    headers: Vec<(String, String)>,
    finish_count: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Headers in the order they were set.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn finish_count(&self) -> usize {
        self.finish_count
    }

    pub fn is_finished(&self) -> bool {
        self.finish_count > 0
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.is_finished() {
            return Err(already_finished());
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.finish_count += 1;
        Ok(())
    }
}

// ── FileSink ─────────────────────────────────────────────────────────────

/// Writes to `<path>.part` and renames it onto `path` when finished, so a
/// reader never observes a half-written file at `path`.
///
/// If the sink is dropped without being finished (e.g. the conversion was
/// aborted) the `.part` file is removed.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    part_path: PathBuf,
    file: Option<tokio::fs::File>,
    written: u64,
}

impl FileSink {
    /// Create the parent directory if needed and open `<path>.part` for writing.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, Html2PdfError> {
        let path = path.as_ref().to_path_buf();
        let write_err = |source: io::Error| Html2PdfError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        let file_name = path.file_name().ok_or_else(|| {
            write_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "output path has no file name",
            ))
        })?;
        let mut part_name = file_name.to_os_string();
        part_name.push(".part");
        let part_path = path.with_file_name(part_name);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let file = tokio::fs::File::create(&part_path)
            .await
            .map_err(write_err)?;

        debug!("Opened output file: {}", part_path.display());
        Ok(Self {
            path,
            part_path,
            file: Some(file),
            written: 0,
        })
    }

    /// Final destination of the output.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Open a file-backed sink at `path`. Shorthand for [`FileSink::create`].
pub async fn file_sink(path: impl AsRef<Path>) -> Result<FileSink, Html2PdfError> {
    FileSink::create(path).await
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(already_finished)?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        let file = self.file.take().ok_or_else(already_finished)?;
        if let Err(e) = commit_part_file(file, &self.part_path, &self.path).await {
            let _ = tokio::fs::remove_file(&self.part_path).await;
            return Err(e);
        }
        debug!("Wrote {} bytes to {}", self.written, self.path.display());
        Ok(())
    }
}

async fn commit_part_file(mut file: tokio::fs::File, part: &Path, dest: &Path) -> io::Result<()> {
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(part, dest).await
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            let _ = std::fs::remove_file(&self.part_path);
        }
    }
}

// ── WriterSink ───────────────────────────────────────────────────────────

/// Forwards bytes to any async writer; flushes and shuts it down on finish.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    finished: bool,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            finished: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> OutputSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.finished {
            return Err(already_finished());
        }
        self.writer.write_all(chunk).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Err(already_finished());
        }
        self.finished = true;
        self.writer.flush().await?;
        self.writer.shutdown().await
    }
}

// ── ChannelSink ──────────────────────────────────────────────────────────

/// One item observed by the consumer of a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Header { name: String, value: String },
    Data(Bytes),
}

/// The consuming half of a [`ChannelSink`]; ends when the sink is finished.
pub type SinkEventStream = ReceiverStream<SinkEvent>;

/// Forwards output to another task through a bounded channel.
///
/// Headers are queued until the next write or finish, because
/// [`OutputSink::set_header`] cannot wait for channel capacity.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<SinkEvent>>,
    pending_headers: Vec<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink and the stream that receives its events.
    ///
    /// `capacity` bounds how many events may be buffered before the relay
    /// waits for the consumer (minimum 1).
    pub fn new(capacity: usize) -> (Self, SinkEventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            tx: Some(tx),
            pending_headers: Vec::new(),
        };
        (sink, ReceiverStream::new(rx))
    }

    async fn flush_headers(&mut self) -> io::Result<()> {
        let tx = self.tx.as_ref().ok_or_else(already_finished)?;
        for event in self.pending_headers.drain(..) {
            tx.send(event).await.map_err(|_| receiver_gone())?;
        }
        Ok(())
    }
}

fn receiver_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "sink event stream was dropped")
}

#[async_trait]
impl OutputSink for ChannelSink {
    fn set_header(&mut self, name: &str, value: &str) {
        self.pending_headers.push(SinkEvent::Header {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.flush_headers().await?;
        let tx = self.tx.as_ref().ok_or_else(already_finished)?;
        tx.send(SinkEvent::Data(Bytes::copy_from_slice(chunk)))
            .await
            .map_err(|_| receiver_gone())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.flush_headers().await?;
        // Dropping the sender ends the consumer's stream.
        self.tx.take().map(drop).ok_or_else(already_finished)
    }
}
