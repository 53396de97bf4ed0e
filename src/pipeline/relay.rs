//! Response relay: one exchange, streamed into the caller's sink.
//!
//! ## Finalization
//!
//! [`run`] is the only function that calls [`OutputSink::finish`], and it
//! does so exactly once, after [`relay`] returns, whatever the outcome was.
//! Every branch inside `relay` (success, upstream error status, transport
//! failure, sink failure) returns an [`Outcome`] instead of finishing the
//! sink itself.
//!
//! ## Ordering
//!
//! The status is inspected before any body chunk is read. PDF headers are
//! set once, before the first chunk, and only on the success branch. Chunks
//! are written in the order the transport yields them, one at a time, so the
//! only buffering is whatever the transport does internally.

use crate::output::{Completion, Outcome};
use crate::progress::{ConversionProgressCallback, ProgressCallback};
use crate::sink::{OutputSink, PDF_HEADERS, TRANSPORT_ERROR_MARKER, UPSTREAM_ERROR_MARKER};
use crate::transport::{BodyStream, HttpRequest, Transport};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Statuses strictly below this are treated as success.
pub const SUCCESS_STATUS_LIMIT: u16 = 299;

/// Upper bound on how much of an error response body is kept for diagnostics.
pub const ERROR_BODY_LIMIT: usize = 4096;

/// Drive one exchange to completion and release the sink.
pub async fn run<S: OutputSink>(
    transport: Arc<dyn Transport>,
    request: HttpRequest,
    mut sink: S,
    progress: Option<ProgressCallback>,
) -> Completion<S> {
    let target = request.url.clone();
    let outcome = relay(transport.as_ref(), request, &mut sink, progress.as_deref()).await;

    let outcome = match sink.finish().await {
        Ok(()) => outcome,
        Err(e) => {
            warn!("Failed to finalize output for {}: {}", target, e);
            match outcome {
                Outcome::Delivered { .. } => Outcome::SinkFailed {
                    detail: e.to_string(),
                },
                other => other,
            }
        }
    };

    info!("Conversion via {} finished: {}", target, outcome.summary());
    if let Some(cb) = &progress {
        cb.on_complete(&outcome);
    }

    Completion { outcome, sink }
}

/// Send the request and relay the response. Never finalizes the sink.
pub async fn relay<S: OutputSink>(
    transport: &dyn Transport,
    request: HttpRequest,
    sink: &mut S,
    progress: Option<&dyn ConversionProgressCallback>,
) -> Outcome {
    let target = request.url.clone();
    if let Some(cb) = progress {
        cb.on_request_sent(request.body.len());
    }

    let response = match transport.post(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Transport failure for {}: {}", target, e);
            let outcome = Outcome::Transport {
                detail: e.to_string(),
            };
            return write_marker(sink, TRANSPORT_ERROR_MARKER, outcome).await;
        }
    };

    let status = response.status;
    if let Some(cb) = progress {
        cb.on_response(status);
    }

    if status < SUCCESS_STATUS_LIMIT {
        debug!("HTTP {} from {}; relaying PDF body", status, target);
        relay_pdf(response.body, sink, progress).await
    } else {
        let message = read_error_body(response.body).await;
        warn!("Service at {} returned HTTP {}: {}", target, status, message);
        let outcome = Outcome::Upstream { status, message };
        write_marker(sink, UPSTREAM_ERROR_MARKER, outcome).await
    }
}

async fn relay_pdf<S: OutputSink>(
    mut body: BodyStream,
    sink: &mut S,
    progress: Option<&dyn ConversionProgressCallback>,
) -> Outcome {
    for (name, value) in PDF_HEADERS {
        sink.set_header(name, value);
    }

    let mut total: u64 = 0;
    let mut chunks: usize = 0;
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Response body interrupted after {} bytes: {}", total, e);
                let outcome = Outcome::Transport {
                    detail: e.to_string(),
                };
                return write_marker(sink, TRANSPORT_ERROR_MARKER, outcome).await;
            }
        };
        if chunk.is_empty() {
            continue;
        }
        if let Err(e) = sink.write_chunk(&chunk).await {
            warn!("Sink rejected chunk after {} bytes: {}", total, e);
            return Outcome::SinkFailed {
                detail: e.to_string(),
            };
        }
        total += chunk.len() as u64;
        chunks += 1;
        if let Some(cb) = progress {
            cb.on_chunk(total);
        }
    }

    debug!("Relayed {} bytes in {} chunks", total, chunks);
    Outcome::Delivered { bytes: total }
}

/// Write a short error marker; a failing sink does not mask the original outcome.
async fn write_marker<S: OutputSink>(sink: &mut S, marker: &[u8], outcome: Outcome) -> Outcome {
    if let Err(e) = sink.write_chunk(marker).await {
        warn!("Sink rejected error marker: {}", e);
    }
    outcome
}

/// Collect the start of an error body for diagnostics, ignoring read failures.
async fn read_error_body(mut body: BodyStream) -> String {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < ERROR_BODY_LIMIT {
        match body.next().await {
            Some(Ok(chunk)) => {
                let room = ERROR_BODY_LIMIT - buf.len();
                buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Some(Err(e)) => {
                debug!("Ignoring error while reading error body: {}", e);
                break;
            }
            None => break,
        }
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::sink::MemorySink;
    use crate::transport::UpstreamResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with a fixed status and chunk list, or a connection error.
    struct ScriptedTransport {
        reply: Result<(u16, Vec<Result<Bytes, TransportError>>), TransportError>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn status(status: u16, chunks: &[&'static [u8]]) -> Arc<Self> {
            let chunks = chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
            Arc::new(Self {
                reply: Ok((status, chunks)),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: TransportError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(&self, _request: HttpRequest) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (status, chunks) = self.reply.clone()?;
            Ok(UpstreamResponse::new(
                status,
                Box::pin(futures::stream::iter(chunks)),
            ))
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            url: "http://test.invalid:80/api/pdf/convert/html/".into(),
            headers: vec![],
            body: "key=k&src=x&username=u".into(),
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl ConversionProgressCallback for Events {
        fn on_request_sent(&self, body_len: usize) {
            self.0.lock().unwrap().push(format!("sent:{body_len}"));
        }
        fn on_response(&self, status: u16) {
            self.0.lock().unwrap().push(format!("status:{status}"));
        }
        fn on_chunk(&self, total_bytes: u64) {
            self.0.lock().unwrap().push(format!("chunk:{total_bytes}"));
        }
        fn on_complete(&self, outcome: &Outcome) {
            self.0.lock().unwrap().push(format!("done:{}", outcome.is_delivered()));
        }
    }

    #[tokio::test]
    async fn success_relays_exact_bytes_and_finishes_once() {
        let transport = ScriptedTransport::status(200, &[b"%PDF-1.4\n", b"body", b"\n%%EOF"]);
        let done = run(transport.clone(), request(), MemorySink::new(), None).await;

        assert_eq!(done.outcome, Outcome::Delivered { bytes: 19 });
        assert_eq!(done.sink.bytes(), b"%PDF-1.4\nbody\n%%EOF");
        assert_eq!(done.sink.finish_count(), 1);
        assert_eq!(done.sink.header("Content-Type"), Some("application/pdf"));
        assert_eq!(done.sink.header("Cache-Control"), Some("no-cache"));
        assert_eq!(done.sink.header("Accept-Ranges"), Some("none"));
        assert_eq!(
            done.sink.header("Content-Disposition"),
            Some("attachment; filename=\"generated.pdf\"")
        );
        assert_eq!(done.sink.headers().len(), 4);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_298_is_success_and_299_is_not() {
        let ok = run(
            ScriptedTransport::status(298, &[b"pdf"]),
            request(),
            MemorySink::new(),
            None,
        )
        .await;
        assert!(ok.outcome.is_delivered());

        let err = run(
            ScriptedTransport::status(299, &[b"pdf"]),
            request(),
            MemorySink::new(),
            None,
        )
        .await;
        assert!(matches!(err.outcome, Outcome::Upstream { status: 299, .. }));
    }

    #[tokio::test]
    async fn not_found_writes_error_marker_without_pdf_headers() {
        let transport = ScriptedTransport::status(404, &[b"Not ", b"Found"]);
        let done = run(transport, request(), MemorySink::new(), None).await;

        assert_eq!(
            done.outcome,
            Outcome::Upstream {
                status: 404,
                message: "Not Found".into()
            }
        );
        assert_eq!(done.sink.bytes(), UPSTREAM_ERROR_MARKER);
        assert!(!done.sink.bytes().starts_with(b"%PDF"));
        assert!(done.sink.headers().is_empty());
        assert_eq!(done.sink.finish_count(), 1);
    }

    #[tokio::test]
    async fn connection_error_writes_fatal_marker() {
        let transport = ScriptedTransport::failing(TransportError::Connect {
            target: "http://test.invalid:80/".into(),
            detail: "connection refused".into(),
        });
        let done = run(transport, request(), MemorySink::new(), None).await;

        assert!(matches!(done.outcome, Outcome::Transport { .. }));
        assert_eq!(done.sink.bytes(), TRANSPORT_ERROR_MARKER);
        assert!(done.sink.headers().is_empty());
        assert_eq!(done.sink.finish_count(), 1);
    }

    #[tokio::test]
    async fn body_interruption_writes_fatal_marker_once_headers_are_set() {
        let transport = Arc::new(ScriptedTransport {
            reply: Ok((
                200,
                vec![
                    Ok(Bytes::from_static(b"%PDF")),
                    Err(TransportError::Body("connection reset".into())),
                    Ok(Bytes::from_static(b"never")),
                ],
            )),
            calls: AtomicUsize::new(0),
        });
        let done = run(transport, request(), MemorySink::new(), None).await;

        assert!(matches!(done.outcome, Outcome::Transport { .. }));
        assert_eq!(done.sink.bytes(), b"%PDFfatal");
        assert_eq!(done.sink.headers().len(), 4, "headers set exactly once");
        assert_eq!(done.sink.finish_count(), 1);
    }

    #[tokio::test]
    async fn error_body_is_truncated() {
        static BIG: [u8; 10_000] = [b'x'; 10_000];
        let transport = ScriptedTransport::status(500, &[&BIG]);
        let done = run(transport, request(), MemorySink::new(), None).await;
        match done.outcome {
            Outcome::Upstream { message, .. } => assert_eq!(message.len(), ERROR_BODY_LIMIT),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    /// Accepts `limit` writes, then fails; counts finishes.
    struct FlakySink {
        limit: usize,
        writes: usize,
        finishes: usize,
    }

    #[async_trait]
    impl OutputSink for FlakySink {
        async fn write_chunk(&mut self, _chunk: &[u8]) -> io::Result<()> {
            if self.writes == self.limit {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.writes += 1;
            Ok(())
        }

        async fn finish(&mut self) -> io::Result<()> {
            self.finishes += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn sink_failure_stops_relay_and_still_finishes_once() {
        let transport = ScriptedTransport::status(200, &[b"a", b"b", b"c"]);
        let sink = FlakySink {
            limit: 1,
            writes: 0,
            finishes: 0,
        };
        let done = run(transport, request(), sink, None).await;

        assert!(matches!(done.outcome, Outcome::SinkFailed { .. }));
        assert_eq!(done.sink.writes, 1);
        assert_eq!(done.sink.finishes, 1);
    }

    #[tokio::test]
    async fn progress_events_arrive_in_order() {
        let events = Arc::new(Events::default());
        let transport = ScriptedTransport::status(200, &[b"12", b"345"]);
        let cb: ProgressCallback = events.clone();
        run(transport, request(), MemorySink::new(), Some(cb)).await;

        let seen = events.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec!["sent:22", "status:200", "chunk:2", "chunk:5", "done:true"]
        );
    }
}
