//! Progress-callback trait for per-exchange conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to observe a
//! conversion as it runs: request sent, status received, bytes relayed,
//! and the final [`Outcome`].
//!
//! The trait is `Send + Sync` because every conversion runs on its own
//! tokio task and one client may drive several conversions at once.
//!
//! # Example
//!
//! ```rust
//! use html2pdf_client::{ClientConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
//!
//! struct ByteCounter {
//!     received: AtomicU64,
//! }
//!
//! impl ConversionProgressCallback for ByteCounter {
//!     fn on_chunk(&self, total_bytes: u64) {
//!         self.received.store(total_bytes, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(ByteCounter { received: AtomicU64::new(0) });
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Outcome;
use std::sync::Arc;

/// Called by the relay as a conversion progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls for one conversion arrive in order; calls
/// for different conversions on the same client may interleave.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called just before the request is handed to the transport.
    ///
    /// # Arguments
    /// * `body_len`: byte length of the form-encoded body
    fn on_request_sent(&self, body_len: usize) {
        let _ = body_len;
    }

    /// Called once the upstream status line is known.
    fn on_response(&self, status: u16) {
        let _ = status;
    }

    /// Called after each PDF chunk is written to the sink.
    ///
    /// # Arguments
    /// * `total_bytes`: bytes relayed so far, including this chunk
    fn on_chunk(&self, total_bytes: u64) {
        let _ = total_bytes;
    }

    /// Called once, after the sink has been finalized.
    fn on_complete(&self, outcome: &Outcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
