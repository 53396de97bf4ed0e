//! Pipeline stages for one HTML-to-PDF exchange.
//!
//! Each submodule implements exactly one step, so each can be tested
//! without a network connection.
//!
//! ## Data Flow
//!
//! ```text
//! source + options ──▶ request ──▶ transport ──▶ relay ──▶ sink
//!                      (form body)  (HTTP POST)   (status/chunks)
//! ```
//!
//! 1. [`request`]: copy the caller's options, inject `src` and credentials,
//!    form-encode the body and compute its headers
//! 2. [`relay`]  : send via [`crate::transport::Transport`], inspect the
//!    status, stream chunks (or an error marker) into the sink, and
//!    finalize the sink on a single path

pub mod relay;
pub mod request;
