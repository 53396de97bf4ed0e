//! Result types handed back when a conversion task completes.

use serde::Serialize;

/// How a conversion ended, as observed by the relay.
///
/// Only [`Outcome::Delivered`] means the sink holds a PDF. Every other
/// variant means the sink received an error marker (or nothing, for
/// [`Outcome::SinkFailed`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The service answered with a success status; `bytes` PDF bytes were relayed.
    Delivered { bytes: u64 },

    /// The service answered with an error status (`>= 299`).
    ///
    /// `message` holds the start of the upstream response body, if any.
    Upstream { status: u16, message: String },

    /// The connection failed before or during the response.
    Transport { detail: String },

    /// The sink itself refused a write or failed to finalize.
    SinkFailed { detail: String },
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }

    /// Short human-readable summary for logs and CLI output.
    pub fn summary(&self) -> String {
        match self {
            Outcome::Delivered { bytes } => format!("PDF delivered ({bytes} bytes)"),
            Outcome::Upstream { status, message } if message.is_empty() => {
                format!("service returned HTTP {status}")
            }
            Outcome::Upstream { status, message } => {
                format!("service returned HTTP {status}: {message}")
            }
            Outcome::Transport { detail } => format!("transport failure: {detail}"),
            Outcome::SinkFailed { detail } => format!("output failure: {detail}"),
        }
    }
}

/// The finished conversion: its outcome plus the caller's sink, released.
#[derive(Debug)]
pub struct Completion<S> {
    pub outcome: Outcome,
    pub sink: S,
}

impl<S> Completion<S> {
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serialises_with_tag() {
        let json = serde_json::to_value(Outcome::Upstream {
            status: 404,
            message: "not found".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "upstream");
        assert_eq!(json["status"], 404);
    }

    #[test]
    fn summary_mentions_status() {
        let o = Outcome::Upstream {
            status: 502,
            message: String::new(),
        };
        assert_eq!(o.summary(), "service returned HTTP 502");
        assert!(!o.is_delivered());
        assert!(Outcome::Delivered { bytes: 3 }.is_delivered());
    }
}
