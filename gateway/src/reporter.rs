//! Error reporting sink
//!
//! Handlers and the collector report failures through [`ErrorReporter`]
//! instead of logging directly, so tests can assert on failure paths.

use air_quality_client::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamRejected,
    UpstreamUnreachable,
    UpstreamMalformed,
    NotFound,
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn from_upstream(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Rejected { .. } => Self::UpstreamRejected,
            UpstreamError::Unreachable { .. } => Self::UpstreamUnreachable,
            UpstreamError::Malformed { .. } => Self::UpstreamMalformed,
        }
    }
}

pub trait ErrorReporter: Send + Sync {
    fn report(&self, kind: ErrorKind, context: &str);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, kind: ErrorKind, context: &str) {
        match kind {
            ErrorKind::UpstreamRejected | ErrorKind::NotFound => {
                tracing::warn!(kind = ?kind, "{}", context)
            }
            _ => tracing::error!(kind = ?kind, "{}", context),
        }
    }
}

#[cfg(test)]
pub use recording::RecordingReporter;
