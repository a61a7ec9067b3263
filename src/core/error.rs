//! Session Errors
//!
//! Failure taxonomy for the public session operations. Plumbing code (configuration loading,
//! snapshot storage, controller tasks) stays on `anyhow`.

use thiserror::Error;
use uuid::Uuid;

use crate::model::sample::SignalType;

/// Errors reported by [`StreamSession`](crate::components::session::StreamSession) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `connect` was called without any stream id.
    #[error("no stream ids given")]
    NoStreams,

    /// The stream directory failed or timed out while fetching metadata.
    #[error("stream directory error: {0}")]
    Directory(String),

    /// `acknowledge` was called with an id that is not in the alert log.
    #[error("alert {0} not found")]
    AlertNotFound(Uuid),

    /// A stream id that is not part of the connected session.
    #[error("stream {0} not found")]
    StreamNotFound(String),

    /// A sample was routed to a stream carrying a different signal.
    #[error("sample of type {sample:?} routed to {stream_id} ({expected:?})")]
    SignalMismatch {
        stream_id: String,
        expected: SignalType,
        sample: SignalType,
    },
}
