//! This module defines the read only API for interacting with a stream session.
//! It provides interfaces for accessing the connection state, active streams, alerts
//! and running counters.
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    components::correlation::StreamCorrelation,
    model::{
        alert::Alert,
        buffer::RingBuffer,
        snapshot::{ConnectionState, SessionMetrics, SessionSnapshot},
        stream::StreamMetadata,
    },
};

/// `SessionModelApi` trait.
///
/// Read access to a stream session, as needed by a consumer UI.
pub trait SessionModelApi: Send + Sync {
    /// Patient the session monitors.
    fn get_patient_id(&self) -> &str;

    /// Current lifecycle state.
    fn get_state(&self) -> ConnectionState;

    /// Checks whether the session is connected (including while processing a sample).
    fn is_connected(&self) -> bool {
        matches!(
            self.get_state(),
            ConnectionState::Connected | ConnectionState::Processing
        )
    }

    /// Active streams, sorted by id.
    fn get_active_streams(&self) -> Vec<&StreamMetadata>;

    /// History buffer of one stream.
    fn get_buffer(&self, stream_id: &str) -> Option<&RingBuffer>;

    /// All retained alerts, oldest first.
    fn get_alerts(&self) -> Vec<&Alert>;

    /// Unacknowledged alerts by priority, then recency, at most `limit`.
    fn get_unacknowledged_alerts(&self, limit: usize) -> Vec<&Alert>;

    /// Running counters.
    fn get_metrics(&self) -> &SessionMetrics;

    /// Most recent failure message, cleared by the next successful operation.
    fn get_last_error(&self) -> Option<&str>;

    /// Correlations computed by the last refresh.
    fn get_correlations(&self) -> Vec<&StreamCorrelation>;

    /// Serializable copy of the session state.
    fn snapshot(&self) -> SessionSnapshot;
}

pub type ModelHandle<T> = Arc<RwLock<T>>;
