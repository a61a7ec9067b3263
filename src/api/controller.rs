//! Controller Module
//!
//! This module defines the traits at the boundaries of a stream session: the external stream
//! directory consulted on connect, the source of samples driving ingestion, and the asynchronous
//! API a consumer uses to steer a running session.
use crate::{
    components::correlation::StreamCorrelation,
    model::{alert::Alert, sample::Sample, stream::StreamMetadata},
};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use time::OffsetDateTime;
use uuid::Uuid;

/// StreamDirectory trait
///
/// Resolves stream ids to their metadata. Implementations talk to whatever patient registry
/// backs the deployment; the session only needs this one call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamDirectory: Send + Sync {
    /// Fetch metadata for `stream_ids` owned by `patient_id`.
    ///
    /// # Returns
    ///
    /// The metadata of the requested streams, or an error if the lookup failed.
    async fn get_stream_metadata(
        &self,
        patient_id: &str,
        stream_ids: &[String],
    ) -> Result<Vec<StreamMetadata>>;
}

/// SampleSource trait
///
/// Produces the next reading for a stream. The simulated feed calls it once per stream and tick.
pub trait SampleSource: Send {
    /// Produce a sample for `stream` taken at `timestamp`.
    fn next_sample(&mut self, stream: &StreamMetadata, timestamp: OffsetDateTime) -> Sample;
}

/// SessionApi trait
///
/// Asynchronous, mutating operations on a running session. Every call returns an explicit
/// result; none of them is fatal to the session.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Connect to the given streams and start the sample feed.
    async fn connect(&mut self, stream_ids: Vec<String>) -> Result<()>;

    /// Stop the feed and drop all streams. Always succeeds.
    async fn disconnect(&mut self) -> Result<()>;

    /// Route one sample into the session, returning the alerts it raised.
    async fn ingest(&mut self, stream_id: String, sample: Sample) -> Result<Vec<Alert>>;

    /// Mark an alert acknowledged.
    async fn acknowledge(&mut self, alert_id: Uuid) -> Result<Alert>;

    /// Correlate two connected streams. `None` means not enough data or no variance.
    async fn correlate(&self, stream_a: String, stream_b: String) -> Result<Option<f64>>;

    /// Recompute the pairwise correlations of all connected streams.
    async fn refresh_correlations(&mut self) -> Result<Vec<StreamCorrelation>>;

    /// Store a JSON snapshot of the session state.
    async fn store_snapshot(&self, path: PathBuf) -> Result<()>;
}
