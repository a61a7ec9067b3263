//! Stream Session
//!
//! Owns everything a monitoring session needs: the connected streams, one ring buffer per
//! stream, the alert log and the counters. Samples go through the outlier filter, into the
//! stream's buffer, and then through the alert evaluator.
//!
//! The session is a plain owned struct mutated through `&mut self`. Callers that ingest from
//! several tasks serialize access themselves, see
//! [`SessionController`](crate::controller::session::SessionController).

use log::{debug, error, info, trace, warn};
use rust_fsm::state_machine;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Instant,
};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    correlation::{CorrelationEngine, StreamCorrelation},
    evaluator::AlertEvaluator,
    outlier::OutlierFilter,
};
use crate::{
    api::{controller::StreamDirectory, model::SessionModelApi},
    core::error::SessionError,
    model::{
        alert::{Alert, AlertLog},
        buffer::RingBuffer,
        config::SessionConfig,
        sample::Sample,
        snapshot::{ConnectionState, SessionMetrics, SessionSnapshot, StreamSummary},
        stream::StreamMetadata,
    },
};

state_machine! {
    #[derive(Debug)]
    session_link(Disconnected)

    Disconnected => {
        Connect => Connecting,
        Disconnect => Disconnected
    },
    Connecting => {
        Established => Connected [OpenStreams],
        Failed => Disconnected,
        Disconnect => Disconnected
    },
    Connected => {
        BeginIngest => Processing,
        Disconnect => Disconnected [CloseStreams]
    },
    Processing => {
        EndIngest => Connected,
        Disconnect => Disconnected [CloseStreams]
    }
}

/// One patient's monitoring session.
pub struct StreamSession {
    patient_id: String,
    config: SessionConfig,
    directory: Arc<dyn StreamDirectory>,
    machine: session_link::StateMachine,
    filter: OutlierFilter,
    evaluator: AlertEvaluator,
    correlation: CorrelationEngine,
    streams: HashMap<String, StreamMetadata>,
    buffers: HashMap<String, RingBuffer>,
    alerts: AlertLog,
    correlations: BTreeMap<(String, String), StreamCorrelation>,
    metrics: SessionMetrics,
    last_error: Option<String>,
}

impl StreamSession {
    /// Creates a disconnected session.
    ///
    /// # Arguments
    /// - `patient_id`: Patient whose streams will be requested on connect.
    /// - `config`: Session options, validated here.
    /// - `directory`: Source of stream metadata.
    pub fn new(
        patient_id: impl Into<String>,
        config: SessionConfig,
        directory: Arc<dyn StreamDirectory>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let evaluator = AlertEvaluator::new(config.threshold_table()?);
        Ok(Self {
            patient_id: patient_id.into(),
            directory,
            machine: session_link::StateMachine::new(),
            filter: OutlierFilter::new(config.outlier_window, config.outlier_z_score),
            evaluator,
            correlation: CorrelationEngine::new(config.correlation_points),
            streams: HashMap::new(),
            buffers: HashMap::new(),
            alerts: AlertLog::new(config.alert_capacity),
            correlations: BTreeMap::new(),
            metrics: SessionMetrics::default(),
            last_error: None,
            config,
        })
    }

    pub fn get_config(&self) -> &SessionConfig {
        &self.config
    }

    fn transition(&mut self, input: session_link::Input) -> Option<session_link::Output> {
        match self.machine.consume(&input) {
            Ok(output) => output,
            Err(_) => {
                trace!(
                    "transition {:?} ignored in state {:?}",
                    input,
                    self.machine.state()
                );
                None
            }
        }
    }

    /// Connects to `stream_ids`, replacing any streams of an earlier connection.
    ///
    /// Metadata is fetched from the stream directory within the configured timeout. Inactive
    /// streams are skipped. On failure the session stays disconnected and keeps the error
    /// message until the next successful operation.
    pub async fn connect(&mut self, stream_ids: &[String]) -> Result<(), SessionError> {
        if stream_ids.is_empty() {
            return Err(SessionError::NoStreams);
        }
        if self.is_connected() {
            info!("reconnecting session {}", self.patient_id);
            self.disconnect();
        }
        self.transition(session_link::Input::Connect);

        let timeout = self.config.connect_timeout();
        let fetch = self.directory.get_stream_metadata(&self.patient_id, stream_ids);
        let result = match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(metadata)) => Ok(metadata),
            Ok(Err(e)) => Err(SessionError::Directory(e.to_string())),
            Err(_) => Err(SessionError::Directory(format!(
                "timed out after {} ms",
                timeout.as_millis()
            ))),
        };

        match result {
            Ok(metadata) => {
                if let Some(session_link::Output::OpenStreams) =
                    self.transition(session_link::Input::Established)
                {
                    self.open_streams(metadata);
                }
                self.last_error = None;
                info!(
                    "session {} connected to {} streams",
                    self.patient_id,
                    self.streams.len()
                );
                Ok(())
            }
            Err(e) => {
                self.transition(session_link::Input::Failed);
                error!("session {} failed to connect: {}", self.patient_id, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn open_streams(&mut self, metadata: Vec<StreamMetadata>) {
        for stream in metadata {
            if !stream.active {
                debug!("skipping inactive stream {}", stream.id);
                continue;
            }
            self.buffers
                .insert(stream.id.clone(), RingBuffer::new(self.config.buffer_size));
            self.streams.insert(stream.id.clone(), stream);
        }
    }

    /// Drops all streams, buffers and cached correlations. Alerts and counters are kept.
    /// Succeeds in every state.
    pub fn disconnect(&mut self) {
        let output = self.transition(session_link::Input::Disconnect);
        self.streams.clear();
        self.buffers.clear();
        self.correlations.clear();
        self.last_error = None;
        if let Some(session_link::Output::CloseStreams) = output {
            info!("session {} disconnected", self.patient_id);
        }
    }

    /// Routes one sample through filter, buffer and evaluator.
    ///
    /// # Returns
    /// The alerts raised by this sample. Samples for streams that are not active are dropped
    /// and yield no alerts.
    pub fn ingest(&mut self, stream_id: &str, sample: Sample) -> Result<Vec<Alert>, SessionError> {
        match self.streams.get(stream_id) {
            None => {
                trace!("dropping sample for inactive stream {}", stream_id);
                return Ok(Vec::new());
            }
            Some(stream) if stream.signal_type != sample.get_signal_type() => {
                return Err(SessionError::SignalMismatch {
                    stream_id: stream_id.to_owned(),
                    expected: stream.signal_type,
                    sample: sample.get_signal_type(),
                });
            }
            Some(_) => {}
        }

        let started = Instant::now();
        self.transition(session_link::Input::BeginIngest);

        let stream = &self.streams[stream_id];
        let capacity = self.config.buffer_size;
        let buffer = self
            .buffers
            .entry(stream_id.to_owned())
            .or_insert_with(|| RingBuffer::new(capacity));
        let sample = if self.config.filter_outliers {
            self.filter.classify(sample, buffer)
        } else {
            sample
        };
        if sample.is_outlier() {
            warn!("{} value {} tagged as outlier", stream_id, sample.get_value());
        }
        buffer.append(sample.clone());

        let alerts = self.evaluator.evaluate(&sample, stream, self.alerts.iter());
        for alert in &alerts {
            debug!("{:?} alert on {}: {}", alert.priority, stream_id, alert.message);
        }
        self.alerts.extend(alerts.iter().cloned());
        self.metrics.record(started.elapsed(), alerts.len());

        self.transition(session_link::Input::EndIngest);
        Ok(alerts)
    }

    /// Marks an alert acknowledged and returns its updated copy.
    pub fn acknowledge(&mut self, alert_id: Uuid) -> Result<Alert, SessionError> {
        let alert = self
            .alerts
            .acknowledge(alert_id, OffsetDateTime::now_utc())
            .cloned()
            .ok_or(SessionError::AlertNotFound(alert_id))?;
        self.last_error = None;
        Ok(alert)
    }

    /// Pearson correlation of two connected streams over the configured number of points.
    pub fn correlate(&self, stream_a: &str, stream_b: &str) -> Result<Option<f64>, SessionError> {
        let a = self
            .buffers
            .get(stream_a)
            .ok_or_else(|| SessionError::StreamNotFound(stream_a.to_owned()))?;
        let b = self
            .buffers
            .get(stream_b)
            .ok_or_else(|| SessionError::StreamNotFound(stream_b.to_owned()))?;
        Ok(self.correlation.correlate(a, b))
    }

    /// Recomputes and caches the correlation of every pair of connected streams.
    pub fn refresh_correlations(&mut self) -> Vec<StreamCorrelation> {
        self.correlations = self
            .correlation
            .correlation_matrix(self.buffers.iter().map(|(id, buf)| (id.as_str(), buf)));
        self.correlations.values().cloned().collect()
    }

    /// Ids of the active streams, sorted.
    pub fn get_stream_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.streams.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn get_stream(&self, stream_id: &str) -> Option<&StreamMetadata> {
        self.streams.get(stream_id)
    }
}

impl SessionModelApi for StreamSession {
    fn get_patient_id(&self) -> &str {
        &self.patient_id
    }

    fn get_state(&self) -> ConnectionState {
        match self.machine.state() {
            session_link::State::Disconnected => ConnectionState::Disconnected,
            session_link::State::Connecting => ConnectionState::Connecting,
            session_link::State::Connected => ConnectionState::Connected,
            session_link::State::Processing => ConnectionState::Processing,
        }
    }

    fn get_active_streams(&self) -> Vec<&StreamMetadata> {
        let mut streams: Vec<&StreamMetadata> = self.streams.values().collect();
        streams.sort_by(|a, b| a.id.cmp(&b.id));
        streams
    }

    fn get_buffer(&self, stream_id: &str) -> Option<&RingBuffer> {
        self.buffers.get(stream_id)
    }

    fn get_alerts(&self) -> Vec<&Alert> {
        self.alerts.iter().collect()
    }

    fn get_unacknowledged_alerts(&self, limit: usize) -> Vec<&Alert> {
        self.alerts.unacknowledged(limit)
    }

    fn get_metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    fn get_last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn get_correlations(&self) -> Vec<&StreamCorrelation> {
        self.correlations.values().collect()
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            patient_id: self.patient_id.clone(),
            state: self.get_state(),
            streams: self
                .get_active_streams()
                .into_iter()
                .map(|stream| {
                    let buffer = self.buffers.get(&stream.id);
                    StreamSummary {
                        metadata: stream.clone(),
                        samples: buffer.map(RingBuffer::len).unwrap_or_default(),
                        latest_value: buffer.and_then(RingBuffer::latest).map(Sample::get_value),
                    }
                })
                .collect(),
            alerts: self.alerts.to_vec(),
            metrics: self.metrics.clone(),
            correlations: self.correlations.values().cloned().collect(),
            last_error: self.last_error.clone(),
            taken_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::controller::MockStreamDirectory,
        components::directory::InMemoryDirectory,
        model::{
            sample::{Quality, SignalType},
            threshold::Priority,
        },
    };
    use anyhow::anyhow;

    fn directory() -> Arc<dyn StreamDirectory> {
        let mut inactive = StreamMetadata::new("old", "p1", SignalType::HeartRate);
        inactive.active = false;
        Arc::new(InMemoryDirectory::new([
            StreamMetadata::new("s1", "p1", SignalType::HeartRate),
            StreamMetadata::new("s2", "p1", SignalType::OxygenSaturation),
            inactive,
        ]))
    }

    fn session() -> StreamSession {
        StreamSession::new("p1", SessionConfig::default(), directory()).unwrap()
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn hr(value: f64) -> Sample {
        Sample::new("s1", SignalType::HeartRate, value, OffsetDateTime::now_utc())
    }

    #[tokio::test]
    async fn test_connect_disconnect() {
        let mut session = session();
        assert_eq!(session.get_state(), ConnectionState::Disconnected);
        session.connect(&ids(&["s1"])).await.unwrap();
        assert_eq!(session.get_active_streams().len(), 1);
        assert!(session.is_connected());
        assert!(session.get_buffer("s1").unwrap().is_empty());

        session.disconnect();
        assert_eq!(session.get_active_streams().len(), 0);
        assert!(!session.is_connected());
        assert!(session.get_buffer("s1").is_none());

        // idempotent
        session.disconnect();
        assert_eq!(session.get_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_with_mocked_directory() {
        let mut directory = MockStreamDirectory::new();
        directory
            .expect_get_stream_metadata()
            .times(1)
            .returning(|patient, _| Ok(vec![StreamMetadata::new("s1", patient, SignalType::HeartRate)]));
        let mut session =
            StreamSession::new("p9", SessionConfig::default(), Arc::new(directory)).unwrap();
        session.connect(&ids(&["s1"])).await.unwrap();
        assert_eq!(session.get_active_streams()[0].patient_id, "p9");
    }

    #[tokio::test]
    async fn test_connect_requires_stream_ids() {
        let mut session = session();
        assert!(matches!(session.connect(&[]).await, Err(SessionError::NoStreams)));
        assert_eq!(session.get_state(), ConnectionState::Disconnected);
        assert!(session.get_last_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_error() {
        let mut directory = MockStreamDirectory::new();
        directory
            .expect_get_stream_metadata()
            .returning(|_, _| Err(anyhow!("registry offline")));
        let mut session =
            StreamSession::new("p1", SessionConfig::default(), Arc::new(directory)).unwrap();
        let result = session.connect(&ids(&["s1"])).await;
        assert!(matches!(result, Err(SessionError::Directory(_))));
        assert_eq!(session.get_state(), ConnectionState::Disconnected);
        assert!(session.get_last_error().unwrap().contains("registry offline"));
    }

    #[tokio::test]
    async fn test_inactive_streams_are_skipped() {
        let mut session = session();
        session.connect(&ids(&["s1", "old"])).await.unwrap();
        assert_eq!(session.get_stream_ids(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_streams() {
        let mut session = session();
        session.connect(&ids(&["s1"])).await.unwrap();
        session.ingest("s1", hr(70.0)).unwrap();
        session.connect(&ids(&["s2"])).await.unwrap();
        assert_eq!(session.get_stream_ids(), vec!["s2".to_string()]);
        assert!(session.get_buffer("s1").is_none());
    }

    #[tokio::test]
    async fn test_threshold_firing_through_session() {
        let mut session = session();
        session.connect(&ids(&["s1"])).await.unwrap();
        let alerts = session.ingest("s1", hr(130.0)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule.label, "Severe Tachycardia");
        assert_eq!(alerts[0].priority, Priority::Urgent);
        assert_eq!(session.get_alerts().len(), 1);
        assert_eq!(session.get_metrics().samples_processed, 1);
        assert_eq!(session.get_metrics().alerts_generated, 1);
        assert_eq!(session.get_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_suppression_uses_session_alerts() {
        let mut session = session();
        session.connect(&ids(&["s1"])).await.unwrap();
        assert_eq!(session.ingest("s1", hr(110.0)).unwrap().len(), 1);
        assert!(session.ingest("s1", hr(95.0)).unwrap().is_empty());
        assert_eq!(session.ingest("s1", hr(125.0)).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_ignores_inactive_stream() {
        let mut session = session();
        assert!(session.ingest("s1", hr(200.0)).unwrap().is_empty());
        session.connect(&ids(&["s1"])).await.unwrap();
        assert!(session.ingest("nope", hr(200.0)).unwrap().is_empty());
        assert_eq!(session.get_metrics().samples_processed, 0);
    }

    #[tokio::test]
    async fn test_ingest_rejects_signal_mismatch() {
        let mut session = session();
        session.connect(&ids(&["s1", "s2"])).await.unwrap();
        let result = session.ingest("s2", hr(70.0));
        assert!(matches!(result, Err(SessionError::SignalMismatch { .. })));
        assert!(session.get_buffer("s2").unwrap().is_empty());
        // the other stream is unaffected
        assert!(session.ingest("s1", hr(70.0)).is_ok());
    }

    #[tokio::test]
    async fn test_outliers_are_stored_tagged() {
        let mut session = session();
        session.connect(&ids(&["s1"])).await.unwrap();
        for _ in 0..10 {
            session.ingest("s1", hr(50.0)).unwrap();
        }
        session.ingest("s1", hr(1000.0)).unwrap();
        let latest = session.get_buffer("s1").unwrap().latest().unwrap();
        assert_eq!(latest.get_quality(), Quality::Low);
        assert!(latest.is_outlier());
    }

    #[tokio::test]
    async fn test_outlier_filter_can_be_disabled() {
        let config = SessionConfig {
            filter_outliers: false,
            ..Default::default()
        };
        let mut session = StreamSession::new("p1", config, directory()).unwrap();
        session.connect(&ids(&["s1"])).await.unwrap();
        for _ in 0..10 {
            session.ingest("s1", hr(50.0)).unwrap();
        }
        session.ingest("s1", hr(1000.0)).unwrap();
        assert!(!session.get_buffer("s1").unwrap().latest().unwrap().is_outlier());
    }

    #[tokio::test]
    async fn test_acknowledge() {
        let mut session = session();
        session.connect(&ids(&["s1"])).await.unwrap();
        let alert = session.ingest("s1", hr(130.0)).unwrap().remove(0);

        let before: Vec<Alert> = session.get_alerts().into_iter().cloned().collect();
        let result = session.acknowledge(Uuid::new_v4());
        assert!(matches!(result, Err(SessionError::AlertNotFound(_))));
        let after: Vec<Alert> = session.get_alerts().into_iter().cloned().collect();
        assert_eq!(before, after);

        let acked = session.acknowledge(alert.id).unwrap();
        assert!(acked.acknowledged);
        assert!(acked.acknowledged_at.is_some());
        assert!(session.get_unacknowledged_alerts(10).is_empty());
    }

    #[tokio::test]
    async fn test_alert_log_is_capped() {
        let mut session = session();
        session.connect(&ids(&["s1"])).await.unwrap();
        let mut raised = Vec::new();
        for _ in 0..150 {
            raised.extend(session.ingest("s1", hr(130.0)).unwrap());
        }
        assert_eq!(raised.len(), 150);
        let kept: Vec<Uuid> = session.get_alerts().iter().map(|a| a.id).collect();
        let expected: Vec<Uuid> = raised[50..].iter().map(|a| a.id).collect();
        assert_eq!(kept, expected);
        assert_eq!(session.get_metrics().alerts_generated, 150);
    }

    #[tokio::test]
    async fn test_correlate_streams() {
        let mut session = session();
        session.connect(&ids(&["s1", "s2"])).await.unwrap();
        for i in 0..5 {
            session.ingest("s1", hr(60.0 + i as f64)).unwrap();
        }
        assert_eq!(session.correlate("s1", "s1").unwrap(), None);
        for i in 5..30 {
            session.ingest("s1", hr(60.0 + (i % 7) as f64)).unwrap();
        }
        let r = session.correlate("s1", "s1").unwrap().unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert!(matches!(
            session.correlate("s1", "zz"),
            Err(SessionError::StreamNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_correlations_and_snapshot() {
        let mut session = session();
        session.connect(&ids(&["s1", "s2"])).await.unwrap();
        for i in 0..20 {
            session.ingest("s1", hr(60.0 + (i % 4) as f64)).unwrap();
            let spo2 = Sample::new(
                "s2",
                SignalType::OxygenSaturation,
                96.0 + (i % 4) as f64 * 0.5,
                OffsetDateTime::now_utc(),
            );
            session.ingest("s2", spo2).unwrap();
        }
        let pairs = session.refresh_correlations();
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].coefficient - 1.0).abs() < 1e-9);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Connected);
        assert_eq!(snapshot.streams.len(), 2);
        assert_eq!(snapshot.streams[0].samples, 20);
        assert_eq!(snapshot.correlations.len(), 1);

        session.disconnect();
        assert!(session.get_correlations().is_empty());
    }
}
