//! Session Controller
//!
//! Single owner of a [`StreamSession`] shared behind a `tokio::sync::RwLock`. The controller runs
//! the periodic sample feed as a background task, publishes [`SessionEvent`]s on a broadcast bus
//! and implements [`SessionApi`] for consumers.
//!
//! Every mutation takes the write lock, so ingestion from the feed and calls from consumers never
//! interleave inside one session.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{error, info, trace, warn};
use std::{path::PathBuf, sync::Arc};
use time::OffsetDateTime;
use tokio::{
    fs,
    sync::{
        broadcast::{Receiver, Sender},
        mpsc, Mutex, RwLock,
    },
    task::JoinHandle,
    time::MissedTickBehavior,
};
use uuid::Uuid;

use crate::{
    api::{
        controller::{SampleSource, SessionApi},
        model::{ModelHandle, SessionModelApi},
    },
    components::{correlation::StreamCorrelation, session::StreamSession},
    core::events::{SessionCommand, SessionEvent},
    model::{alert::Alert, sample::Sample},
};

pub struct SessionController {
    session: Arc<RwLock<StreamSession>>,
    source: Arc<Mutex<dyn SampleSource>>,
    event_bus: Sender<SessionEvent>,
    feed_handle: Option<JoinHandle<()>>,
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(handle) = &self.feed_handle {
            handle.abort();
        }
    }
}

impl SessionController {
    /// Creates a new `SessionController`.
    ///
    /// # Arguments
    /// - `session`: The session to own.
    /// - `source`: Sample source driving the feed once connected.
    /// - `event_bus`: Bus the controller publishes its events on.
    pub fn new(
        session: StreamSession,
        source: impl SampleSource + 'static,
        event_bus: Sender<SessionEvent>,
    ) -> Self {
        trace!("Initializing SessionController.");
        Self {
            session: Arc::new(RwLock::new(session)),
            source: Arc::new(Mutex::new(source)),
            event_bus,
            feed_handle: None,
        }
    }

    /// Returns a read handle to the session.
    pub fn get_model(&self) -> ModelHandle<dyn SessionModelApi> {
        let model: Arc<RwLock<dyn SessionModelApi>> = self.session.clone();
        model
    }

    /// Subscribes to the controller's events.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.event_bus.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        publish(&self.event_bus, event);
    }

    /// Starts the feed task, replacing a running one.
    async fn start_feed(&mut self) {
        let period = self.session.read().await.get_config().feed_interval();
        let session = self.session.clone();
        let source = self.source.clone();
        let bus = self.event_bus.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                Self::feed_tick(&session, &source, &bus).await;
            }
        });
        if let Some(old) = self.feed_handle.replace(handle) {
            old.abort();
        }
        info!("sample feed started, one tick every {:?}", period);
    }

    fn stop_feed(&mut self) {
        if let Some(handle) = self.feed_handle.take() {
            handle.abort();
            info!("sample feed stopped");
        }
    }

    /// Ingests one sample for every active stream.
    ///
    /// A failing stream is logged and skipped; the remaining streams of the tick still run.
    ///
    /// # Returns
    /// The number of samples ingested.
    async fn feed_tick(
        session: &RwLock<StreamSession>,
        source: &Mutex<dyn SampleSource>,
        bus: &Sender<SessionEvent>,
    ) -> usize {
        let mut session = session.write().await;
        let mut source = source.lock().await;
        let now = OffsetDateTime::now_utc();
        let mut ingested = 0;
        for stream_id in session.get_stream_ids() {
            let Some(stream) = session.get_stream(&stream_id) else {
                continue;
            };
            let sample = source.next_sample(stream, now);
            match session.ingest(&stream_id, sample) {
                Ok(alerts) => {
                    ingested += 1;
                    for alert in alerts {
                        publish(bus, SessionEvent::AlertRaised(alert));
                    }
                }
                Err(e) => warn!("feed tick skipped {}: {}", stream_id, e),
            }
        }
        ingested
    }

    /// Asynchronous command handler.
    ///
    /// Processes commands until the channel closes, then disconnects the session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        while let Some(command) = commands.recv().await {
            trace!("handling {:?}", command);
            if let Err(e) = command.forward_to(&mut self).await {
                error!("error during command handling: {}", e);
            }
        }
        if let Err(e) = self.disconnect().await {
            error!("disconnect on shutdown failed: {}", e);
        }
    }
}

fn publish(bus: &Sender<SessionEvent>, event: SessionEvent) {
    if bus.send(event).is_err() {
        trace!("no subscribers for session event");
    }
}

#[async_trait]
impl SessionApi for SessionController {
    async fn connect(&mut self, stream_ids: Vec<String>) -> Result<()> {
        let result = self.session.write().await.connect(&stream_ids).await;
        match result {
            Ok(()) => {
                self.start_feed().await;
                let ids = self.session.read().await.get_stream_ids();
                self.publish(SessionEvent::Connected(ids));
                Ok(())
            }
            Err(e) => {
                // a failed reconnect leaves the session disconnected
                self.stop_feed();
                self.publish(SessionEvent::ConnectFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.stop_feed();
        self.session.write().await.disconnect();
        self.publish(SessionEvent::Disconnected);
        Ok(())
    }

    async fn ingest(&mut self, stream_id: String, sample: Sample) -> Result<Vec<Alert>> {
        let alerts = self.session.write().await.ingest(&stream_id, sample)?;
        for alert in &alerts {
            self.publish(SessionEvent::AlertRaised(alert.clone()));
        }
        Ok(alerts)
    }

    async fn acknowledge(&mut self, alert_id: Uuid) -> Result<Alert> {
        Ok(self.session.write().await.acknowledge(alert_id)?)
    }

    async fn correlate(&self, stream_a: String, stream_b: String) -> Result<Option<f64>> {
        Ok(self.session.read().await.correlate(&stream_a, &stream_b)?)
    }

    async fn refresh_correlations(&mut self) -> Result<Vec<StreamCorrelation>> {
        Ok(self.session.write().await.refresh_correlations())
    }

    async fn store_snapshot(&self, path: PathBuf) -> Result<()> {
        let snapshot = self.session.read().await.snapshot();
        let json =
            tokio::task::spawn_blocking(move || serde_json::to_string_pretty(&snapshot)).await??;
        fs::write(&path, json).await.map_err(|e| anyhow!(e))
    }
}
