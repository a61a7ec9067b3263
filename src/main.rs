//! Vitals Monitor Demo
//!
//! Runs one simulated patient session: connects a handful of streams, logs alerts as they are
//! raised and writes a session snapshot before shutting down.
//!
//! Usage: `vitals-rs [config.json] [snapshot.json]`

use anyhow::Result;
use env_logger::Env;
use log::{info, warn};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::{broadcast, mpsc};
use vitals_rs::{
    api::model::SessionModelApi,
    components::{directory::InMemoryDirectory, feed::SimulatedSource, session::StreamSession},
    controller::session::SessionController,
    core::events::{SessionCommand, SessionEvent},
    model::{
        config::SessionConfig, sample::SignalType, snapshot::SessionSnapshot,
        stream::StreamMetadata,
    },
};

const PATIENT_ID: &str = "demo-patient";
const RUN_TIME: Duration = Duration::from_secs(10);

const DEMO_STREAMS: [(&str, SignalType); 5] = [
    ("hr", SignalType::HeartRate),
    ("spo2", SignalType::OxygenSaturation),
    ("resp", SignalType::RespiratoryRate),
    ("temp", SignalType::BodyTemperature),
    ("bp-sys", SignalType::BloodPressureSystolic),
];

fn demo_directory() -> InMemoryDirectory {
    let mut directory = InMemoryDirectory::default();
    for (id, signal_type) in DEMO_STREAMS {
        directory.insert(StreamMetadata::new(id, PATIENT_ID, signal_type));
    }
    directory
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        Env::default()
            .filter_or("VITALS_LOG_LEVEL", "info")
            .write_style_or("VITALS_LOG_STYLE", "always"),
    )
    .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SessionConfig::from_file(path)?,
        // fast feed so that the demo produces data within seconds
        None => SessionConfig {
            sample_rate: 600,
            ..Default::default()
        },
    };
    let snapshot_path = PathBuf::from(args.next().unwrap_or("snapshot.json".to_string()));

    let stream_ids = DEMO_STREAMS.iter().map(|(id, _)| id.to_string()).collect();
    let session = StreamSession::new(PATIENT_ID, config, Arc::new(demo_directory()))?;
    let (event_tx, mut events) = broadcast::channel(256);
    let controller = SessionController::new(session, SimulatedSource::default(), event_tx);
    let model = controller.get_model();

    let (command_tx, command_rx) = mpsc::channel(16);
    let runner = tokio::spawn(controller.run(command_rx));

    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::AlertRaised(alert)) => {
                    warn!("[{:?}] {} ({})", alert.priority, alert.message, alert.stream_id)
                }
                Ok(event) => info!("session event: {:?}", event),
                Err(broadcast::error::RecvError::Lagged(n)) => warn!("missed {} events", n),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    command_tx.send(SessionCommand::Connect(stream_ids)).await?;
    tokio::time::sleep(RUN_TIME).await;

    let pending: Vec<_> = model
        .read()
        .await
        .get_unacknowledged_alerts(5)
        .iter()
        .map(|alert| alert.id)
        .collect();
    for id in pending {
        command_tx.send(SessionCommand::Acknowledge(id)).await?;
    }
    command_tx.send(SessionCommand::RefreshCorrelations).await?;
    command_tx
        .send(SessionCommand::StoreSnapshot(snapshot_path.clone()))
        .await?;
    drop(command_tx);
    runner.await?;
    listener.await?;

    let model = model.read().await;
    let metrics = model.get_metrics();
    info!(
        "processed {} samples, raised {} alerts, average latency {:.3} ms",
        metrics.samples_processed, metrics.alerts_generated, metrics.average_latency_ms
    );

    let json = tokio::fs::read_to_string(&snapshot_path).await?;
    let snapshot: SessionSnapshot = serde_json::from_str(&json)?;
    for correlation in &snapshot.correlations {
        info!(
            "{} ~ {}: {:.3} over {} points",
            correlation.stream_a, correlation.stream_b, correlation.coefficient, correlation.points
        );
    }
    info!("snapshot written to {}", snapshot_path.display());
    Ok(())
}
