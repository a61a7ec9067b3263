//! Core Events
//!
//! This module defines the events exchanged between a running session and its consumers.
//! Commands flow into the session controller, notifications flow out on a broadcast bus.
use anyhow::Result;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{api::controller::SessionApi, model::alert::Alert};

/// Notifications published by the session controller.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The session connected to the listed streams.
    Connected(Vec<String>),
    /// Connecting failed, with the reported error.
    ConnectFailed(String),
    /// The session dropped its streams.
    Disconnected,
    /// A new alert entered the alert log.
    AlertRaised(Alert),
}

/// Requests a consumer sends to a session controller.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Connect(Vec<String>),
    Disconnect,
    Acknowledge(Uuid),
    RefreshCorrelations,
    StoreSnapshot(PathBuf),
}

impl SessionCommand {
    /// Forwards the command to the matching `SessionApi` call.
    pub async fn forward_to<A: SessionApi + ?Sized>(self, api: &mut A) -> Result<()> {
        match self {
            SessionCommand::Connect(ids) => api.connect(ids).await,
            SessionCommand::Disconnect => api.disconnect().await,
            SessionCommand::Acknowledge(id) => api.acknowledge(id).await.map(|_| ()),
            SessionCommand::RefreshCorrelations => api.refresh_correlations().await.map(|_| ()),
            SessionCommand::StoreSnapshot(path) => api.store_snapshot(path).await,
        }
    }
}
