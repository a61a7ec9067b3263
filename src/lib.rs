//! Vitals Alerting Engine
//!
//! Ingests per-stream biometric samples for one patient, flags statistical outliers, raises
//! threshold alerts and correlates streams against each other.

/// Core utilities used throughout the crate.
pub mod core {
    /// Crate-wide constants.
    pub mod constants;
    /// Typed session errors.
    pub mod error;
    /// Commands and notifications of a running session.
    pub mod events;
}

/// Trait seams between the session and its collaborators.
pub mod api {
    /// Behavior traits: stream directory, sample source and session operations.
    pub mod controller;
    /// Read-only session view.
    pub mod model;
}

/// Processing components.
pub mod components {
    pub mod correlation;
    /// In-memory stream directory.
    pub mod directory;
    pub mod evaluator;
    /// Simulated sample source.
    pub mod feed;
    pub mod outlier;
    /// Stream session lifecycle and ingestion.
    pub mod session;
}

/// Controllers driving sessions asynchronously.
pub mod controller {
    /// Owns a session, runs its feed and publishes events.
    pub mod session;
}

/// Statistical helpers.
pub mod math {
    pub mod stats;
}

/// Data models of the engine.
pub mod model {
    /// Alerts and the bounded alert log.
    pub mod alert;
    /// Fixed-capacity sample history.
    pub mod buffer;
    /// Session configuration.
    pub mod config;
    /// Samples and signal types.
    pub mod sample;
    /// Serializable session state.
    pub mod snapshot;
    /// Stream metadata.
    pub mod stream;
    /// Alert threshold rules.
    pub mod threshold;
}
