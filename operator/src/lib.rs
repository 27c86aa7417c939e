pub use common::{Error, Result};

/// Store access and events
pub mod controlplane;
pub mod events;

/// Per-pass view of a runtime and its registration
pub mod accessor;
pub mod guard;
pub mod orchestrator;

/// Director and runtime agent seams
pub mod collaborators;

pub mod filter;
pub mod kyma;
pub mod mapping;

/// State machinery for kube, as exposeable to actix
pub mod manager;
pub use manager::Manager;

pub mod config;
pub use config::Config;

/// Generated type, for crdgen
pub use common::mapping::CompassManagerMapping;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::Metrics;

#[cfg(test)]
pub mod fake;
