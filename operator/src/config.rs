use crate::orchestrator::ReconcileConfig;
use clap::Parser;
use std::time::Duration;

/// Compass Manager: registers Kyma runtimes in compass
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Seconds to wait before retrying an unfinished registration
    #[arg(long, env = "APP_REQUEUE_SECONDS", default_value_t = 5)]
    pub requeue_seconds: u64,

    /// Register runtimes that were not migrated from the provisioner
    #[arg(long, env = "APP_ENABLED_REGISTRATION", default_value_t = false)]
    pub enabled_registration: bool,

    /// Address of the metrics and health endpoints
    #[arg(long, env = "APP_LISTEN", default_value = "0.0.0.0:9000")]
    pub listen: String,
}

impl Config {
    pub fn reconcile(&self) -> ReconcileConfig {
        ReconcileConfig {
            requeue: Duration::from_secs(self.requeue_seconds),
            enabled_registration: self.enabled_registration,
        }
    }
}
