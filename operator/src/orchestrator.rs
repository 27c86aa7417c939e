//! Registration lifecycle of one Kyma runtime.
//!
//! A pass reads the Kyma, its kubeconfig secret and its Compass Mapping, then
//! performs at most one call to the director or the runtime agent
//! configurator, persists its outcome on the mapping and tells the caller
//! whether to come back later.

use crate::{
    accessor::{ClusterState, RuntimeId},
    collaborators::{Configurator, Registrator},
    controlplane::ControlPlane,
    events, guard,
    metrics::CompassMetrics,
};
use common::{ClusterDescriptor, ClusterKey, Error, Result, Status};
use kube::runtime::controller::Action;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// What the caller should do once a pass is over
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    RetryAfter(Duration),
}

impl From<Outcome> for Action {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => Action::await_change(),
            Outcome::RetryAfter(delay) => Action::requeue(delay),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    pub requeue: Duration,
    /// When false, runtimes are only ever adopted through the migration annotation
    pub enabled_registration: bool,
}

#[derive(Clone)]
pub struct Orchestrator {
    registrator: Arc<dyn Registrator>,
    configurator: Arc<dyn Configurator>,
    config: ReconcileConfig,
    metrics: CompassMetrics,
}

impl Orchestrator {
    pub fn new(
        registrator: Arc<dyn Registrator>,
        configurator: Arc<dyn Configurator>,
        config: ReconcileConfig,
        metrics: CompassMetrics,
    ) -> Self {
        Self {
            registrator,
            configurator,
            config,
            metrics,
        }
    }

    pub fn requeue(&self) -> Duration {
        self.config.requeue
    }

    fn retry(&self) -> Outcome {
        Outcome::RetryAfter(self.config.requeue)
    }

    /// One reconciliation pass for a Kyma runtime
    pub async fn run_pass(&self, cp: &dyn ControlPlane, key: ClusterKey) -> Result<Outcome> {
        let mut state = ClusterState::new(cp, key);
        let desc = match state.get_cluster_descriptor().await? {
            Some(desc) => desc,
            None => return self.deregister(&mut state).await,
        };
        let kubeconfig = match state.get_credential_bundle().await? {
            Some(kubeconfig) => kubeconfig,
            None => {
                debug!("Kubeconfig for {} not available yet", state.key());
                return Ok(self.retry());
            }
        };

        let runtime_id = match state.get_external_runtime_id().await? {
            RuntimeId::NoRecord if desc.deleting => {
                debug!("Kyma {} is being deleted, not tracking it", state.key());
                return Ok(Outcome::Completed);
            }
            RuntimeId::NoRecord => {
                let migrated = desc.migration_runtime_id().filter(|id| !id.is_empty());
                let status = match migrated {
                    Some(_) => Status::REGISTERED | Status::PROCESSING,
                    None => Status::PROCESSING,
                };
                let record = state
                    .create_registration_record(migrated.unwrap_or_default(), status)
                    .await?;
                info!(
                    "Created Compass Mapping for {} with runtime id `{}`",
                    state.key(),
                    record.runtime_id
                );
                return Ok(self.retry());
            }
            RuntimeId::Empty if desc.deleting => {
                debug!("Kyma {} is being deleted, not registering it", state.key());
                return Ok(self.retry());
            }
            RuntimeId::Empty if self.config.enabled_registration => {
                return self.register(&mut state, &desc).await;
            }
            RuntimeId::Empty => String::new(),
            RuntimeId::Registered(id) => id,
        };

        let global_account = desc.global_account();
        match self
            .configurator
            .configure(&kubeconfig, &runtime_id, &global_account)
            .await
        {
            Ok(()) => {
                self.metrics.configured.inc();
                state.set_status(Status::REGISTERED | Status::CONFIGURED).await?;
                state.publish(events::configured(&desc.kyma_name(), &runtime_id)).await;
                Ok(Outcome::Completed)
            }
            Err(e) => {
                warn!("Configuring runtime `{runtime_id}` for {} failed: {e}", state.key());
                state.set_status(Status::REGISTERED | Status::FAILED).await?;
                state
                    .publish(events::failed(&desc.kyma_name(), "Configure", &e.to_string()))
                    .await;
                Ok(self.retry())
            }
        }
    }

    async fn register(&self, state: &mut ClusterState<'_>, desc: &ClusterDescriptor) -> Result<Outcome> {
        let kyma_name = desc.kyma_name();
        match self.registrator.register(&desc.runtime_labels()).await {
            Ok(runtime_id) => {
                self.metrics.registered.inc();
                info!("Registered runtime `{runtime_id}` for {}", state.key());
                // the id must be stored before anything else happens to this runtime
                if let Err(e) = state
                    .upsert_registration_record(&runtime_id, Status::REGISTERED)
                    .await
                {
                    error!(
                        "Runtime `{runtime_id}` of {} is registered but could not be recorded: {e}",
                        state.key()
                    );
                    self.keep_track(state, &runtime_id, e).await?;
                }
                state.publish(events::registered(&kyma_name, &runtime_id)).await;
            }
            Err(e) => {
                warn!("Registering {} failed: {e}", state.key());
                state.set_status(Status::FAILED).await?;
                state
                    .publish(events::failed(&kyma_name, "Register", &e.to_string()))
                    .await;
            }
        }
        Ok(self.retry())
    }

    /// Recreate the record of a registered runtime whose mapping vanished during registration.
    ///
    /// The new record is guarded so the deletion path deregisters the runtime.
    /// Any other failure is returned and the next pass registers again.
    async fn keep_track(&self, state: &mut ClusterState<'_>, runtime_id: &str, cause: Error) -> Result<()> {
        state.forget_registration_record();
        if state.get_registration_record().await?.is_some() {
            return Err(cause);
        }
        state
            .create_registration_record(runtime_id, Status::REGISTERED)
            .await?;
        warn!("Recreated Compass Mapping for {} to track runtime `{runtime_id}`", state.key());
        Ok(())
    }

    /// Entry point for mapping notifications: only acts once the Kyma is gone
    pub async fn finalize(&self, cp: &dyn ControlPlane, key: ClusterKey) -> Result<Outcome> {
        let mut state = ClusterState::new(cp, key);
        if state.get_cluster_descriptor().await?.is_some() {
            return Ok(Outcome::Completed);
        }
        self.deregister(&mut state).await
    }

    async fn deregister(&self, state: &mut ClusterState<'_>) -> Result<Outcome> {
        let record = match state.get_registration_record().await? {
            Some(record) => record,
            None => return Ok(Outcome::Completed),
        };
        if !record.is_registered() {
            debug!("Runtime of {} was never registered, dropping its mapping", state.key());
            guard::release_and_delete(state).await?;
            return Ok(Outcome::Completed);
        }
        let global_account = record
            .global_account
            .clone()
            .ok_or_else(|| Error::MissingGlobalAccount(state.key().to_string()))?;

        match self
            .registrator
            .deregister(&record.runtime_id, &global_account)
            .await
        {
            Ok(()) => {
                self.metrics.deregistered.inc();
                info!("Deregistered runtime `{}` of {}", record.runtime_id, state.key());
                state
                    .publish(events::deregistered(&record.kyma_name, &record.runtime_id))
                    .await;
                guard::release_and_delete(state).await?;
                Ok(Outcome::Completed)
            }
            Err(e) => {
                warn!(
                    "Deregistering runtime `{}` of {} failed: {e}",
                    record.runtime_id,
                    state.key()
                );
                state
                    .publish(events::failed(&record.kyma_name, "Deregister", &e.to_string()))
                    .await;
                Ok(self.retry())
            }
        }
    }
}
