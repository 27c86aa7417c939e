//! Per-pass view of one cluster.
//!
//! A [`ClusterState`] is built for a single reconciliation pass and dropped
//! with it. Reads are cached for the lifetime of the pass so the decision
//! tree can ask for the same resource repeatedly; nothing is shared between
//! passes or between clusters.

use crate::controlplane::ControlPlane;
use common::{ClusterDescriptor, ClusterKey, Error, RegistrationRecord, Result, Status};
use kube::runtime::events::Event;

/// Runtime id as known from the registration record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeId {
    /// There is no record for the cluster
    NoRecord,
    /// A record exists but the runtime was not registered yet
    Empty,
    Registered(String),
}

pub struct ClusterState<'a> {
    cp: &'a dyn ControlPlane,
    key: ClusterKey,
    descriptor: Option<Option<ClusterDescriptor>>,
    credentials: Option<Option<Vec<u8>>>,
    record: Option<Option<RegistrationRecord>>,
}

impl<'a> ClusterState<'a> {
    pub fn new(cp: &'a dyn ControlPlane, key: ClusterKey) -> Self {
        Self {
            cp,
            key,
            descriptor: None,
            credentials: None,
            record: None,
        }
    }

    pub fn key(&self) -> &ClusterKey {
        &self.key
    }

    pub async fn get_cluster_descriptor(&mut self) -> Result<Option<ClusterDescriptor>> {
        if self.descriptor.is_none() {
            self.descriptor = Some(self.cp.get_descriptor(&self.key).await?);
        }
        Ok(self.descriptor.clone().flatten())
    }

    /// Kubeconfig of the cluster; an empty payload counts as missing
    pub async fn get_credential_bundle(&mut self) -> Result<Option<Vec<u8>>> {
        if self.credentials.is_none() {
            let creds = self.cp.get_credentials(&self.key).await?;
            self.credentials = Some(creds.filter(|c| !c.is_empty()));
        }
        Ok(self.credentials.clone().flatten())
    }

    pub async fn get_registration_record(&mut self) -> Result<Option<RegistrationRecord>> {
        if self.record.is_none() {
            self.record = Some(self.cp.get_record(&self.key).await?);
        }
        Ok(self.record.clone().flatten())
    }

    /// Drop the cached record so the next read goes to the store
    pub fn forget_registration_record(&mut self) {
        self.record = None;
    }

    pub async fn get_external_runtime_id(&mut self) -> Result<RuntimeId> {
        Ok(match self.get_registration_record().await? {
            None => RuntimeId::NoRecord,
            Some(r) if r.runtime_id.is_empty() => RuntimeId::Empty,
            Some(r) => RuntimeId::Registered(r.runtime_id),
        })
    }

    fn remember(&mut self, record: RegistrationRecord) -> RegistrationRecord {
        self.record = Some(Some(record.clone()));
        record
    }

    async fn require_descriptor(&mut self) -> Result<ClusterDescriptor> {
        self.get_cluster_descriptor()
            .await?
            .ok_or_else(|| Error::Other(format!("Kyma {} not found", self.key)))
    }

    /// Create the record of the cluster with the given runtime id and initial status
    pub async fn create_registration_record(&mut self, runtime_id: &str, status: Status) -> Result<RegistrationRecord> {
        let desc = self.require_descriptor().await?;
        let mut record = RegistrationRecord::for_descriptor(&desc, runtime_id);
        record.status = status;
        let created = self.cp.create_record(&record).await?;
        Ok(self.remember(created))
    }

    /// Store `runtime_id` and `status` on the record, creating it when missing
    pub async fn upsert_registration_record(&mut self, runtime_id: &str, status: Status) -> Result<RegistrationRecord> {
        let desc = self.require_descriptor().await?;
        match self.get_registration_record().await? {
            None => self.create_registration_record(runtime_id, status).await,
            Some(mut record) => {
                record.sync_with(&desc, runtime_id);
                record.status = status;
                let stored = self.cp.replace_record(&record).await?;
                Ok(self.remember(stored))
            }
        }
    }

    pub async fn set_status(&mut self, status: Status) -> Result<RegistrationRecord> {
        let mut record = self
            .get_registration_record()
            .await?
            .ok_or_else(|| Error::Other(format!("Compass Mapping for {} not found", self.key)))?;
        record.status = status;
        let stored = self.cp.replace_record(&record).await?;
        Ok(self.remember(stored))
    }

    /// Store the record as given (used to flip the deletion guard)
    pub(crate) async fn replace_registration_record(&mut self, record: &RegistrationRecord) -> Result<RegistrationRecord> {
        let stored = self.cp.replace_record(record).await?;
        Ok(self.remember(stored))
    }

    pub async fn delete_registration_record(&mut self) -> Result<()> {
        if let Some(record) = self.get_registration_record().await? {
            self.cp.delete_record(&record).await?;
        }
        self.record = Some(None);
        Ok(())
    }

    /// Publish an event on the record, failures are only logged
    pub async fn publish(&self, ev: Event) {
        if let Err(e) = self.cp.publish(&self.key, ev).await {
            tracing::warn!("Failed to publish event for {}: {e}", self.key);
        }
    }
}
