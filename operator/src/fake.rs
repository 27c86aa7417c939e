//! In-memory control plane for tests.
//!
//! Behaves like the API server where the reconciliation cares: versions are
//! checked on every write and guarded records cannot be deleted.

use crate::controlplane::ControlPlane;
use async_trait::async_trait;
use common::{
    ANNOTATION_ID_FOR_MIGRATION, APPLICATION_CONNECTOR_MODULE, ClusterDescriptor, ClusterKey, Error,
    RegistrationRecord, Result,
};
use kube::runtime::events::Event;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

#[derive(Default)]
struct Inner {
    kymas: BTreeMap<ClusterKey, ClusterDescriptor>,
    secrets: BTreeMap<ClusterKey, Vec<Vec<u8>>>,
    records: BTreeMap<ClusterKey, RegistrationRecord>,
    revision: u64,
    reads: usize,
    failing_writes: usize,
    failing_reads: usize,
    writes: Vec<String>,
    events: Vec<String>,
}

impl Inner {
    fn next_version(&mut self) -> Option<String> {
        self.revision += 1;
        Some(self.revision.to_string())
    }

    fn read(&mut self) -> Result<()> {
        self.reads += 1;
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(Error::Other("store unreachable".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, op: &str, key: &ClusterKey) -> Result<()> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(Error::Other(format!("{op} {key} failed")));
        }
        self.writes.push(op.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeControlPlane {
    inner: Arc<Mutex<Inner>>,
}

impl FakeControlPlane {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Add a Kyma with the application connector module
    pub fn add_kyma(&self, key: &ClusterKey, labels: &[(&str, &str)], annotations: &[(&str, &str)]) {
        let desc = ClusterDescriptor {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            annotations: annotations.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            modules: vec![APPLICATION_CONNECTOR_MODULE.to_string()],
            deleting: false,
        };
        self.lock().kymas.insert(key.clone(), desc);
    }

    pub fn migrate_kyma(&self, key: &ClusterKey, runtime_id: &str) {
        if let Some(desc) = self.lock().kymas.get_mut(key) {
            desc.annotations
                .insert(ANNOTATION_ID_FOR_MIGRATION.to_string(), runtime_id.to_string());
        }
    }

    /// Set the deletion timestamp of a Kyma
    pub fn mark_deleting(&self, key: &ClusterKey) {
        if let Some(desc) = self.lock().kymas.get_mut(key) {
            desc.deleting = true;
        }
    }

    pub fn remove_kyma(&self, key: &ClusterKey) {
        self.lock().kymas.remove(key);
    }

    pub fn add_kubeconfig(&self, key: &ClusterKey, data: &[u8]) {
        self.lock()
            .secrets
            .entry(key.clone())
            .or_default()
            .push(data.to_vec());
    }

    /// Store a record as-is, bypassing the reconciliation
    pub fn put_record(&self, mut record: RegistrationRecord) {
        let mut inner = self.lock();
        record.version = inner.next_version();
        inner.records.insert(record.key.clone(), record);
    }

    /// Drop a record as-is, bypassing the guard
    pub fn remove_record(&self, key: &ClusterKey) {
        self.lock().records.remove(key);
    }

    pub fn record(&self, key: &ClusterKey) -> Option<RegistrationRecord> {
        self.lock().records.get(key).cloned()
    }

    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Write operations that went through, in order
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Reasons of the published events, in order
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    /// Make the next `n` writes fail
    pub fn fail_writes(&self, n: usize) {
        self.lock().failing_writes = n;
    }

    /// Make the next `n` reads fail
    pub fn fail_reads(&self, n: usize) {
        self.lock().failing_reads = n;
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_descriptor(&self, key: &ClusterKey) -> Result<Option<ClusterDescriptor>> {
        let mut inner = self.lock();
        inner.read()?;
        Ok(inner.kymas.get(key).cloned())
    }

    async fn get_credentials(&self, key: &ClusterKey) -> Result<Option<Vec<u8>>> {
        let mut inner = self.lock();
        inner.read()?;
        match inner.secrets.get(key).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([data]) => Ok(Some(data.clone())),
            Some(all) => Err(Error::DuplicateCredentials(key.to_string(), all.len())),
        }
    }

    async fn get_record(&self, key: &ClusterKey) -> Result<Option<RegistrationRecord>> {
        let mut inner = self.lock();
        inner.read()?;
        Ok(inner.records.get(key).cloned())
    }

    async fn create_record(&self, record: &RegistrationRecord) -> Result<RegistrationRecord> {
        let mut inner = self.lock();
        if inner.records.contains_key(&record.key) {
            return Err(Error::Conflict(record.key.to_string()));
        }
        inner.write("create", &record.key)?;
        let mut stored = record.clone();
        stored.version = inner.next_version();
        inner.records.insert(stored.key.clone(), stored.clone());
        Ok(stored)
    }

    async fn replace_record(&self, record: &RegistrationRecord) -> Result<RegistrationRecord> {
        let mut inner = self.lock();
        let current = inner
            .records
            .get(&record.key)
            .cloned()
            .ok_or_else(|| Error::Other(format!("{} not found", record.key)))?;
        if current.version != record.version {
            return Err(Error::Conflict(record.key.to_string()));
        }
        let op = if current.guarded && !record.guarded { "unguard" } else { "replace" };
        inner.write(op, &record.key)?;
        let mut stored = record.clone();
        stored.version = inner.next_version();
        inner.records.insert(stored.key.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete_record(&self, record: &RegistrationRecord) -> Result<()> {
        let mut inner = self.lock();
        let current = match inner.records.get(&record.key) {
            Some(current) => current.clone(),
            None => return Ok(()),
        };
        if current.guarded {
            return Err(Error::DeletionGuarded(record.key.to_string()));
        }
        if current.version != record.version {
            return Err(Error::Conflict(record.key.to_string()));
        }
        inner.write("delete", &record.key)?;
        inner.records.remove(&record.key);
        Ok(())
    }

    async fn publish(&self, _key: &ClusterKey, ev: Event) -> Result<()> {
        self.lock().events.push(ev.reason);
        Ok(())
    }
}
