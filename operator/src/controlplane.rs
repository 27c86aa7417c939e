use async_trait::async_trait;
use common::{
    ClusterDescriptor, ClusterKey, Error, KUBECONFIG_KEY, LABEL_KYMA_NAME, RegistrationRecord, Result,
    context::get_reporter, get_client_name, kyma::Kyma,
    mapping::{CompassManagerMapping, CompassManagerMappingStatus},
};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    Client, Resource,
    api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams, Preconditions},
    runtime::events::{Event, Recorder},
};
use serde_json::{Value, json};

/// Reads and writes against the control plane the reconciliation depends on.
///
/// Every "not found" comes back as `Ok(None)`; errors are real failures.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Get the Kyma descriptor of a cluster
    async fn get_descriptor(&self, key: &ClusterKey) -> Result<Option<ClusterDescriptor>>;

    /// Get the kubeconfig stored for a cluster
    ///
    /// The credential secret is found by its kyma-name label; more than one match is an integrity error.
    async fn get_credentials(&self, key: &ClusterKey) -> Result<Option<Vec<u8>>>;

    /// Get the registration record of a cluster by key
    async fn get_record(&self, key: &ClusterKey) -> Result<Option<RegistrationRecord>>;

    /// Create a record, status included
    async fn create_record(&self, record: &RegistrationRecord) -> Result<RegistrationRecord>;

    /// Replace a record (labels, guard and status) if it is still at `record.version`
    async fn replace_record(&self, record: &RegistrationRecord) -> Result<RegistrationRecord>;

    /// Delete a record at `record.version`; refused while the record is guarded
    async fn delete_record(&self, record: &RegistrationRecord) -> Result<()>;

    /// Publish an event about a record
    async fn publish(&self, key: &ClusterKey, ev: Event) -> Result<()>;
}

fn is_api_code(e: &kube::Error, code: u16) -> bool {
    matches!(e, kube::Error::Api(src) if src.code == code)
}

fn conflict_or(key: &ClusterKey, e: kube::Error) -> Error {
    if is_api_code(&e, 409) {
        Error::Conflict(key.to_string())
    } else {
        Error::KubeError(e)
    }
}

/// Kubeconfig out of the secrets labelled for a cluster
fn single_kubeconfig(key: &ClusterKey, secrets: &[Secret]) -> Result<Option<Vec<u8>>> {
    match secrets {
        [] => Ok(None),
        [secret] => Ok(secret
            .data
            .as_ref()
            .and_then(|d| d.get(KUBECONFIG_KEY))
            .map(|b| b.0.clone())),
        all => Err(Error::DuplicateCredentials(key.to_string(), all.len())),
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(get_client_name()),
        ..PatchParams::default()
    }
}

/// Labels and guard of a record, only applied at `record.version`
fn metadata_patch(record: &RegistrationRecord) -> Value {
    let mapping = record.to_mapping();
    json!({
        "metadata": {
            "resourceVersion": record.version,
            "labels": mapping.metadata.labels,
            "finalizers": mapping.metadata.finalizers.unwrap_or_default(),
        },
    })
}

fn status_patch(version: Option<String>, status: Option<CompassManagerMappingStatus>) -> Value {
    json!({
        "metadata": {"resourceVersion": version},
        "status": status,
    })
}

/// Refuse deleting a record whose guard is still set
fn check_deletable(current: &RegistrationRecord) -> Result<()> {
    if current.guarded {
        return Err(Error::DeletionGuarded(current.key.to_string()));
    }
    Ok(())
}

fn delete_params(record: &RegistrationRecord) -> DeleteParams {
    DeleteParams {
        preconditions: Some(Preconditions {
            resource_version: record.version.clone(),
            uid: None,
        }),
        ..DeleteParams::default()
    }
}

/// Releasing the guard of a terminating mapping removes it before its status can be written
fn gone_after_release(record: &RegistrationRecord, e: &kube::Error) -> bool {
    !record.guarded && is_api_code(e, 404)
}

/// `ControlPlane` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn mappings(&self, key: &ClusterKey) -> Api<CompassManagerMapping> {
        Api::namespaced(self.client.clone(), &key.namespace)
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn get_descriptor(&self, key: &ClusterKey) -> Result<Option<ClusterDescriptor>> {
        let api: Api<Kyma> = Api::namespaced(self.client.clone(), &key.namespace);
        let kyma = api.get_opt(&key.name).await.map_err(Error::KubeError)?;
        Ok(kyma.as_ref().map(ClusterDescriptor::from))
    }

    async fn get_credentials(&self, key: &ClusterKey) -> Result<Option<Vec<u8>>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &key.namespace);
        let lp = ListParams::default().labels(&format!("{}={}", LABEL_KYMA_NAME, key.name));
        let secrets = api.list(&lp).await.map_err(Error::KubeError)?;
        single_kubeconfig(key, &secrets.items)
    }

    async fn get_record(&self, key: &ClusterKey) -> Result<Option<RegistrationRecord>> {
        let mapping = self
            .mappings(key)
            .get_opt(&key.name)
            .await
            .map_err(Error::KubeError)?;
        Ok(mapping.as_ref().map(RegistrationRecord::from))
    }

    async fn create_record(&self, record: &RegistrationRecord) -> Result<RegistrationRecord> {
        let api = self.mappings(&record.key);
        let mut mapping = record.to_mapping();
        mapping.metadata.resource_version = None;
        // status is ignored on create, it goes through the subresource
        let status = mapping.status.take();
        let created = api
            .create(&PostParams::default(), &mapping)
            .await
            .map_err(|e| conflict_or(&record.key, e))?;
        let patch = Patch::Merge(status_patch(created.metadata.resource_version, status));
        let stored = api
            .patch_status(&record.key.name, &patch_params(), &patch)
            .await
            .map_err(|e| conflict_or(&record.key, e))?;
        Ok(RegistrationRecord::from(&stored))
    }

    async fn replace_record(&self, record: &RegistrationRecord) -> Result<RegistrationRecord> {
        let api = self.mappings(&record.key);
        let pp = patch_params();
        let updated = api
            .patch(&record.key.name, &pp, &Patch::Merge(metadata_patch(record)))
            .await
            .map_err(|e| conflict_or(&record.key, e))?;
        let patch = Patch::Merge(status_patch(
            updated.metadata.resource_version.clone(),
            record.to_mapping().status,
        ));
        match api.patch_status(&record.key.name, &pp, &patch).await {
            Ok(stored) => Ok(RegistrationRecord::from(&stored)),
            Err(e) if gone_after_release(record, &e) => Ok(RegistrationRecord::from(&updated)),
            Err(e) => Err(conflict_or(&record.key, e)),
        }
    }

    async fn delete_record(&self, record: &RegistrationRecord) -> Result<()> {
        let current = match self.get_record(&record.key).await? {
            Some(current) => current,
            None => return Ok(()),
        };
        check_deletable(&current)?;
        match self
            .mappings(&record.key)
            .delete(&record.key.name, &delete_params(record))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_api_code(&e, 404) => Ok(()),
            Err(e) => Err(conflict_or(&record.key, e)),
        }
    }

    async fn publish(&self, key: &ClusterKey, ev: Event) -> Result<()> {
        let mapping = match self.mappings(key).get_opt(&key.name).await.map_err(Error::KubeError)? {
            Some(m) => m,
            None => return Ok(()),
        };
        let recorder = Recorder::new(self.client.clone(), get_reporter(), mapping.object_ref(&()));
        match recorder.publish(ev).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(src)) => {
                tracing::warn!("Ignoring {:?} while sending an event", src);
                Ok(())
            }
            Err(e) => Err(Error::KubeError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Status;
    use k8s_openapi::ByteString;
    use kube::core::ErrorResponse;
    use std::collections::BTreeMap;

    fn key() -> ClusterKey {
        ClusterKey::new("kcp-system", "kyma-a")
    }

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "test".to_string(),
            code,
        })
    }

    fn kubeconfig_secret(data: &[u8]) -> Secret {
        Secret {
            data: Some(BTreeMap::from([(KUBECONFIG_KEY.to_string(), ByteString(data.to_vec()))])),
            ..Secret::default()
        }
    }

    fn record(guarded: bool) -> RegistrationRecord {
        RegistrationRecord {
            key: key(),
            kyma_name: "kyma-a".to_string(),
            runtime_id: "id-X".to_string(),
            global_account: Some("ga-1".to_string()),
            guarded,
            status: Status::REGISTERED,
            version: Some("42".to_string()),
            ..RegistrationRecord::default()
        }
    }

    #[test]
    fn test_conflict_status_is_mapped() {
        assert!(matches!(conflict_or(&key(), api_error(409)), Error::Conflict(_)));
        assert!(matches!(conflict_or(&key(), api_error(500)), Error::KubeError(_)));
    }

    #[test]
    fn test_kubeconfig_secret_count() {
        assert_eq!(single_kubeconfig(&key(), &[]).unwrap(), None);
        assert_eq!(
            single_kubeconfig(&key(), &[kubeconfig_secret(b"kubeconfig-data-X")]).unwrap(),
            Some(b"kubeconfig-data-X".to_vec())
        );
        assert_eq!(single_kubeconfig(&key(), &[Secret::default()]).unwrap(), None);
        let err = single_kubeconfig(&key(), &[kubeconfig_secret(b"a"), kubeconfig_secret(b"b")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateCredentials(_, 2)));
    }

    #[test]
    fn test_writes_carry_resource_version() {
        let patch = metadata_patch(&record(true));
        assert_eq!(patch["metadata"]["resourceVersion"], "42");
        assert_eq!(patch["metadata"]["labels"]["kyma-project.io/compass-runtime-id"], "id-X");
        assert_eq!(
            patch["metadata"]["finalizers"],
            json!(["compass-manager.kyma-project.io/deregistration"])
        );

        let patch = status_patch(Some("43".to_string()), Some(Status::REGISTERED.into()));
        assert_eq!(patch["metadata"]["resourceVersion"], "43");
        assert_eq!(patch["status"]["registered"], true);

        let dp = delete_params(&record(false));
        assert_eq!(
            dp.preconditions.and_then(|p| p.resource_version).as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_release_clears_finalizers() {
        let patch = metadata_patch(&record(false));
        assert_eq!(patch["metadata"]["finalizers"], json!([]));
    }

    #[test]
    fn test_guarded_record_is_not_deletable() {
        assert!(matches!(check_deletable(&record(true)), Err(Error::DeletionGuarded(_))));
        assert!(check_deletable(&record(false)).is_ok());
    }

    #[test]
    fn test_terminating_mapping_gone_after_release() {
        assert!(gone_after_release(&record(false), &api_error(404)));
        assert!(!gone_after_release(&record(true), &api_error(404)));
        assert!(!gone_after_release(&record(false), &api_error(409)));
    }

    #[test]
    fn test_field_manager_is_set() {
        assert_eq!(patch_params().field_manager, Some(get_client_name()));
    }
}
