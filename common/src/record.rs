use crate::{
    ClusterDescriptor, ClusterKey, LABEL_COMPASS_ID, LABEL_GLOBAL_ACCOUNT_ID, LABEL_KYMA_NAME,
    LABEL_MANAGED_BY, LABEL_SUBACCOUNT_ID, MANAGED_BY, Status,
    mapping::{CompassManagerMapping, CompassManagerMappingSpec},
};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Finalizer standing for the deletion guard on a stored mapping
pub static GUARD_FINALIZER: &str = "compass-manager.kyma-project.io/deregistration";

/// Registration record of a Kyma runtime, as seen by the reconciliation.
///
/// An empty `runtime_id` means the runtime is not registered yet. `version`
/// is the store revision the record was read at; writes carrying a stale
/// version are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RegistrationRecord {
    pub key: ClusterKey,
    pub kyma_name: String,
    pub runtime_id: String,
    pub global_account: Option<String>,
    pub subaccount: Option<String>,
    pub managed_by: String,
    pub guarded: bool,
    pub status: Status,
    pub version: Option<String>,
}

impl RegistrationRecord {
    /// Fresh, guarded record for a descriptor
    pub fn for_descriptor(desc: &ClusterDescriptor, runtime_id: &str) -> Self {
        let mut record = Self {
            key: desc.key(),
            guarded: true,
            ..Default::default()
        };
        record.sync_with(desc, runtime_id);
        record
    }

    /// Overwrite the descriptor-derived attributes and the runtime id, keeping guard, status and version
    pub fn sync_with(&mut self, desc: &ClusterDescriptor, runtime_id: &str) {
        self.kyma_name = desc.kyma_name();
        self.runtime_id = runtime_id.to_string();
        self.global_account = Some(desc.global_account()).filter(|ga| !ga.is_empty());
        self.subaccount = Some(desc.subaccount()).filter(|sa| !sa.is_empty());
        self.managed_by = MANAGED_BY.to_string();
    }

    pub fn is_registered(&self) -> bool {
        !self.runtime_id.is_empty()
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (LABEL_KYMA_NAME.to_string(), self.kyma_name.clone()),
            (LABEL_COMPASS_ID.to_string(), self.runtime_id.clone()),
            (LABEL_MANAGED_BY.to_string(), self.managed_by.clone()),
        ]);
        if let Some(ga) = &self.global_account {
            labels.insert(LABEL_GLOBAL_ACCOUNT_ID.to_string(), ga.clone());
        }
        if let Some(sa) = &self.subaccount {
            labels.insert(LABEL_SUBACCOUNT_ID.to_string(), sa.clone());
        }
        labels
    }

    /// Stored form of the record, status included
    pub fn to_mapping(&self) -> CompassManagerMapping {
        let mut mapping = CompassManagerMapping::new(&self.key.name, CompassManagerMappingSpec {});
        mapping.metadata.namespace = Some(self.key.namespace.clone());
        mapping.metadata.labels = Some(self.labels());
        mapping.metadata.resource_version = self.version.clone();
        if self.guarded {
            mapping.metadata.finalizers = Some(vec![GUARD_FINALIZER.to_string()]);
        }
        mapping.status = Some(self.status.into());
        mapping
    }
}

impl From<&CompassManagerMapping> for RegistrationRecord {
    fn from(mapping: &CompassManagerMapping) -> Self {
        let labels = mapping.labels();
        Self {
            key: ClusterKey::from_resource(mapping),
            kyma_name: labels.get(LABEL_KYMA_NAME).cloned().unwrap_or_default(),
            runtime_id: labels.get(LABEL_COMPASS_ID).cloned().unwrap_or_default(),
            global_account: labels.get(LABEL_GLOBAL_ACCOUNT_ID).filter(|ga| !ga.is_empty()).cloned(),
            subaccount: labels.get(LABEL_SUBACCOUNT_ID).filter(|sa| !sa.is_empty()).cloned(),
            managed_by: labels.get(LABEL_MANAGED_BY).cloned().unwrap_or_default(),
            guarded: mapping.finalizers().iter().any(|f| f == GUARD_FINALIZER),
            status: mapping.status.as_ref().map(Status::from).unwrap_or_default(),
            version: mapping.metadata.resource_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ClusterDescriptor {
        ClusterDescriptor {
            namespace: "kcp-system".to_string(),
            name: "kyma-a".to_string(),
            labels: BTreeMap::from([
                (LABEL_GLOBAL_ACCOUNT_ID.to_string(), "ga-1".to_string()),
                (LABEL_SUBACCOUNT_ID.to_string(), "sa-1".to_string()),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_record_is_guarded_and_unregistered() {
        let record = RegistrationRecord::for_descriptor(&descriptor(), "");
        assert!(record.guarded);
        assert!(!record.is_registered());
        assert_eq!(record.global_account.as_deref(), Some("ga-1"));
        assert_eq!(record.managed_by, "compass-manager");
        assert_eq!(record.kyma_name, "kyma-a");
    }

    #[test]
    fn test_mapping_conversion_keeps_guard_and_status() {
        let mut record = RegistrationRecord::for_descriptor(&descriptor(), "id-X");
        record.status = Status::REGISTERED | Status::FAILED;
        record.version = Some("42".to_string());
        let mapping = record.to_mapping();
        assert_eq!(mapping.finalizers(), &[GUARD_FINALIZER.to_string()]);
        assert_eq!(mapping.labels()[LABEL_COMPASS_ID], "id-X");
        let back = RegistrationRecord::from(&mapping);
        assert_eq!(back.runtime_id, "id-X");
        assert!(back.guarded);
        assert_eq!(back.status, Status::REGISTERED | Status::FAILED);
        assert_eq!(back.version.as_deref(), Some("42"));
    }

    #[test]
    fn test_mapping_without_global_account() {
        let mut mapping = CompassManagerMapping::new("kyma-a", CompassManagerMappingSpec {});
        mapping.metadata.namespace = Some("kcp-system".to_string());
        mapping.metadata.labels = Some(BTreeMap::from([(LABEL_COMPASS_ID.to_string(), "id-Y".to_string())]));
        let record = RegistrationRecord::from(&mapping);
        assert_eq!(record.global_account, None);
        assert!(!record.guarded);
        assert_eq!(record.status, Status::EMPTY);
    }
}
