use crate::{
    ANNOTATION_ID_FOR_MIGRATION, LABEL_BROKER_INSTANCE_ID, LABEL_BROKER_PLAN_ID, LABEL_BROKER_PLAN_NAME,
    LABEL_GLOBAL_ACCOUNT_ID, LABEL_KYMA_NAME, LABEL_SHOOT_NAME, LABEL_SUBACCOUNT_ID, MANAGED_BY,
    kyma::Kyma,
};
use kube::ResourceExt;
use std::{collections::BTreeMap, fmt};

/// Identity shared by a Kyma and its mapping
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterKey {
    pub namespace: String,
    pub name: String,
}

impl ClusterKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn from_resource<K: ResourceExt>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The parts of a Kyma the reconciliation reads
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ClusterDescriptor {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub modules: Vec<String>,
    pub deleting: bool,
}

impl ClusterDescriptor {
    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(&self.namespace, &self.name)
    }

    fn label(&self, key: &str) -> String {
        self.labels.get(key).cloned().unwrap_or_default()
    }

    pub fn global_account(&self) -> String {
        self.label(LABEL_GLOBAL_ACCOUNT_ID)
    }

    pub fn subaccount(&self) -> String {
        self.label(LABEL_SUBACCOUNT_ID)
    }

    /// Value of the kyma-name label, falling back to the object name
    pub fn kyma_name(&self) -> String {
        self.labels
            .get(LABEL_KYMA_NAME)
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| self.name.clone())
    }

    /// Runtime id registered out-of-band, if the migration annotation is set
    pub fn migration_runtime_id(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_ID_FOR_MIGRATION).map(String::as_str)
    }

    /// Labels attached to the runtime when registering it in the director
    pub fn runtime_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("director_connection_managed_by".to_string(), MANAGED_BY.to_string()),
            ("broker_instance_id".to_string(), self.label(LABEL_BROKER_INSTANCE_ID)),
            ("gardenerClusterName".to_string(), self.label(LABEL_SHOOT_NAME)),
            ("subaccount_id".to_string(), self.label(LABEL_SUBACCOUNT_ID)),
            ("global_account_id".to_string(), self.label(LABEL_GLOBAL_ACCOUNT_ID)),
            ("broker_plan_id".to_string(), self.label(LABEL_BROKER_PLAN_ID)),
            ("broker_plan_name".to_string(), self.label(LABEL_BROKER_PLAN_NAME)),
        ])
    }
}

impl From<&Kyma> for ClusterDescriptor {
    fn from(kyma: &Kyma) -> Self {
        Self {
            namespace: kyma.namespace().unwrap_or_default(),
            name: kyma.name_any(),
            labels: kyma.labels().clone(),
            annotations: kyma.annotations().clone(),
            modules: kyma.spec.modules.iter().map(|m| m.name.clone()).collect(),
            deleting: kyma.metadata.deletion_timestamp.is_some(),
        }
    }
}
