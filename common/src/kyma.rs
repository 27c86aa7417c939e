use crate::APPLICATION_CONNECTOR_MODULE;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kyma cluster descriptor, owned by the lifecycle manager.
///
/// Only the fields read by the compass manager are modelled; everything else
/// in the object is ignored on deserialization.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    kind = "Kyma",
    group = "operator.kyma-project.io",
    version = "v1beta2",
    namespaced
)]
pub struct KymaSpec {
    /// Release channel
    #[serde(default)]
    pub channel: String,
    /// Modules enabled on the runtime
    #[serde(default)]
    pub modules: Vec<KymaModule>,
}

/// A module enabled on a Kyma runtime
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KymaModule {
    pub name: String,
    pub channel: Option<String>,
}

impl Kyma {
    pub fn has_module(&self, name: &str) -> bool {
        self.spec.modules.iter().any(|m| m.name == name)
    }

    pub fn has_application_connector(&self) -> bool {
        self.has_module(APPLICATION_CONNECTOR_MODULE)
    }
}
