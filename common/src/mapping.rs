use crate::{State, Status};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mirror of a Kyma runtime in the compass director
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    kind = "CompassManagerMapping",
    status = "CompassManagerMappingStatus",
    shortname = "cmm",
    group = "operator.kyma-project.io",
    version = "v1beta1",
    namespaced
)]
#[kube(
    doc = "Custom resource tracking the compass registration of a Kyma runtime",
    printcolumn = r#"
    {"name":"runtime",    "type":"string",  "description":"Compass runtime id", "jsonPath":".metadata.labels.kyma-project\\.io/compass-runtime-id"},
    {"name":"registered", "type":"boolean", "description":"Registered in compass", "jsonPath":".status.registered"},
    {"name":"configured", "type":"boolean", "description":"Runtime agent configured", "jsonPath":".status.configured"},
    {"name":"state",      "type":"string",  "description":"State", "jsonPath":".status.state"}"#
)]
pub struct CompassManagerMappingSpec {}

/// The status object of `CompassManagerMapping`
///
/// Consumed by dashboards and alerts: field names and state labels must not change.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct CompassManagerMappingStatus {
    /// Runtime is registered in compass
    pub registered: bool,
    /// Compass runtime agent is configured on the runtime
    pub configured: bool,
    /// One of Ready, Processing, Failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
}

impl From<Status> for CompassManagerMappingStatus {
    fn from(status: Status) -> Self {
        Self {
            registered: status.registered,
            configured: status.configured,
            state: Some(status.state()),
        }
    }
}

impl From<&CompassManagerMappingStatus> for Status {
    fn from(status: &CompassManagerMappingStatus) -> Self {
        let state = status.state.map(|s| s.as_str()).unwrap_or_default();
        Status::parse(state, status.registered, status.configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let status = CompassManagerMappingStatus::from(Status::REGISTERED | Status::FAILED);
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({"registered": true, "configured": false, "state": "Failed"})
        );
    }

    #[test]
    fn test_status_without_state() {
        let status: CompassManagerMappingStatus =
            serde_json::from_value(serde_json::json!({"registered": true, "configured": true})).unwrap();
        assert_eq!(status.state, None);
        assert_eq!(Status::from(&status), Status::REGISTERED | Status::CONFIGURED);
    }

    #[test]
    fn test_processing_survives_storage() {
        let status: CompassManagerMappingStatus =
            serde_json::from_value(serde_json::json!({"registered": false, "configured": false, "state": "Processing"}))
                .unwrap();
        assert_eq!(Status::from(&status), Status::PROCESSING);
    }
}
