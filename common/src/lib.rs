use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("K8s error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Error from director: {0}")]
    DirectorError(String),

    #[error("Runtime agent configuration failed: {0}")]
    ConfiguratorError(String),

    #[error("Compass Mapping for {0} has no Global Account")]
    MissingGlobalAccount(String),

    #[error("{1} credential secrets are labelled for {0}")]
    DuplicateCredentials(String, usize),

    #[error("Compass Mapping for {0} was modified concurrently")]
    Conflict(String),

    #[error("Compass Mapping for {0} is still guarded against deletion")]
    DeletionGuarded(String),

    #[error("Error: {0}")]
    Other(String),
}
impl Error {
    pub fn metric_label(&self) -> String {
        format!("{self:?}")
            .split('(')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    /// True for failures reported by the external directory or the runtime agent configurator
    pub fn is_external(&self) -> bool {
        matches!(self, Error::DirectorError(_) | Error::ConfiguratorError(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod cluster;
pub mod context;
pub mod kyma;
pub mod mapping;
pub mod record;
pub mod status;

pub use cluster::{ClusterDescriptor, ClusterKey};
pub use context::get_client_name;
pub use record::RegistrationRecord;
pub use status::{State, Status};

/// Annotation holding a runtime id registered out-of-band
pub static ANNOTATION_ID_FOR_MIGRATION: &str = "compass-runtime-id-for-migration";

pub static LABEL_BROKER_INSTANCE_ID: &str = "kyma-project.io/instance-id";
pub static LABEL_BROKER_PLAN_ID: &str = "kyma-project.io/broker-plan-id";
pub static LABEL_BROKER_PLAN_NAME: &str = "kyma-project.io/broker-plan-name";
pub static LABEL_COMPASS_ID: &str = "kyma-project.io/compass-runtime-id";
pub static LABEL_GLOBAL_ACCOUNT_ID: &str = "kyma-project.io/global-account-id";
pub static LABEL_KYMA_NAME: &str = "operator.kyma-project.io/kyma-name";
pub static LABEL_MANAGED_BY: &str = "operator.kyma-project.io/managed-by";
pub static LABEL_SHOOT_NAME: &str = "kyma-project.io/shoot-name";
pub static LABEL_SUBACCOUNT_ID: &str = "kyma-project.io/subaccount-id";

/// Value of the managed-by label on every mapping we own
pub static MANAGED_BY: &str = "compass-manager";

/// Kyma module that opts a cluster into runtime registration
pub static APPLICATION_CONNECTOR_MODULE: &str = "applicationconnector";

/// Key of the kubeconfig inside the credential secret
pub static KUBECONFIG_KEY: &str = "config";
