use async_trait::async_trait;
use common::Result;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

#[cfg(test)]
use mockall::automock;

/// Registration of runtimes in the compass director.
///
/// Implementations own their retry policy; the reconciliation calls each
/// method at most once per pass.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Registrator: Send + Sync {
    /// Create the runtime in the director and return its id
    async fn register(&self, labels: &BTreeMap<String, String>) -> Result<String>;

    /// Delete the runtime from the director
    async fn deregister(&self, runtime_id: &str, global_account: &str) -> Result<()>;
}

/// Installation of the compass runtime agent credentials in a runtime.
///
/// Must be idempotent: calling it again with the same inputs leaves the runtime unchanged.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Configurator: Send + Sync {
    async fn configure(&self, kubeconfig: &[u8], runtime_id: &str, global_account: &str) -> Result<()>;
}

/// Collaborator that only logs what it would do
#[derive(Clone, Debug, Default)]
pub struct DryRunner;

fn random_runtime_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32])
}

#[async_trait]
impl Registrator for DryRunner {
    async fn register(&self, labels: &BTreeMap<String, String>) -> Result<String> {
        let runtime_id = random_runtime_id();
        info!(
            "[DRY] Register runtime {} for GA {}",
            runtime_id,
            labels.get("global_account_id").map(String::as_str).unwrap_or_default()
        );
        Ok(runtime_id)
    }

    async fn deregister(&self, runtime_id: &str, global_account: &str) -> Result<()> {
        info!("[DRY] Deregister runtime {runtime_id} for GA {global_account}");
        Ok(())
    }
}

#[async_trait]
impl Configurator for DryRunner {
    async fn configure(&self, _kubeconfig: &[u8], runtime_id: &str, global_account: &str) -> Result<()> {
        info!("[DRY] Configure runtime {runtime_id} for GA {global_account}");
        Ok(())
    }
}
