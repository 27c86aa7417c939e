//! Which Kyma notifications reach the orchestrator.
//!
//! Unchanged objects are already dropped by the generation, label and
//! annotation predicates of the watch stream.

use common::kyma::Kyma;

/// Create and update notifications only matter for runtimes using the application connector
pub fn should_reconcile(kyma: &Kyma) -> bool {
    kyma.has_application_connector()
}

/// Every deletion is followed up, whatever modules the Kyma had
pub fn should_finalize(_kyma: &Kyma) -> bool {
    true
}
