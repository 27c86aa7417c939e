//! Deletion guard of registration records.
//!
//! Records are created guarded. The guard is released only once the runtime
//! is known to be gone from the director (or was never registered), and the
//! store refuses to delete a record while it is guarded.

use crate::accessor::ClusterState;
use common::Result;

/// Release the guard then delete the record.
///
/// Callers must only get here after a successful deregistration, or for a
/// record that never got a runtime id.
pub async fn release_and_delete(state: &mut ClusterState<'_>) -> Result<()> {
    let record = match state.get_registration_record().await? {
        Some(record) => record,
        None => return Ok(()),
    };
    if record.guarded {
        let mut released = record;
        released.guarded = false;
        state.replace_registration_record(&released).await?;
    }
    state.delete_registration_record().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeControlPlane;
    use common::{ClusterKey, Error, Status};

    fn key() -> ClusterKey {
        ClusterKey::new("kcp-system", "kyma-a")
    }

    #[tokio::test]
    async fn test_release_then_delete() {
        let cp = FakeControlPlane::default();
        cp.add_kyma(&key(), &[], &[]);
        let mut state = ClusterState::new(&cp, key());
        state.create_registration_record("id-Y", Status::REGISTERED).await.unwrap();
        release_and_delete(&mut state).await.unwrap();
        assert!(cp.record(&key()).is_none());
        assert_eq!(cp.writes(), vec!["create", "unguard", "delete"]);
    }

    #[tokio::test]
    async fn test_release_without_record() {
        let cp = FakeControlPlane::default();
        let mut state = ClusterState::new(&cp, key());
        release_and_delete(&mut state).await.unwrap();
        assert!(cp.writes().is_empty());
    }

    #[tokio::test]
    async fn test_store_refuses_guarded_delete() {
        let cp = FakeControlPlane::default();
        cp.add_kyma(&key(), &[], &[]);
        let mut state = ClusterState::new(&cp, key());
        state.create_registration_record("id-Y", Status::REGISTERED).await.unwrap();
        // bypass the guard helpers entirely
        let err = state.delete_registration_record().await.unwrap_err();
        assert!(matches!(err, Error::DeletionGuarded(_)));
    }
}
