//! In-memory store for tests and embedded use.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use cordon_core::{ApprovalId, RunId, RunStatus, SpaceId, SpaceStatus};

use crate::error::{StorageError, StorageResult};
use crate::record::{ApprovalRecord, RunRecord, SpaceRecord};
use crate::traits::{ApprovalStore, RunStore, SpaceStore};

/// Map-backed implementation of all three store traits.
///
/// Insertion order is preserved per listing by sorting on creation time,
/// matching what an indexed backend would return.
#[derive(Debug, Default)]
pub struct MemoryStore {
    spaces: RwLock<HashMap<SpaceId, SpaceRecord>>,
    runs: RwLock<HashMap<RunId, RunRecord>>,
    approvals: RwLock<HashMap<ApprovalId, ApprovalRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn insert_space(&self, record: &SpaceRecord) -> StorageResult<()> {
        let mut spaces = self.spaces.write().await;
        if spaces.contains_key(&record.id) {
            return Err(StorageError::Conflict(record.id.to_string()));
        }
        spaces.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_space(&self, id: &SpaceId) -> StorageResult<Option<SpaceRecord>> {
        Ok(self.spaces.read().await.get(id).cloned())
    }

    async fn list_spaces(&self, status: Option<SpaceStatus>) -> StorageResult<Vec<SpaceRecord>> {
        let spaces = self.spaces.read().await;
        let mut records: Vec<SpaceRecord> = spaces
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn update_space(&self, record: &SpaceRecord) -> StorageResult<()> {
        let mut spaces = self.spaces.write().await;
        match spaces.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(record.id.to_string())),
        }
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn insert_run(&self, record: &RunRecord) -> StorageResult<()> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&record.id) {
            return Err(StorageError::Conflict(record.id.to_string()));
        }
        runs.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_run(&self, id: &RunId) -> StorageResult<Option<RunRecord>> {
        Ok(self.runs.read().await.get(id).cloned())
    }

    async fn list_runs(
        &self,
        space_id: &SpaceId,
        status: Option<RunStatus>,
    ) -> StorageResult<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let mut records: Vec<RunRecord> = runs
            .values()
            .filter(|r| &r.space_id == space_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.started_at);
        Ok(records)
    }

    async fn update_run(&self, record: &RunRecord) -> StorageResult<()> {
        let mut runs = self.runs.write().await;
        match runs.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(record.id.to_string())),
        }
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn insert_approval(&self, record: &ApprovalRecord) -> StorageResult<()> {
        let mut approvals = self.approvals.write().await;
        if approvals.contains_key(&record.id) {
            return Err(StorageError::Conflict(record.id.to_string()));
        }
        approvals.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_approval(&self, id: &ApprovalId) -> StorageResult<Option<ApprovalRecord>> {
        Ok(self.approvals.read().await.get(id).cloned())
    }

    async fn list_approvals_for_run(&self, run_id: &RunId) -> StorageResult<Vec<ApprovalRecord>> {
        let approvals = self.approvals.read().await;
        let mut records: Vec<ApprovalRecord> = approvals
            .values()
            .filter(|r| &r.run_id == run_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn list_approvals_for_space(
        &self,
        space_id: &SpaceId,
    ) -> StorageResult<Vec<ApprovalRecord>> {
        let approvals = self.approvals.read().await;
        let mut records: Vec<ApprovalRecord> = approvals
            .values()
            .filter(|r| &r.space_id == space_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn update_approval(&self, record: &ApprovalRecord) -> StorageResult<()> {
        let mut approvals = self.approvals.write().await;
        match approvals.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(record.id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cordon_policy::{PolicyOverrides, PolicyPreset};

    fn space_record() -> SpaceRecord {
        SpaceRecord {
            id: SpaceId::generate(),
            name: "test".to_string(),
            description: None,
            status: SpaceStatus::Ready,
            policy: PolicyPreset::Standard,
            policy_overrides: PolicyOverrides::default(),
            workspace_path: "/tmp/ws".into(),
            capabilities: Vec::new(),
            env: HashMap::new(),
            metadata: None,
            created_at: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_space_insert_get_update() {
        let store = MemoryStore::new();
        let mut record = space_record();
        store.insert_space(&record).await.unwrap();

        let fetched = store.get_space(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "test");

        record.status = SpaceStatus::Destroyed;
        store.update_space(&record).await.unwrap();
        let fetched = store.get_space(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SpaceStatus::Destroyed);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        let record = space_record();
        store.insert_space(&record).await.unwrap();
        assert!(matches!(
            store.insert_space(&record).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_space(&space_record()).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_spaces_filters_by_status() {
        let store = MemoryStore::new();
        let mut a = space_record();
        a.status = SpaceStatus::Ready;
        let mut b = space_record();
        b.status = SpaceStatus::Destroyed;
        store.insert_space(&a).await.unwrap();
        store.insert_space(&b).await.unwrap();

        let ready = store.list_spaces(Some(SpaceStatus::Ready)).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, a.id);
        assert_eq!(store.list_spaces(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_runs_scoped_to_space() {
        let store = MemoryStore::new();
        let space_a = SpaceId::generate();
        let space_b = SpaceId::generate();
        for space_id in [&space_a, &space_a, &space_b] {
            let record = RunRecord {
                id: RunId::generate(),
                space_id: space_id.clone(),
                status: RunStatus::Completed,
                operations: Vec::new(),
                events: Vec::new(),
                pending_approval: None,
                started_at: Utc::now(),
                completed_at: None,
            };
            store.insert_run(&record).await.unwrap();
        }
        assert_eq!(store.list_runs(&space_a, None).await.unwrap().len(), 2);
        assert_eq!(store.list_runs(&space_b, None).await.unwrap().len(), 1);
    }
}
