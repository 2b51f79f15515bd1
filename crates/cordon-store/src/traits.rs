//! Async store traits a persistence backend implements.
//!
//! Each write is a single statement from the caller's point of view. The
//! run resume path is a read–modify–write; serializing it per run id is
//! the caller's responsibility (the runtime's per-space gate covers it).

use async_trait::async_trait;

use cordon_core::{ApprovalId, RunId, RunStatus, SpaceId, SpaceStatus};

use crate::error::StorageResult;
use crate::record::{ApprovalRecord, RunRecord, SpaceRecord};

/// Persistence for space records.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// Insert a new space record.
    async fn insert_space(&self, record: &SpaceRecord) -> StorageResult<()>;

    /// Fetch a space by id, tombstones included.
    async fn get_space(&self, id: &SpaceId) -> StorageResult<Option<SpaceRecord>>;

    /// List spaces, optionally filtered by status.
    async fn list_spaces(&self, status: Option<SpaceStatus>) -> StorageResult<Vec<SpaceRecord>>;

    /// Replace an existing space record.
    async fn update_space(&self, record: &SpaceRecord) -> StorageResult<()>;
}

/// Persistence for run records.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a new run record.
    async fn insert_run(&self, record: &RunRecord) -> StorageResult<()>;

    /// Fetch a run by id.
    async fn get_run(&self, id: &RunId) -> StorageResult<Option<RunRecord>>;

    /// List a space's runs, optionally filtered by status.
    async fn list_runs(
        &self,
        space_id: &SpaceId,
        status: Option<RunStatus>,
    ) -> StorageResult<Vec<RunRecord>>;

    /// Replace an existing run record.
    async fn update_run(&self, record: &RunRecord) -> StorageResult<()>;
}

/// Persistence for approval records.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Insert a new approval record.
    async fn insert_approval(&self, record: &ApprovalRecord) -> StorageResult<()>;

    /// Fetch an approval by id.
    async fn get_approval(&self, id: &ApprovalId) -> StorageResult<Option<ApprovalRecord>>;

    /// List approvals created by a run.
    async fn list_approvals_for_run(&self, run_id: &RunId) -> StorageResult<Vec<ApprovalRecord>>;

    /// List approvals across a space.
    async fn list_approvals_for_space(
        &self,
        space_id: &SpaceId,
    ) -> StorageResult<Vec<ApprovalRecord>>;

    /// Replace an existing approval record.
    async fn update_approval(&self, record: &ApprovalRecord) -> StorageResult<()>;
}
