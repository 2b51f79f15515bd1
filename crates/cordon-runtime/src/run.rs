//! The run service: persist, invoke, resume, cancel.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use cordon_core::{ApprovalStatus, RunId, RunStatus, SpaceId};
use cordon_executor::{ExecutionStatus, ResumeDecision, RunExecutor};
use cordon_protocol::Operation;
use cordon_store::{ApprovalRecord, ApprovalStore, RunRecord, RunStore};

use crate::error::{RuntimeError, RuntimeResult};
use crate::space::SpaceManager;

/// A resume request as received at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    /// The decision being applied.
    pub approval: ApprovalRequest,
}

/// The decision body of a resume request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Must match the run's pending operation id.
    pub operation_id: String,
    /// Approve or deny.
    pub decision: ApprovalVerdict,
    /// The decider's reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A human verdict on a gated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalVerdict {
    /// Execute the gated operation.
    Approved,
    /// Skip the gated operation.
    Denied,
}

/// Persists runs and orchestrates executor invocations.
///
/// Runs within one space serialize on the space's gate; the gate is taken
/// before the executor is invoked and held until the record is persisted.
pub struct RunService {
    spaces: Arc<SpaceManager>,
    runs: Arc<dyn RunStore>,
    approvals: Arc<dyn ApprovalStore>,
}

impl RunService {
    /// Wire the service to its collaborators.
    #[must_use]
    pub fn new(
        spaces: Arc<SpaceManager>,
        runs: Arc<dyn RunStore>,
        approvals: Arc<dyn ApprovalStore>,
    ) -> Self {
        Self {
            spaces,
            runs,
            approvals,
        }
    }

    /// Execute a batch of validated operations in a space.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when the space is not live,
    /// or a storage error; per-operation failures are events, not errors.
    pub async fn create(
        &self,
        space_id: &SpaceId,
        operations: Vec<Operation>,
    ) -> RuntimeResult<RunRecord> {
        let handle = self.spaces.handle(space_id).await?;
        let run_id = RunId::generate();
        let started_at = Utc::now();

        let _gate = handle.run_gate.lock().await;
        let executor = RunExecutor::new(handle.policy.as_ref(), handle.sandbox.driver());
        let outcome = executor.execute(&operations, 0, false).await;

        let (status, completed_at) = match outcome.status {
            ExecutionStatus::Completed => (RunStatus::Completed, Some(Utc::now())),
            ExecutionStatus::AwaitingApproval => (RunStatus::AwaitingApproval, None),
        };

        let record = RunRecord {
            id: run_id.clone(),
            space_id: space_id.clone(),
            status,
            operations,
            events: outcome.events,
            pending_approval: outcome.pending_approval,
            started_at,
            completed_at,
        };
        self.runs.insert_run(&record).await?;

        if let Some(pending) = &record.pending_approval {
            let approval = ApprovalRecord::pending(
                space_id.clone(),
                run_id.clone(),
                pending,
                Some(started_at + chrono::Duration::hours(12)),
            );
            self.approvals.insert_approval(&approval).await?;
            info!(
                run_id = %run_id,
                operation_id = %pending.operation_id,
                "run suspended awaiting approval"
            );
        } else {
            info!(run_id = %run_id, status = %record.status, "run finished");
        }

        Ok(record)
    }

    /// Apply an approval decision to a suspended run.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::RunNotFound`] for an unknown run,
    /// [`RuntimeError::RunNotSuspended`] when the run is not awaiting
    /// approval, and [`RuntimeError::ApprovalMismatch`] when the decision
    /// names a different operation.
    pub async fn resume(
        &self,
        run_id: &RunId,
        request: ApprovalRequest,
    ) -> RuntimeResult<RunRecord> {
        let mut record = self.get(run_id).await?;
        if record.status != RunStatus::AwaitingApproval {
            return Err(RuntimeError::RunNotSuspended {
                run_id: run_id.to_string(),
                status: record.status.to_string(),
            });
        }
        let pending = record.pending_approval.clone().ok_or_else(|| {
            RuntimeError::RunNotSuspended {
                run_id: run_id.to_string(),
                status: record.status.to_string(),
            }
        })?;
        if pending.operation_id != request.operation_id {
            return Err(RuntimeError::ApprovalMismatch {
                operation_id: request.operation_id,
            });
        }

        let handle = self.spaces.handle(&record.space_id).await?;
        let _gate = handle.run_gate.lock().await;

        let decision = match request.decision {
            ApprovalVerdict::Approved => ResumeDecision::Approved,
            ApprovalVerdict::Denied => ResumeDecision::Denied {
                reason: request.reason.clone(),
            },
        };
        let executor = RunExecutor::new(handle.policy.as_ref(), handle.sandbox.driver());
        let outcome = executor
            .resume(&record.operations, &pending.operation_id, decision)
            .await
            .ok_or_else(|| RuntimeError::ApprovalMismatch {
                operation_id: pending.operation_id.clone(),
            })?;

        record.events.extend(outcome.events);
        match outcome.status {
            ExecutionStatus::Completed => {
                record.status = RunStatus::Completed;
                record.pending_approval = None;
                record.completed_at = Some(Utc::now());
            }
            ExecutionStatus::AwaitingApproval => {
                record.status = RunStatus::AwaitingApproval;
                record.pending_approval = outcome.pending_approval.clone();
            }
        }
        self.runs.update_run(&record).await?;

        self.resolve_approval(run_id, &pending.operation_id, &request)
            .await?;

        // A later gate in the same batch opens its own approval record.
        if let Some(next) = &record.pending_approval {
            let approval = ApprovalRecord::pending(
                record.space_id.clone(),
                run_id.clone(),
                next,
                Some(Utc::now() + chrono::Duration::hours(12)),
            );
            self.approvals.insert_approval(&approval).await?;
        }

        info!(run_id = %run_id, status = %record.status, "run resumed");
        Ok(record)
    }

    /// Mark a non-terminal run cancelled. No further resume is accepted.
    ///
    /// A run mid-exec is not interrupted; cancellation is advisory for
    /// persistence.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::RunNotCancellable`] for terminal runs.
    pub async fn cancel(&self, run_id: &RunId) -> RuntimeResult<RunRecord> {
        let mut record = self.get(run_id).await?;
        if record.status.is_terminal() {
            return Err(RuntimeError::RunNotCancellable {
                run_id: run_id.to_string(),
                status: record.status.to_string(),
            });
        }
        record.status = RunStatus::Cancelled;
        record.completed_at = Some(Utc::now());
        self.runs.update_run(&record).await?;
        info!(run_id = %run_id, "run cancelled");
        Ok(record)
    }

    /// Fetch a run by id.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::RunNotFound`] for an unknown run.
    pub async fn get(&self, run_id: &RunId) -> RuntimeResult<RunRecord> {
        self.runs
            .get_run(run_id)
            .await?
            .ok_or_else(|| RuntimeError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    /// List a space's runs, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the store fails.
    pub async fn list(
        &self,
        space_id: &SpaceId,
        status: Option<RunStatus>,
    ) -> RuntimeResult<Vec<RunRecord>> {
        Ok(self.runs.list_runs(space_id, status).await?)
    }

    /// Resolve the pending approval record matching this decision.
    async fn resolve_approval(
        &self,
        run_id: &RunId,
        operation_id: &str,
        request: &ApprovalRequest,
    ) -> RuntimeResult<()> {
        let resolution = match request.decision {
            ApprovalVerdict::Approved => ApprovalStatus::Approved,
            ApprovalVerdict::Denied => ApprovalStatus::Denied,
        };
        let records = self.approvals.list_approvals_for_run(run_id).await?;
        for mut approval in records {
            if approval.status == ApprovalStatus::Pending && approval.operation_id == operation_id
            {
                approval.resolve(resolution, request.reason.clone());
                self.approvals.update_approval(&approval).await?;
            }
        }
        Ok(())
    }
}
