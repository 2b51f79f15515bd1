//! Persisted record shapes for spaces, runs, and approvals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use cordon_core::{ApprovalId, ApprovalStatus, RunId, RunStatus, SpaceId, SpaceStatus};
use cordon_policy::{PolicyOverrides, PolicyPreset};
use cordon_protocol::{ApprovalDetails, Event, Operation, OperationType, PendingApproval};

/// The persisted state of a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceRecord {
    /// Space identifier (`spc_…`).
    pub id: SpaceId,
    /// Human-readable name.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: SpaceStatus,
    /// The selected policy preset.
    pub policy: PolicyPreset,
    /// Field-level overrides merged over the preset.
    #[serde(default)]
    pub policy_overrides: PolicyOverrides,
    /// Absolute host path of the bind-mounted workspace.
    pub workspace_path: PathBuf,
    /// Capabilities granted to the space.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Environment passed into the sandbox container.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Opaque user metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the space expires and becomes eligible for destruction.
    pub expires_at: DateTime<Utc>,
}

/// The persisted state of a run.
///
/// Immutable once created except for status transitions and events
/// appended on resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// Run identifier (`run_…`).
    pub id: RunId,
    /// The owning space.
    pub space_id: SpaceId,
    /// Lifecycle status.
    pub status: RunStatus,
    /// The full submitted operations vector, append-only.
    pub operations: Vec<Operation>,
    /// Accumulated events, in operation order.
    pub events: Vec<Event>,
    /// Set while the run is suspended awaiting approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_approval: Option<PendingApproval>,
    /// When execution began.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A persisted approval, reifying one suspension until resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    /// Approval identifier (`apr_…`).
    pub id: ApprovalId,
    /// The owning space.
    pub space_id: SpaceId,
    /// The suspended run.
    pub run_id: RunId,
    /// Correlation id of the gated operation.
    pub operation_id: String,
    /// Kind of the gated operation.
    pub operation_type: OperationType,
    /// Resolution state.
    pub status: ApprovalStatus,
    /// Operation-specific context captured at suspension.
    pub details: ApprovalDetails,
    /// The policy reason that triggered the gate.
    pub reason: String,
    /// The decider's reason, recorded at resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
    /// When the record was created (at suspension).
    pub created_at: DateTime<Utc>,
    /// After this instant the record may be marked expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// When the decision arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalRecord {
    /// Create a pending record from a run's suspension point.
    #[must_use]
    pub fn pending(
        space_id: SpaceId,
        run_id: RunId,
        pending: &PendingApproval,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: ApprovalId::generate(),
            space_id,
            run_id,
            operation_id: pending.operation_id.clone(),
            operation_type: pending.operation_type,
            status: ApprovalStatus::Pending,
            details: pending.details.clone(),
            reason: pending.reason.clone(),
            decision_reason: None,
            created_at: Utc::now(),
            expires_at,
            decided_at: None,
        }
    }

    /// Resolve the record exactly once.
    pub fn resolve(&mut self, status: ApprovalStatus, decision_reason: Option<String>) {
        self.status = status;
        self.decision_reason = decision_reason;
        self.decided_at = Some(Utc::now());
    }
}
