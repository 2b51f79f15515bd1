//! Lifecycle status enums for spaces, runs, and approvals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a space.
///
/// A space owns its sandbox and policy engine between `Ready` and `Paused`.
/// `Destroyed` spaces are tombstoned in storage and hold no live resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceStatus {
    /// Sandbox provisioning in progress.
    Creating,
    /// Sandbox up, no run executing.
    Ready,
    /// A run is executing in the space.
    Running,
    /// Live but suspended (e.g. awaiting approval).
    Paused,
    /// Tombstoned; sandbox released.
    Destroyed,
}

impl SpaceStatus {
    /// Whether the space still holds live sandbox resources.
    #[must_use]
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Destroyed)
    }
}

impl fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "creating",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Executor is consuming operations.
    Running,
    /// All operations evaluated; events are complete.
    Completed,
    /// Suspended mid-batch on an approval gate.
    AwaitingApproval,
    /// Terminated by the caller; no resume accepted.
    Cancelled,
    /// The run could not be carried out at all.
    Error,
}

impl RunStatus {
    /// Whether the run has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Lifecycle of an approval record.
///
/// Created `Pending` at the moment a run suspends; resolved exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a human decision.
    Pending,
    /// Decision: proceed with the gated operation.
    Approved,
    /// Decision: skip the gated operation.
    Denied,
    /// No decision arrived before the record expired.
    Expired,
}

impl ApprovalStatus {
    /// Whether a decision (or expiry) has resolved this record.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}
