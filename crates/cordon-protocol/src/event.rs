//! Event variants — the recorded outcome of each evaluated operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::{Encoding, OperationType};

/// Operation-specific context attached to an approval gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDetails {
    /// The gated shell command, when the operation is a shell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// The gated path, when the operation is a filesystem op.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The dotted policy field that triggered the gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// The approval a suspended run is waiting on.
///
/// Returned in the run response while the run is `awaiting_approval` and
/// echoed back by the resume request's `operationId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    /// Correlation id of the gated operation.
    pub operation_id: String,
    /// Kind of the gated operation.
    pub operation_type: OperationType,
    /// Why the gate triggered.
    pub reason: String,
    /// Operation-specific context for the decider.
    pub details: ApprovalDetails,
}

/// The recorded outcome of one evaluated operation.
///
/// Every event carries a timestamp and, when the originating operation had
/// one, its correlation id. The payload discriminates on `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Outcome payload, discriminated by `type`.
    #[serde(flatten)]
    pub payload: EventPayload,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Correlation id of the originating operation.
    #[serde(
        rename = "operationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_id: Option<String>,
}

impl Event {
    /// Record a payload now, correlated to the given operation id.
    #[must_use]
    pub fn now(payload: EventPayload, operation_id: Option<String>) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
            operation_id,
        }
    }

    /// Whether this event records a successful outcome.
    ///
    /// Policy denials, approval gates, and error events are not successes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match &self.payload {
            EventPayload::Message { success }
            | EventPayload::CreateFile { success, .. }
            | EventPayload::ReadFile { success, .. }
            | EventPayload::EditFile { success, .. }
            | EventPayload::DeleteFile { success, .. }
            | EventPayload::Shell { success, .. } => *success,
            EventPayload::ApprovalRequired { .. }
            | EventPayload::PolicyDenied { .. }
            | EventPayload::Error { .. } => false,
        }
    }
}

/// Outcome payload for each operation kind, plus the policy-sourced events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventPayload {
    /// Narration acknowledged.
    #[serde(rename_all = "camelCase")]
    Message {
        /// Always true.
        success: bool,
    },
    /// Outcome of a `createFile`.
    #[serde(rename_all = "camelCase")]
    CreateFile {
        /// The target path.
        path: String,
        /// Whether the write happened.
        success: bool,
        /// Bytes written on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes_written: Option<u64>,
        /// Failure detail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Outcome of a `readFile`.
    #[serde(rename_all = "camelCase")]
    ReadFile {
        /// The source path.
        path: String,
        /// Whether the read happened.
        success: bool,
        /// File content in the requested encoding.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        /// Encoding of `content`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encoding: Option<Encoding>,
        /// File size in bytes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
        /// Failure detail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Outcome of an `editFile`.
    #[serde(rename_all = "camelCase")]
    EditFile {
        /// The target path.
        path: String,
        /// Whether all edits applied.
        success: bool,
        /// Number of edits applied on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        edits_applied: Option<u64>,
        /// Failure detail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Outcome of a `deleteFile`.
    #[serde(rename_all = "camelCase")]
    DeleteFile {
        /// The target path.
        path: String,
        /// Whether the unlink happened.
        success: bool,
        /// Failure detail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Outcome of a `shell`.
    #[serde(rename_all = "camelCase")]
    Shell {
        /// The command line that ran.
        command: String,
        /// True when the command exited zero without timing out.
        success: bool,
        /// Process exit code (124 on timeout).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i64>,
        /// Captured standard output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,
        /// Captured standard error.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        /// Measured wall-clock duration in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        /// Whether the effective timeout expired.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timed_out: Option<bool>,
        /// Failure detail when the exec channel could not start.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A run suspended awaiting a human decision on this operation.
    #[serde(rename_all = "camelCase")]
    ApprovalRequired {
        /// Correlation id of the gated operation.
        operation_id: String,
        /// Kind of the gated operation.
        operation_type: OperationType,
        /// Why the gate triggered.
        reason: String,
        /// Operation-specific context for the decider.
        details: ApprovalDetails,
    },
    /// Policy refused this operation; the batch continued.
    #[serde(rename_all = "camelCase")]
    PolicyDenied {
        /// Kind of the denied operation.
        operation_type: OperationType,
        /// Why policy refused.
        reason: String,
        /// What the caller could do instead.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    /// A failure that is itself the recorded outcome.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Taxonomy category, as a wire string.
        category: String,
        /// Human-readable description.
        message: String,
        /// Structured context.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}
