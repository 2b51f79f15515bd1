//! The run loop: evaluate, dispatch, suspend, resume.

use tracing::debug;

use cordon_policy::Decision;
use cordon_protocol::{
    ApprovalDetails, Event, EventPayload, Operation, PendingApproval,
};
use cordon_sandbox::ExecOptions;

use crate::traits::{PolicyDecider, SandboxDriver};

/// Terminal status of one executor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Every operation from the start index was evaluated.
    Completed,
    /// Evaluation stopped at an approval gate.
    AwaitingApproval,
}

/// What one executor invocation produced.
///
/// `events` holds only the events new to this invocation; on resume the
/// caller concatenates them with the pre-suspension events.
#[derive(Debug)]
pub struct ExecutorOutcome {
    /// Newly produced events, in operation order.
    pub events: Vec<Event>,
    /// How the invocation ended.
    pub status: ExecutionStatus,
    /// Set when `status` is `AwaitingApproval`.
    pub pending_approval: Option<PendingApproval>,
}

/// A human decision applied to a suspended run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeDecision {
    /// Execute the gated operation, bypassing its policy check.
    Approved,
    /// Skip the gated operation with a denial event.
    Denied {
        /// The decider's reason, if given.
        reason: Option<String>,
    },
}

/// Drives one batch of operations against injected collaborators.
///
/// The executor borrows its collaborators for the duration of a run and
/// holds no state of its own between invocations.
pub struct RunExecutor<'a> {
    policy: &'a dyn PolicyDecider,
    sandbox: &'a dyn SandboxDriver,
}

impl<'a> RunExecutor<'a> {
    /// Borrow the collaborators for one run.
    #[must_use]
    pub fn new(policy: &'a dyn PolicyDecider, sandbox: &'a dyn SandboxDriver) -> Self {
        Self { policy, sandbox }
    }

    /// Evaluate operations from `start_index` to exhaustion or suspension.
    ///
    /// With `bypass_policy_at_start`, the operation at `start_index` skips
    /// its policy check; this happens exactly once, after an approval. The input
    /// vector is never mutated; indices beyond a suspension are left for
    /// the resume path.
    pub async fn execute(
        &self,
        operations: &[Operation],
        start_index: usize,
        bypass_policy_at_start: bool,
    ) -> ExecutorOutcome {
        let mut events = Vec::new();

        for (index, operation) in operations.iter().enumerate().skip(start_index) {
            let bypass = bypass_policy_at_start && index == start_index;
            let decision = if bypass {
                Decision::Allow
            } else {
                self.policy.decide(operation)
            };

            match decision {
                Decision::Allow => {
                    let event = self.dispatch(operation).await;
                    events.push(event);
                }
                Decision::Deny {
                    reason,
                    suggestion,
                    policy_tag,
                } => {
                    debug!(index, policy_tag, "operation denied by policy");
                    events.push(Event::now(
                        EventPayload::PolicyDenied {
                            operation_type: operation.op_type(),
                            reason,
                            suggestion,
                        },
                        operation.id().map(ToOwned::to_owned),
                    ));
                }
                Decision::RequireApproval { reason, policy_tag } => {
                    debug!(index, policy_tag, "operation gated on approval");
                    let pending = pending_approval(operation, index, reason, policy_tag);
                    events.push(Event::now(
                        EventPayload::ApprovalRequired {
                            operation_id: pending.operation_id.clone(),
                            operation_type: pending.operation_type,
                            reason: pending.reason.clone(),
                            details: pending.details.clone(),
                        },
                        Some(pending.operation_id.clone()),
                    ));
                    return ExecutorOutcome {
                        events,
                        status: ExecutionStatus::AwaitingApproval,
                        pending_approval: Some(pending),
                    };
                }
            }
        }

        ExecutorOutcome {
            events,
            status: ExecutionStatus::Completed,
            pending_approval: None,
        }
    }

    /// Re-enter a suspended run with a human decision.
    ///
    /// Locates the gated operation by its correlation key; returns `None`
    /// when no operation matches `operation_id`. Approved re-enters at the
    /// gate with a one-shot policy bypass; denied substitutes a synthetic
    /// denial event and re-enters after the gate. Later operations are
    /// re-evaluated normally, so a second gate suspends again.
    pub async fn resume(
        &self,
        operations: &[Operation],
        operation_id: &str,
        decision: ResumeDecision,
    ) -> Option<ExecutorOutcome> {
        let index = operations
            .iter()
            .enumerate()
            .position(|(i, op)| operation_key(op, i) == operation_id)?;

        match decision {
            ResumeDecision::Approved => Some(self.execute(operations, index, true).await),
            ResumeDecision::Denied { reason } => {
                let denial = Event::now(
                    EventPayload::PolicyDenied {
                        operation_type: operations[index].op_type(),
                        reason: reason.unwrap_or_else(|| "Approval denied by user".to_string()),
                        suggestion: None,
                    },
                    operations[index].id().map(ToOwned::to_owned),
                );
                let mut outcome = self.execute(operations, index + 1, false).await;
                outcome.events.insert(0, denial);
                Some(outcome)
            }
        }
    }

    /// Dispatch an allowed operation and shape its event.
    async fn dispatch(&self, operation: &Operation) -> Event {
        let operation_id = operation.id().map(ToOwned::to_owned);
        let payload = match operation {
            Operation::Message { .. } => EventPayload::Message { success: true },
            Operation::CreateFile {
                path,
                content,
                encoding,
                overwrite,
                ..
            } => {
                let result = self
                    .sandbox
                    .create_file(path, content, *encoding, *overwrite)
                    .await;
                EventPayload::CreateFile {
                    path: path.clone(),
                    success: result.success,
                    bytes_written: result.bytes_written,
                    error: result.error,
                }
            }
            Operation::ReadFile { path, encoding, .. } => {
                let result = self.sandbox.read_file(path, *encoding).await;
                EventPayload::ReadFile {
                    path: path.clone(),
                    success: result.success,
                    content: result.content,
                    encoding: result.encoding,
                    size: result.size,
                    error: result.error,
                }
            }
            Operation::EditFile { path, edits, .. } => {
                let result = self.sandbox.edit_file(path, edits).await;
                EventPayload::EditFile {
                    path: path.clone(),
                    success: result.success,
                    edits_applied: result.edits_applied,
                    error: result.error,
                }
            }
            Operation::DeleteFile { path, .. } => {
                let result = self.sandbox.delete_file(path).await;
                EventPayload::DeleteFile {
                    path: path.clone(),
                    success: result.success,
                    error: result.error,
                }
            }
            Operation::Shell {
                command,
                cwd,
                timeout_ms,
                env,
                ..
            } => {
                let options = ExecOptions {
                    cwd: cwd.clone(),
                    env: env.clone(),
                    timeout_ms: Some(self.policy.effective_timeout(*timeout_ms)),
                };
                let result = self.sandbox.exec(command, options).await;
                EventPayload::Shell {
                    command: command.clone(),
                    success: result.success,
                    exit_code: Some(result.exit_code),
                    stdout: Some(result.stdout),
                    stderr: Some(result.stderr),
                    duration_ms: Some(result.duration_ms),
                    timed_out: Some(result.timed_out),
                    error: None,
                }
            }
        };
        Event::now(payload, operation_id)
    }
}

/// The correlation key a gate suspends under: the operation's own id, or a
/// deterministic positional key when the caller supplied none.
#[must_use]
pub(crate) fn operation_key(operation: &Operation, index: usize) -> String {
    operation
        .id()
        .map_or_else(|| format!("op_{index}"), ToOwned::to_owned)
}

/// Assemble the pending approval for a gated operation.
fn pending_approval(
    operation: &Operation,
    index: usize,
    reason: String,
    policy_tag: &'static str,
) -> PendingApproval {
    let command = match operation {
        Operation::Shell { command, .. } => Some(command.clone()),
        _ => None,
    };
    PendingApproval {
        operation_id: operation_key(operation, index),
        operation_type: operation.op_type(),
        reason,
        details: ApprovalDetails {
            command,
            path: operation.path().map(ToOwned::to_owned),
            policy: Some(policy_tag.to_string()),
        },
    }
}
