//! Cordon Executor — the batch run state machine.
//!
//! The executor consumes a list of operations against two injected
//! collaborators: a policy decider and a sandbox driver. Each operation
//! yields exactly one event (its own-typed outcome, a `policyDenied`, or
//! the terminal `approvalRequired`). Suspension is a value: the executor
//! returns with `AwaitingApproval` and the caller persists the snapshot,
//! later re-entering at the suspension index with a one-shot policy bypass
//! (approved) or a synthetic denial (denied). No state lives between
//! invocations.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod executor;
pub mod traits;

pub use executor::{ExecutionStatus, ExecutorOutcome, ResumeDecision, RunExecutor};
pub use traits::{PolicyDecider, SandboxDriver};
