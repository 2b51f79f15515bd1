//! Runtime-boundary errors.

use thiserror::Error;

use cordon_core::ErrorCategory;
use cordon_sandbox::SandboxError;
use cordon_store::StorageError;

/// Failures surfaced by the space manager and run service.
///
/// Per the propagation policy, only Validation- and System-class failures
/// exist here: policy, execution, and timeout outcomes are absorbed into
/// the event stream and never become errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The referenced space does not exist or is destroyed.
    #[error("space not found: {space_id}")]
    SpaceNotFound {
        /// The missing space identifier.
        space_id: String,
    },

    /// The referenced run does not exist.
    #[error("run not found: {run_id}")]
    RunNotFound {
        /// The missing run identifier.
        run_id: String,
    },

    /// A resume was attempted against a run that is not suspended.
    #[error("run {run_id} is not awaiting approval (status: {status})")]
    RunNotSuspended {
        /// The run identifier.
        run_id: String,
        /// The run's actual status.
        status: String,
    },

    /// A resume decision named an operation other than the pending one.
    #[error("operation {operation_id} does not match the pending approval")]
    ApprovalMismatch {
        /// The operation id supplied by the caller.
        operation_id: String,
    },

    /// A cancel was attempted against a run already in a terminal state.
    #[error("run {run_id} cannot be cancelled (status: {status})")]
    RunNotCancellable {
        /// The run identifier.
        run_id: String,
        /// The run's actual status.
        status: String,
    },

    /// Sandbox provisioning or teardown failed.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The persistence backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RuntimeError {
    /// The taxonomy category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SpaceNotFound { .. } | Self::RunNotFound { .. } => ErrorCategory::Validation,
            Self::RunNotSuspended { .. }
            | Self::ApprovalMismatch { .. }
            | Self::RunNotCancellable { .. }
            | Self::Sandbox(_)
            | Self::Storage(_) => ErrorCategory::System,
        }
    }
}

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
