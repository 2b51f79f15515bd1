//! Cordon Core — shared identifiers, statuses, and configuration.
//!
//! Everything here is pure data used across the Cordon workspace: the
//! prefixed opaque identifiers (`spc_…`, `run_…`, `apr_…`), the lifecycle
//! status enums for spaces, runs, and approvals, the error taxonomy that
//! classifies boundary failures, and the environment-derived runtime
//! configuration.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod id;
pub mod status;

pub use config::RuntimeConfig;
pub use error::ErrorCategory;
pub use id::{ApprovalId, IdParseError, RunId, SpaceId, WorkspaceId};
pub use status::{ApprovalStatus, RunStatus, SpaceStatus};
