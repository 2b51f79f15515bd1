//! Cordon Protocol — wire types and validation.
//!
//! Operations (instructions submitted to a space) and events (their recorded
//! outcomes) are closed tagged unions, discriminated by a `type` field and
//! serialized with camelCase names. Untrusted envelopes are checked by the
//! [`validate`] module, which reports every offending field path instead of
//! failing on the first serde error.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod envelope;
pub mod event;
pub mod operation;
pub mod validate;

pub use envelope::{EventsMessage, OperationsMessage, PROTOCOL_VERSION};
pub use event::{ApprovalDetails, Event, EventPayload, PendingApproval};
pub use operation::{Encoding, FileEdit, Operation, OperationType};
pub use validate::{
    validate_operation, validate_operations_message, validate_path, PathViolation,
    ValidationIssue,
};
