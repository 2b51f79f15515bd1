//! Cordon Store — the persistence boundary.
//!
//! The concrete database lives outside the core; this crate defines the
//! typed records for spaces, runs, and approvals plus the async store
//! traits a backend implements. [`MemoryStore`] implements all three
//! traits over in-process maps and is the default for tests and embedded
//! use.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use cordon_protocol::PendingApproval;
pub use record::{ApprovalRecord, RunRecord, SpaceRecord};
pub use traits::{ApprovalStore, RunStore, SpaceStore};
