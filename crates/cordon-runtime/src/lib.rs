//! Cordon Runtime — space registry and run orchestration.
//!
//! The [`SpaceManager`] owns the in-memory mapping from space id to its
//! live sandbox and policy engine, and drives space lifecycle against the
//! persistence boundary. The [`RunService`] persists runs, invokes the
//! executor under a per-space gate, and handles approval resume and
//! cancellation.
//!
//! Lock order is registry → per-space gate → sandbox primitive, never
//! reversed, and no lock spans an image pull (pulls happen inside sandbox
//! provisioning before the registry write).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod provision;
pub mod run;
pub mod space;

pub use error::{RuntimeError, RuntimeResult};
pub use provision::{DockerSandboxProvisioner, SandboxProvisioner, SpaceSandbox};
pub use run::{ApprovalRequest, ApprovalVerdict, ResumeRequest, RunService};
pub use space::{CreateSpaceOptions, SpaceManager, SpacePatch};
