//! Cordon Sandbox — one container, one workspace.
//!
//! A [`Sandbox`] owns exactly one container and one host workspace
//! directory bind-mounted into it. Filesystem primitives operate on the
//! host side of the mount; shell commands run inside the container through
//! a multiplexed exec channel with a strict wall-clock timeout. Primitives
//! return structured results: a failure is a value, never a panic or an
//! error crossing the boundary.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod container;
pub mod error;
pub mod result;
pub mod sandbox;
pub mod workspace;

pub use config::SandboxConfig;
pub use container::ContainerHandle;
pub use error::{SandboxError, SandboxResult};
pub use result::{
    DeleteResult, EditResult, ExecOptions, ExecResult, FileEntry, ReadResult, WriteResult,
};
pub use sandbox::{Sandbox, SandboxStatus};
pub use workspace::Workspace;
