//! Sandbox lifecycle errors.
//!
//! Only lifecycle operations (`create`, `destroy`) return errors; the
//! per-operation primitives return structured results instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures provisioning or releasing a sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The workspace directory could not be provisioned.
    #[error("failed to provision workspace `{path}`: {source}")]
    ProvisionWorkspace {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The workspace directory could not be removed.
    #[error("failed to remove workspace `{path}`: {source}")]
    RemoveWorkspace {
        /// The directory that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The base image could not be found or pulled.
    #[error("failed to ensure image `{image}`: {message}")]
    EnsureImage {
        /// The image reference.
        image: String,
        /// The Docker daemon's explanation.
        message: String,
    },

    /// A container API call failed.
    #[error("docker operation `{operation}` for `{target}` failed: {message}")]
    ContainerOperation {
        /// The API operation that failed.
        operation: &'static str,
        /// The container or image it targeted.
        target: String,
        /// The Docker daemon's explanation.
        message: String,
    },
}

/// Result alias for sandbox lifecycle operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
