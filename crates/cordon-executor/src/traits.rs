//! Collaborator seams injected into the executor.

use async_trait::async_trait;

use cordon_policy::{Decision, PolicyEngine};
use cordon_protocol::{Encoding, FileEdit, Operation};
use cordon_sandbox::{
    DeleteResult, EditResult, ExecOptions, ExecResult, ReadResult, Sandbox, WriteResult,
};

/// Decides operations. Never suspends; evaluation is synchronous and pure.
pub trait PolicyDecider: Send + Sync {
    /// Decide one operation.
    fn decide(&self, operation: &Operation) -> Decision;

    /// Clamp a requested shell timeout to the policy limit.
    fn effective_timeout(&self, requested: Option<u64>) -> u64;
}

impl PolicyDecider for PolicyEngine {
    fn decide(&self, operation: &Operation) -> Decision {
        self.evaluate(operation)
    }

    fn effective_timeout(&self, requested: Option<u64>) -> u64 {
        self.effective_timeout(requested)
    }
}

/// The sandbox primitives the executor dispatches allowed operations to.
///
/// Results are values; a driver never fails the batch.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    /// Write a file into the workspace.
    async fn create_file(
        &self,
        path: &str,
        content: &str,
        encoding: Encoding,
        overwrite: bool,
    ) -> WriteResult;

    /// Read a file from the workspace.
    async fn read_file(&self, path: &str, encoding: Encoding) -> ReadResult;

    /// Apply ordered edits to a workspace file.
    async fn edit_file(&self, path: &str, edits: &[FileEdit]) -> EditResult;

    /// Unlink a workspace file.
    async fn delete_file(&self, path: &str) -> DeleteResult;

    /// Run a shell command with the effective timeout already resolved.
    async fn exec(&self, command: &str, options: ExecOptions) -> ExecResult;
}

#[async_trait]
impl SandboxDriver for Sandbox {
    async fn create_file(
        &self,
        path: &str,
        content: &str,
        encoding: Encoding,
        overwrite: bool,
    ) -> WriteResult {
        Sandbox::create_file(self, path, content, encoding, overwrite).await
    }

    async fn read_file(&self, path: &str, encoding: Encoding) -> ReadResult {
        Sandbox::read_file(self, path, encoding).await
    }

    async fn edit_file(&self, path: &str, edits: &[FileEdit]) -> EditResult {
        Sandbox::edit_file(self, path, edits).await
    }

    async fn delete_file(&self, path: &str) -> DeleteResult {
        Sandbox::delete_file(self, path).await
    }

    async fn exec(&self, command: &str, options: ExecOptions) -> ExecResult {
        Sandbox::exec(self, command, options).await
    }
}
