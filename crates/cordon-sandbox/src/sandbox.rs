//! The sandbox: one container plus one workspace, behind value-returning
//! primitives.

use bollard::Docker;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

use cordon_core::WorkspaceId;
use cordon_protocol::{Encoding, FileEdit};

use crate::config::SandboxConfig;
use crate::container::ContainerHandle;
use crate::error::{SandboxError, SandboxResult};
use crate::result::{
    DeleteResult, EditResult, ExecOptions, ExecResult, FileEntry, ReadResult, WriteResult,
};
use crate::workspace::Workspace;

/// Failure message when primitives are called after an unrecoverable error
/// or destruction.
const UNAVAILABLE: &str = "Sandbox is unavailable";

/// Lifecycle of a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxStatus {
    /// Provisioning in progress.
    Creating,
    /// Idle and usable.
    Ready,
    /// A primitive is in flight.
    Running,
    /// The exec channel failed; primitives answer with failures.
    Error,
    /// Released; primitives answer with failures.
    Destroyed,
}

/// One isolated execution environment.
///
/// Owned by exactly one space. The caller serializes operations; the
/// sandbox only tracks its own status and restores `Ready` after each
/// primitive completes.
#[derive(Debug)]
pub struct Sandbox {
    workspace_id: WorkspaceId,
    workspace: Workspace,
    container: ContainerHandle,
    default_timeout_ms: u64,
    status: RwLock<SandboxStatus>,
}

impl Sandbox {
    /// Provision the workspace directory, ensure the image, and start the
    /// container.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] when the workspace cannot be created or the
    /// container cannot be launched; a half-provisioned workspace is
    /// removed again on container failure.
    pub async fn create(docker: Docker, config: SandboxConfig) -> SandboxResult<Self> {
        let workspace_id = WorkspaceId::generate();
        let workspace = Workspace::provision(&config.workspace_base_dir, workspace_id.as_str())
            .await
            .map_err(|source| SandboxError::ProvisionWorkspace {
                path: config.workspace_base_dir.join(workspace_id.as_str()),
                source,
            })?;

        let host_workspace = workspace.root().to_string_lossy().into_owned();
        let container = match ContainerHandle::launch(docker, &config, &host_workspace).await {
            Ok(container) => container,
            Err(e) => {
                let _ = workspace.remove().await;
                return Err(e);
            }
        };

        info!(
            sandbox = %config.id,
            workspace = %host_workspace,
            container = %container.name(),
            "sandbox ready"
        );

        Ok(Self {
            workspace_id,
            workspace,
            container,
            default_timeout_ms: config.timeout_ms,
            status: RwLock::new(SandboxStatus::Ready),
        })
    }

    /// The generated workspace identifier (directory name).
    #[must_use]
    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Absolute host path of the workspace root.
    #[must_use]
    pub fn workspace_path(&self) -> &Path {
        self.workspace.root()
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> SandboxStatus {
        *self.status.read().await
    }

    /// Whether primitives can still produce real results.
    async fn begin(&self) -> bool {
        let mut status = self.status.write().await;
        match *status {
            SandboxStatus::Error | SandboxStatus::Destroyed => false,
            _ => {
                *status = SandboxStatus::Running;
                true
            }
        }
    }

    /// Restore `Ready` after a primitive unless a worse state took over.
    async fn finish(&self) {
        let mut status = self.status.write().await;
        if *status == SandboxStatus::Running {
            *status = SandboxStatus::Ready;
        }
    }

    /// Write a file into the workspace.
    pub async fn create_file(
        &self,
        path: &str,
        content: &str,
        encoding: Encoding,
        overwrite: bool,
    ) -> WriteResult {
        if !self.begin().await {
            return WriteResult::failure(UNAVAILABLE);
        }
        let result = self
            .workspace
            .create_file(path, content, encoding, overwrite)
            .await;
        self.finish().await;
        result
    }

    /// Read a file from the workspace.
    pub async fn read_file(&self, path: &str, encoding: Encoding) -> ReadResult {
        if !self.begin().await {
            return ReadResult::failure(UNAVAILABLE);
        }
        let result = self.workspace.read_file(path, encoding).await;
        self.finish().await;
        result
    }

    /// Apply ordered edits to a workspace file.
    pub async fn edit_file(&self, path: &str, edits: &[FileEdit]) -> EditResult {
        if !self.begin().await {
            return EditResult::failure(UNAVAILABLE);
        }
        let result = self.workspace.edit_file(path, edits).await;
        self.finish().await;
        result
    }

    /// Unlink a workspace file.
    pub async fn delete_file(&self, path: &str) -> DeleteResult {
        if !self.begin().await {
            return DeleteResult::failure(UNAVAILABLE);
        }
        let result = self.workspace.delete_file(path).await;
        self.finish().await;
        result
    }

    /// List workspace entries.
    pub async fn list_files(&self, path: &str, recursive: bool) -> Vec<FileEntry> {
        if !self.begin().await {
            return Vec::new();
        }
        let entries = self.workspace.list_files(path, recursive).await;
        self.finish().await;
        entries
    }

    /// Run a shell command in the container.
    ///
    /// A channel-start failure flips the sandbox to `Error`; every later
    /// primitive then answers with a failure until `destroy`.
    pub async fn exec(&self, command: &str, mut options: ExecOptions) -> ExecResult {
        if !self.begin().await {
            return ExecResult::channel_failure(UNAVAILABLE);
        }
        if options.timeout_ms.is_none() {
            options.timeout_ms = Some(self.default_timeout_ms);
        }
        match self.container.exec(command, &options).await {
            Ok(result) => {
                self.finish().await;
                result
            }
            Err(e) => {
                *self.status.write().await = SandboxStatus::Error;
                ExecResult::channel_failure(e.to_string())
            }
        }
    }

    /// Stop and remove the container, then delete the workspace. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] when the container removal or workspace
    /// deletion fails for a reason other than already being gone.
    pub async fn destroy(&self) -> SandboxResult<()> {
        {
            let mut status = self.status.write().await;
            if *status == SandboxStatus::Destroyed {
                return Ok(());
            }
            *status = SandboxStatus::Destroyed;
        }
        self.container.destroy().await?;
        self.workspace
            .remove()
            .await
            .map_err(|source| SandboxError::RemoveWorkspace {
                path: self.workspace.root().to_path_buf(),
                source,
            })?;
        info!(container = %self.container.name(), "sandbox destroyed");
        Ok(())
    }
}
