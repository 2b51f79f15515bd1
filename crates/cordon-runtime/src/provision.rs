//! The sandbox provisioning seam.
//!
//! The space manager does not construct containers directly; it goes
//! through [`SandboxProvisioner`] so tests can substitute an in-process
//! double. The production implementation hands a Docker client to
//! [`cordon_sandbox::Sandbox`].

use async_trait::async_trait;
use bollard::Docker;
use std::path::Path;
use std::sync::Arc;

use cordon_executor::SandboxDriver;
use cordon_sandbox::{Sandbox, SandboxConfig, SandboxResult};

/// What a space needs from its live sandbox beyond the executor
/// primitives: the workspace location and teardown.
#[async_trait]
pub trait SpaceSandbox: Send + Sync {
    /// The executor-facing primitives.
    fn driver(&self) -> &dyn SandboxDriver;

    /// Absolute host path of the workspace root.
    fn workspace_path(&self) -> &Path;

    /// Release the container and workspace. Idempotent.
    async fn destroy(&self) -> SandboxResult<()>;
}

#[async_trait]
impl SpaceSandbox for Sandbox {
    fn driver(&self) -> &dyn SandboxDriver {
        self
    }

    fn workspace_path(&self) -> &Path {
        Sandbox::workspace_path(self)
    }

    async fn destroy(&self) -> SandboxResult<()> {
        Sandbox::destroy(self).await
    }
}

/// Creates sandboxes for new spaces.
#[async_trait]
pub trait SandboxProvisioner: Send + Sync {
    /// Provision a sandbox per the config.
    async fn provision(&self, config: SandboxConfig) -> SandboxResult<Arc<dyn SpaceSandbox>>;
}

/// Production provisioner backed by the Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerSandboxProvisioner {
    docker: Docker,
}

impl DockerSandboxProvisioner {
    /// Wrap an established Docker client.
    #[must_use]
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl SandboxProvisioner for DockerSandboxProvisioner {
    async fn provision(&self, config: SandboxConfig) -> SandboxResult<Arc<dyn SpaceSandbox>> {
        let sandbox = Sandbox::create(self.docker.clone(), config).await?;
        Ok(Arc::new(sandbox))
    }
}
