//! Sandbox construction parameters.

use std::collections::HashMap;
use std::path::PathBuf;

/// Everything needed to provision one sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Stable identifier, used in the container name.
    pub id: String,
    /// Container image providing `sh` and the permitted runtimes.
    pub base_image: String,
    /// Directory inside the container where the workspace is mounted.
    pub work_dir: String,
    /// Host directory under which the workspace is created.
    pub workspace_base_dir: PathBuf,
    /// Base environment passed to every exec.
    pub env: HashMap<String, String>,
    /// Default exec timeout in milliseconds.
    pub timeout_ms: u64,
    /// Whether the container gets a network (`none` otherwise).
    pub network_enabled: bool,
    /// Memory limit in bytes.
    pub memory_limit: Option<i64>,
    /// CPU limit in whole-core units.
    pub cpu_limit: Option<f64>,
}

impl SandboxConfig {
    /// Reasonable defaults around a sandbox id and workspace base.
    #[must_use]
    pub fn new(id: impl Into<String>, workspace_base_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            base_image: cordon_core::config::DEFAULT_BASE_IMAGE.to_string(),
            work_dir: "/workspace".to_string(),
            workspace_base_dir: workspace_base_dir.into(),
            env: HashMap::new(),
            timeout_ms: cordon_core::config::DEFAULT_SANDBOX_TIMEOUT_MS,
            network_enabled: false,
            memory_limit: None,
            cpu_limit: None,
        }
    }

    /// Replace the base image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.base_image = image.into();
        self
    }

    /// Merge extra environment variables.
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Enable the container network.
    #[must_use]
    pub fn with_network(mut self, enabled: bool) -> Self {
        self.network_enabled = enabled;
        self
    }

    /// Replace the default exec timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
