//! Environment-derived runtime configuration.

use std::path::PathBuf;

/// Default shell timeout when `SANDBOX_TIMEOUT` is unset (30 s).
pub const DEFAULT_SANDBOX_TIMEOUT_MS: u64 = 30_000;

/// Default base image for new sandboxes.
pub const DEFAULT_BASE_IMAGE: &str = "oven/bun:1";

/// Default host directory under which space workspaces are created.
pub const DEFAULT_WORKSPACE_BASE: &str = "/var/lib/cordon/workspaces";

/// Runtime configuration consumed by the space manager and sandbox layer.
///
/// Sourced from the environment once at startup; unparsable numeric values
/// fall back to their defaults rather than failing.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Host directory under which per-space workspaces live
    /// (`WORKSPACE_BASE_DIR`).
    pub workspace_base_dir: PathBuf,
    /// Container image used for new sandboxes (`SANDBOX_BASE_IMAGE`).
    pub sandbox_base_image: String,
    /// Default shell timeout in milliseconds (`SANDBOX_TIMEOUT`).
    pub sandbox_timeout_ms: u64,
    /// Connection string handed to the persistence backend (`DATABASE_URL`).
    pub database_url: Option<String>,
}

impl RuntimeConfig {
    /// Load configuration from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            workspace_base_dir: std::env::var("WORKSPACE_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORKSPACE_BASE)),
            sandbox_base_image: std::env::var("SANDBOX_BASE_IMAGE")
                .unwrap_or_else(|_| DEFAULT_BASE_IMAGE.to_string()),
            sandbox_timeout_ms: std::env::var("SANDBOX_TIMEOUT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_SANDBOX_TIMEOUT_MS),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workspace_base_dir: PathBuf::from(DEFAULT_WORKSPACE_BASE),
            sandbox_base_image: DEFAULT_BASE_IMAGE.to_string(),
            sandbox_timeout_ms: DEFAULT_SANDBOX_TIMEOUT_MS,
            database_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.sandbox_timeout_ms, DEFAULT_SANDBOX_TIMEOUT_MS);
        assert_eq!(config.sandbox_base_image, DEFAULT_BASE_IMAGE);
        assert!(config.database_url.is_none());
    }
}
