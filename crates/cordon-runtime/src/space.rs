//! The space manager: registry, lifecycle, and policy wiring.

use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use cordon_core::{RuntimeConfig, SpaceId, SpaceStatus};
use cordon_policy::{PolicyEngine, PolicyOverrides, PolicyPreset};
use cordon_sandbox::SandboxConfig;
use cordon_store::{SpaceRecord, SpaceStore};

use crate::error::{RuntimeError, RuntimeResult};
use crate::provision::{SandboxProvisioner, SpaceSandbox};

/// Default space lifetime: 12 hours.
const DEFAULT_TTL_SECS: i64 = 12 * 60 * 60;

/// Options accepted at space creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceOptions {
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Policy preset; `standard` when omitted.
    #[serde(default)]
    pub policy: Option<PolicyPreset>,
    /// Field-level overrides merged over the preset.
    #[serde(default)]
    pub policy_overrides: Option<PolicyOverrides>,
    /// Capabilities granted to the space.
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
    /// Environment passed into the sandbox container.
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    /// Opaque user metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Lifetime in seconds; 12 h when omitted.
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

/// Mutable space fields accepted by `update`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacePatch {
    /// Replace the name.
    #[serde(default)]
    pub name: Option<String>,
    /// Replace the description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replace the metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// The live half of a space: what a run borrows for its duration.
#[derive(Clone)]
pub(crate) struct SpaceHandle {
    pub(crate) sandbox: Arc<dyn SpaceSandbox>,
    pub(crate) policy: Arc<PolicyEngine>,
    /// Serializes runs within the space.
    pub(crate) run_gate: Arc<Mutex<()>>,
}

/// Owns the `space id → (sandbox, policy engine)` registry plus persisted
/// metadata, and drives space lifecycle.
pub struct SpaceManager {
    provisioner: Arc<dyn SandboxProvisioner>,
    config: RuntimeConfig,
    store: Arc<dyn SpaceStore>,
    registry: RwLock<HashMap<SpaceId, SpaceHandle>>,
}

impl SpaceManager {
    /// Wire the manager to its collaborators.
    #[must_use]
    pub fn new(
        provisioner: Arc<dyn SandboxProvisioner>,
        config: RuntimeConfig,
        store: Arc<dyn SpaceStore>,
    ) -> Self {
        Self {
            provisioner,
            config,
            store,
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Provision a new space: sandbox, policy engine, persisted record.
    ///
    /// The sandbox (including any image pull) is provisioned before the
    /// registry write lock is taken.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when sandbox provisioning or persistence
    /// fails; a sandbox is released again if its record cannot be stored.
    pub async fn create(&self, options: CreateSpaceOptions) -> RuntimeResult<SpaceRecord> {
        let id = SpaceId::generate();
        let preset = options.policy.unwrap_or_default();
        let overrides = options.policy_overrides.unwrap_or_default();
        let policy = Arc::new(PolicyEngine::from_preset_with_overrides(preset, &overrides));

        let env = options.env.unwrap_or_default();
        let sandbox_config = SandboxConfig::new(id.as_str(), &self.config.workspace_base_dir)
            .with_image(self.config.sandbox_base_image.as_str())
            .with_env(env.clone())
            .with_network(policy.policy().network.enabled)
            .with_timeout(self.config.sandbox_timeout_ms);

        let sandbox = self.provisioner.provision(sandbox_config).await?;

        let now = Utc::now();
        let ttl = options.ttl_seconds.unwrap_or(DEFAULT_TTL_SECS);
        let record = SpaceRecord {
            id: id.clone(),
            name: options.name.unwrap_or_else(|| id.to_string()),
            description: options.description,
            status: SpaceStatus::Ready,
            policy: preset,
            policy_overrides: overrides,
            workspace_path: sandbox.workspace_path().to_path_buf(),
            capabilities: options.capabilities.unwrap_or_default(),
            env,
            metadata: options.metadata,
            created_at: now,
            expires_at: now + Duration::seconds(ttl),
        };

        if let Err(e) = self.store.insert_space(&record).await {
            let _ = sandbox.destroy().await;
            return Err(e.into());
        }

        self.registry.write().await.insert(
            id.clone(),
            SpaceHandle {
                sandbox,
                policy,
                run_gate: Arc::new(Mutex::new(())),
            },
        );

        info!(space_id = %id, preset = %preset, "space created");
        Ok(record)
    }

    /// Fetch a space record, tombstones included.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when no record exists.
    pub async fn get(&self, id: &SpaceId) -> RuntimeResult<SpaceRecord> {
        self.store
            .get_space(id)
            .await?
            .ok_or_else(|| RuntimeError::SpaceNotFound {
                space_id: id.to_string(),
            })
    }

    /// List spaces, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the store fails.
    pub async fn list(&self, status: Option<SpaceStatus>) -> RuntimeResult<Vec<SpaceRecord>> {
        Ok(self.store.list_spaces(status).await?)
    }

    /// Apply a metadata patch to a live space.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when no record exists.
    pub async fn update(&self, id: &SpaceId, patch: SpacePatch) -> RuntimeResult<SpaceRecord> {
        let mut record = self.get(id).await?;
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(description) = patch.description {
            record.description = Some(description);
        }
        if let Some(metadata) = patch.metadata {
            record.metadata = Some(metadata);
        }
        self.store.update_space(&record).await?;
        Ok(record)
    }

    /// Push the expiry further out by `additional_seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when no record exists.
    pub async fn extend(
        &self,
        id: &SpaceId,
        additional_seconds: i64,
    ) -> RuntimeResult<SpaceRecord> {
        let mut record = self.get(id).await?;
        record.expires_at += Duration::seconds(additional_seconds);
        self.store.update_space(&record).await?;
        Ok(record)
    }

    /// Tear the space down: registry entry, sandbox, tombstone. Idempotent
    /// with respect to a missing sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when no record exists.
    pub async fn destroy(&self, id: &SpaceId) -> RuntimeResult<SpaceRecord> {
        let handle = self.registry.write().await.remove(id);
        if let Some(handle) = handle {
            if let Err(e) = handle.sandbox.destroy().await {
                warn!(space_id = %id, error = %e, "sandbox teardown failed");
            }
        }

        let mut record = self.get(id).await?;
        if record.status != SpaceStatus::Destroyed {
            record.status = SpaceStatus::Destroyed;
            self.store.update_space(&record).await?;
            info!(space_id = %id, "space destroyed");
        }
        Ok(record)
    }

    /// The live sandbox of a space.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when the space is not live.
    pub async fn get_sandbox(&self, id: &SpaceId) -> RuntimeResult<Arc<dyn SpaceSandbox>> {
        Ok(self.handle(id).await?.sandbox)
    }

    /// The policy engine of a space.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpaceNotFound`] when the space is not live.
    pub async fn get_policy_engine(&self, id: &SpaceId) -> RuntimeResult<Arc<PolicyEngine>> {
        Ok(self.handle(id).await?.policy)
    }

    /// The live handle a run borrows.
    pub(crate) async fn handle(&self, id: &SpaceId) -> RuntimeResult<SpaceHandle> {
        self.registry
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::SpaceNotFound {
                space_id: id.to_string(),
            })
    }
}
