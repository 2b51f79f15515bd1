//! Policy model: sections, presets, and override merging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Filesystem rules for a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemPolicy {
    /// Whether filesystem operations are permitted at all.
    pub enabled: bool,
    /// Whether write operations (create/edit/delete) are refused.
    pub read_only: bool,
    /// Maximum size in bytes of content written by a single `createFile`.
    pub max_file_size: u64,
    /// If non-empty, a path must match one of these wildcard patterns.
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    /// A path matching any of these wildcard patterns is refused.
    #[serde(default)]
    pub blocked_paths: Vec<String>,
}

/// Shell rules for a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellPolicy {
    /// Whether shell execution is permitted at all.
    pub enabled: bool,
    /// If non-empty, the command's base token must match one entry exactly.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    /// A command containing any of these substrings is refused.
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
    /// Upper bound on a command's effective timeout, in milliseconds.
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
    /// A command containing any of these substrings gates on human approval.
    #[serde(default)]
    pub approval_required: Vec<String>,
}

/// Network rules for a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    /// Whether the container gets a network at all.
    pub enabled: bool,
    /// If non-empty, a domain must match one of these wildcard patterns.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// A domain matching any of these wildcard patterns is refused.
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

/// The complete, immutable policy owned by a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Filesystem section.
    pub filesystem: FilesystemPolicy,
    /// Shell section.
    pub shell: ShellPolicy,
    /// Network section.
    pub network: NetworkPolicy,
}

/// The three built-in policy presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    /// Read-only filesystem (≤ 1 MiB), no shell, no network.
    Restrictive,
    /// Writable filesystem (≤ 10 MiB), allowlisted shell, no network.
    #[default]
    Standard,
    /// Writable filesystem (≤ 100 MiB), open shell with a short blocklist,
    /// network on.
    Permissive,
}

/// Error parsing a preset name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown policy preset `{0}`; expected restrictive, standard, or permissive")]
pub struct PresetParseError(pub String);

impl FromStr for PolicyPreset {
    type Err = PresetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restrictive" => Ok(Self::Restrictive),
            "standard" => Ok(Self::Standard),
            "permissive" => Ok(Self::Permissive),
            other => Err(PresetParseError(other.to_string())),
        }
    }
}

impl fmt::Display for PolicyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Restrictive => "restrictive",
            Self::Standard => "standard",
            Self::Permissive => "permissive",
        };
        f.write_str(s)
    }
}

impl PolicyPreset {
    /// Materialize the preset into a full policy.
    #[must_use]
    pub fn policy(self) -> Policy {
        match self {
            Self::Restrictive => Policy {
                filesystem: FilesystemPolicy {
                    enabled: true,
                    read_only: true,
                    max_file_size: 1024 * 1024,
                    allowed_paths: Vec::new(),
                    blocked_paths: Vec::new(),
                },
                shell: ShellPolicy {
                    enabled: false,
                    allowed_commands: Vec::new(),
                    blocked_patterns: Vec::new(),
                    timeout_ms: 30_000,
                    approval_required: Vec::new(),
                },
                network: NetworkPolicy {
                    enabled: false,
                    allowed_domains: Vec::new(),
                    blocked_domains: Vec::new(),
                },
            },
            Self::Standard => Policy {
                filesystem: FilesystemPolicy {
                    enabled: true,
                    read_only: false,
                    max_file_size: 10 * 1024 * 1024,
                    allowed_paths: Vec::new(),
                    blocked_paths: Vec::new(),
                },
                shell: ShellPolicy {
                    enabled: true,
                    allowed_commands: [
                        "bun", "node", "npm", "npx", "cat", "echo", "ls", "pwd", "head", "tail",
                        "grep", "find", "wc",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                    blocked_patterns: [
                        "sudo", "chmod", "chown", "curl", "wget", "ssh", "rm -rf /", "rm -rf ~",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                    timeout_ms: 30_000,
                    approval_required: ["rm -rf", "rm -r"].into_iter().map(String::from).collect(),
                },
                network: NetworkPolicy {
                    enabled: false,
                    allowed_domains: Vec::new(),
                    blocked_domains: Vec::new(),
                },
            },
            Self::Permissive => Policy {
                filesystem: FilesystemPolicy {
                    enabled: true,
                    read_only: false,
                    max_file_size: 100 * 1024 * 1024,
                    allowed_paths: Vec::new(),
                    blocked_paths: Vec::new(),
                },
                shell: ShellPolicy {
                    enabled: true,
                    allowed_commands: Vec::new(),
                    blocked_patterns: ["sudo", "rm -rf /", "rm -rf ~"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    timeout_ms: 300_000,
                    approval_required: ["rm -rf", "chmod", "chown"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                },
                network: NetworkPolicy {
                    enabled: true,
                    allowed_domains: vec!["*".to_string()],
                    blocked_domains: Vec::new(),
                },
            },
        }
    }
}

/// Field-level overlay for [`FilesystemPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemOverrides {
    /// Override `enabled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Override `read_only`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    /// Override `max_file_size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    /// Replace `allowed_paths`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_paths: Option<Vec<String>>,
    /// Replace `blocked_paths`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_paths: Option<Vec<String>>,
}

/// Field-level overlay for [`ShellPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellOverrides {
    /// Override `enabled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replace `allowed_commands`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_commands: Option<Vec<String>>,
    /// Replace `blocked_patterns`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_patterns: Option<Vec<String>>,
    /// Override `timeout_ms`.
    #[serde(rename = "timeoutMs", default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Replace `approval_required`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<Vec<String>>,
}

/// Field-level overlay for [`NetworkPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkOverrides {
    /// Override `enabled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replace `allowed_domains`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
    /// Replace `blocked_domains`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_domains: Option<Vec<String>>,
}

/// Per-section, per-field overlay merged over a preset.
///
/// Merge depth is exactly one level per section: a present leaf replaces
/// the preset value wholesale (arrays are not concatenated), an absent leaf
/// keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverrides {
    /// Filesystem overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemOverrides>,
    /// Shell overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<ShellOverrides>,
    /// Network overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkOverrides>,
}

impl PolicyOverrides {
    /// Whether the overlay changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filesystem.is_none() && self.shell.is_none() && self.network.is_none()
    }

    /// Merge this overlay over `base`, producing the effective policy.
    #[must_use]
    pub fn merged_over(&self, base: &Policy) -> Policy {
        let mut policy = base.clone();
        if let Some(fs) = &self.filesystem {
            merge_field(&mut policy.filesystem.enabled, fs.enabled);
            merge_field(&mut policy.filesystem.read_only, fs.read_only);
            merge_field(&mut policy.filesystem.max_file_size, fs.max_file_size);
            merge_field(&mut policy.filesystem.allowed_paths, fs.allowed_paths.clone());
            merge_field(&mut policy.filesystem.blocked_paths, fs.blocked_paths.clone());
        }
        if let Some(shell) = &self.shell {
            merge_field(&mut policy.shell.enabled, shell.enabled);
            merge_field(
                &mut policy.shell.allowed_commands,
                shell.allowed_commands.clone(),
            );
            merge_field(
                &mut policy.shell.blocked_patterns,
                shell.blocked_patterns.clone(),
            );
            merge_field(&mut policy.shell.timeout_ms, shell.timeout_ms);
            merge_field(
                &mut policy.shell.approval_required,
                shell.approval_required.clone(),
            );
        }
        if let Some(network) = &self.network {
            merge_field(&mut policy.network.enabled, network.enabled);
            merge_field(
                &mut policy.network.allowed_domains,
                network.allowed_domains.clone(),
            );
            merge_field(
                &mut policy.network.blocked_domains,
                network.blocked_domains.clone(),
            );
        }
        policy
    }
}

/// An overlay leaf replaces the base value when present.
fn merge_field<T>(base: &mut T, overlay: Option<T>) {
    if let Some(value) = overlay {
        *base = value;
    }
}
