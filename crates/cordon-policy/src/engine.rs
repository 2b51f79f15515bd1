//! The policy decision engine.
//!
//! # Check Order
//!
//! For filesystem operations (`createFile`, `readFile`, `editFile`,
//! `deleteFile`):
//!
//! 1. Filesystem disabled? -> `Deny` (`filesystem.enabled`)
//! 2. Write operation while read-only? -> `Deny` (`filesystem.readOnly`)
//! 3. Path matches a blocked pattern? -> `Deny` (`filesystem.blockedPaths`)
//! 4. Allowed patterns configured and none match? -> `Deny` (`filesystem.allowedPaths`)
//! 5. `createFile` content larger than the limit? -> `Deny` (`filesystem.maxFileSize`)
//! 6. Otherwise -> `Allow`
//!
//! For `shell`:
//!
//! 1. Shell disabled? -> `Deny` (`shell.enabled`)
//! 2. Command contains a blocked substring? -> `Deny` (`shell.blockedPatterns`)
//! 3. Allowlist configured and the base token is not an exact entry? ->
//!    `Deny` (`shell.allowedCommands`)
//! 4. Command contains an approval substring? -> `RequireApproval`
//!    (`shell.approvalRequired`)
//! 5. Otherwise -> `Allow`
//!
//! Blocked and approval patterns are substring matches over the raw command;
//! the allowlist matches the first whitespace-delimited token exactly. The
//! asymmetry is deliberate: `bun && sudo foo` stays denied by the `sudo`
//! substring even though `bun` is allowlisted, and the blocklist runs first
//! so an allowlisted base command cannot smuggle a blocked substring.
//!
//! `message` operations are always allowed.

use cordon_protocol::Operation;

use crate::model::{Policy, PolicyOverrides, PolicyPreset};
use crate::pattern::any_path_matches;

/// The outcome of evaluating one operation against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Proceed to the sandbox.
    Allow,
    /// Refuse and record a denial event; the batch continues.
    Deny {
        /// Human-readable refusal.
        reason: String,
        /// What the caller could do instead.
        suggestion: Option<String>,
        /// Dotted policy field that triggered the refusal.
        policy_tag: &'static str,
    },
    /// Suspend the run until a human decides.
    RequireApproval {
        /// Why the gate triggered.
        reason: String,
        /// Dotted policy field that triggered the gate.
        policy_tag: &'static str,
    },
}

impl Decision {
    /// Whether the operation may proceed.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Whether the operation was refused.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Whether the operation gates on approval.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::RequireApproval { .. })
    }
}

/// Evaluates operations against one space's immutable policy.
///
/// Construction resolves a preset plus optional overrides into the
/// effective [`Policy`]; evaluation is then a pure function of the
/// operation.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    policy: Policy,
}

impl PolicyEngine {
    /// Build an engine from a named preset.
    #[must_use]
    pub fn from_preset(preset: PolicyPreset) -> Self {
        Self {
            policy: preset.policy(),
        }
    }

    /// Build an engine from a preset with field-level overrides.
    #[must_use]
    pub fn from_preset_with_overrides(preset: PolicyPreset, overrides: &PolicyOverrides) -> Self {
        Self {
            policy: overrides.merged_over(&preset.policy()),
        }
    }

    /// The effective policy this engine enforces.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide one operation. Pure and deterministic.
    #[must_use]
    pub fn evaluate(&self, operation: &Operation) -> Decision {
        match operation {
            Operation::Message { .. } => Decision::Allow,
            Operation::CreateFile { path, content, .. } => {
                self.evaluate_filesystem(path, true, Some(content.len() as u64))
            }
            Operation::ReadFile { path, .. } => self.evaluate_filesystem(path, false, None),
            Operation::EditFile { path, .. } | Operation::DeleteFile { path, .. } => {
                self.evaluate_filesystem(path, true, None)
            }
            Operation::Shell { command, .. } => self.evaluate_shell(command),
        }
    }

    /// Clamp a requested shell timeout to the policy limit.
    ///
    /// Absent a request, the policy limit applies as-is.
    #[must_use]
    pub fn effective_timeout(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(ms) => ms.min(self.policy.shell.timeout_ms),
            None => self.policy.shell.timeout_ms,
        }
    }

    fn evaluate_filesystem(
        &self,
        path: &str,
        is_write: bool,
        content_size: Option<u64>,
    ) -> Decision {
        let fs = &self.policy.filesystem;

        if !fs.enabled {
            return Decision::Deny {
                reason: "Filesystem access is disabled".to_string(),
                suggestion: None,
                policy_tag: "filesystem.enabled",
            };
        }

        if is_write && fs.read_only {
            return Decision::Deny {
                reason: "Filesystem is read-only".to_string(),
                suggestion: None,
                policy_tag: "filesystem.readOnly",
            };
        }

        if any_path_matches(&fs.blocked_paths, path) {
            return Decision::Deny {
                reason: format!("Path '{path}' is blocked by policy"),
                suggestion: None,
                policy_tag: "filesystem.blockedPaths",
            };
        }

        if !fs.allowed_paths.is_empty() && !any_path_matches(&fs.allowed_paths, path) {
            return Decision::Deny {
                reason: format!("Path '{path}' is not in the allowed paths"),
                suggestion: None,
                policy_tag: "filesystem.allowedPaths",
            };
        }

        if let Some(size) = content_size {
            if size > fs.max_file_size {
                return Decision::Deny {
                    reason: format!(
                        "File content of {size} bytes exceeds the {} byte limit",
                        fs.max_file_size
                    ),
                    suggestion: None,
                    policy_tag: "filesystem.maxFileSize",
                };
            }
        }

        Decision::Allow
    }

    fn evaluate_shell(&self, command: &str) -> Decision {
        let shell = &self.policy.shell;

        if !shell.enabled {
            return Decision::Deny {
                reason: "Shell access is disabled".to_string(),
                suggestion: None,
                policy_tag: "shell.enabled",
            };
        }

        for pattern in &shell.blocked_patterns {
            if command.contains(pattern.as_str()) {
                return Decision::Deny {
                    reason: format!("Command contains blocked pattern '{pattern}'"),
                    suggestion: None,
                    policy_tag: "shell.blockedPatterns",
                };
            }
        }

        if !shell.allowed_commands.is_empty() {
            let base = base_token(command);
            if !shell.allowed_commands.iter().any(|c| c == base) {
                return Decision::Deny {
                    reason: format!("Command '{base}' is not in the allowed commands"),
                    suggestion: Some(format!(
                        "Allowed commands: {}",
                        shell.allowed_commands.join(", ")
                    )),
                    policy_tag: "shell.allowedCommands",
                };
            }
        }

        for pattern in &shell.approval_required {
            if command.contains(pattern.as_str()) {
                return Decision::RequireApproval {
                    reason: format!("Command matches pattern '{pattern}' which requires approval"),
                    policy_tag: "shell.approvalRequired",
                };
            }
        }

        Decision::Allow
    }
}

/// The command's base token: trim, then everything up to the first ASCII
/// space. Tabs are not delimiters.
fn base_token(command: &str) -> &str {
    let trimmed = command.trim();
    trimmed.split_once(' ').map_or(trimmed, |(base, _)| base)
}
