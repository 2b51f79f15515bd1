//! Operation variants — the instructions a caller submits to a space.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Maximum length of any relative path, in bytes.
pub const MAX_PATH_LEN: usize = 255;

/// Maximum size of file content, in bytes (10 MiB).
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum length of a shell command, in characters.
pub const MAX_COMMAND_LEN: usize = 4096;

/// Maximum length of a message operation's content, in characters.
pub const MAX_MESSAGE_LEN: usize = 100_000;

/// Inclusive lower bound for a requested shell timeout, in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 1_000;

/// Inclusive upper bound for a requested shell timeout, in milliseconds (1 h).
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// Content encoding for file reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Content is the UTF-8 text itself.
    #[default]
    Utf8,
    /// Content is standard base64 over the raw bytes.
    Base64,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => f.write_str("utf8"),
            Self::Base64 => f.write_str("base64"),
        }
    }
}

/// A single search-and-replace edit applied by an `editFile` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdit {
    /// Exact text to locate; the first occurrence is replaced.
    pub old_content: String,
    /// Replacement text.
    pub new_content: String,
}

/// An instruction evaluated by the policy engine and dispatched to the
/// sandbox. One event is recorded per evaluated operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// Non-executing narration; always allowed, always succeeds.
    #[serde(rename_all = "camelCase")]
    Message {
        /// Caller-supplied correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// The narration text.
        content: String,
    },
    /// Write a new file into the workspace.
    #[serde(rename_all = "camelCase")]
    CreateFile {
        /// Caller-supplied correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Workspace-relative destination path.
        path: String,
        /// File content, interpreted per `encoding`.
        content: String,
        /// How `content` encodes the file bytes.
        #[serde(default)]
        encoding: Encoding,
        /// Whether an existing file at `path` may be replaced.
        #[serde(default)]
        overwrite: bool,
    },
    /// Read a file from the workspace.
    #[serde(rename_all = "camelCase")]
    ReadFile {
        /// Caller-supplied correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Workspace-relative source path.
        path: String,
        /// Requested encoding for the returned content.
        #[serde(default)]
        encoding: Encoding,
    },
    /// Apply ordered search-and-replace edits to an existing file.
    #[serde(rename_all = "camelCase")]
    EditFile {
        /// Caller-supplied correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Workspace-relative target path.
        path: String,
        /// Edits applied in order; must be non-empty.
        edits: Vec<FileEdit>,
    },
    /// Remove a file from the workspace.
    #[serde(rename_all = "camelCase")]
    DeleteFile {
        /// Caller-supplied correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Workspace-relative target path.
        path: String,
    },
    /// Execute a shell command inside the space's container.
    #[serde(rename_all = "camelCase")]
    Shell {
        /// Caller-supplied correlation id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// The command line, run via `sh -c`.
        command: String,
        /// Working directory relative to the container workdir.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        /// Requested timeout in milliseconds; clamped by policy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        /// Extra environment variables for this command.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<HashMap<String, String>>,
    },
}

/// The discriminant of an [`Operation`], used in events and approvals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    /// `message`
    Message,
    /// `createFile`
    CreateFile,
    /// `readFile`
    ReadFile,
    /// `editFile`
    EditFile,
    /// `deleteFile`
    DeleteFile,
    /// `shell`
    Shell,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Message => "message",
            Self::CreateFile => "createFile",
            Self::ReadFile => "readFile",
            Self::EditFile => "editFile",
            Self::DeleteFile => "deleteFile",
            Self::Shell => "shell",
        };
        f.write_str(s)
    }
}

impl Operation {
    /// The caller-supplied correlation id, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Message { id, .. }
            | Self::CreateFile { id, .. }
            | Self::ReadFile { id, .. }
            | Self::EditFile { id, .. }
            | Self::DeleteFile { id, .. }
            | Self::Shell { id, .. } => id.as_deref(),
        }
    }

    /// The discriminant of this operation.
    #[must_use]
    pub fn op_type(&self) -> OperationType {
        match self {
            Self::Message { .. } => OperationType::Message,
            Self::CreateFile { .. } => OperationType::CreateFile,
            Self::ReadFile { .. } => OperationType::ReadFile,
            Self::EditFile { .. } => OperationType::EditFile,
            Self::DeleteFile { .. } => OperationType::DeleteFile,
            Self::Shell { .. } => OperationType::Shell,
        }
    }

    /// The workspace-relative path this operation touches, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::CreateFile { path, .. }
            | Self::ReadFile { path, .. }
            | Self::EditFile { path, .. }
            | Self::DeleteFile { path, .. } => Some(path),
            Self::Message { .. } | Self::Shell { .. } => None,
        }
    }

    /// Whether this operation writes to the filesystem.
    #[must_use]
    pub fn is_filesystem_write(&self) -> bool {
        matches!(
            self,
            Self::CreateFile { .. } | Self::EditFile { .. } | Self::DeleteFile { .. }
        )
    }

    /// Whether this operation touches the filesystem at all.
    #[must_use]
    pub fn is_filesystem(&self) -> bool {
        self.path().is_some()
    }
}
