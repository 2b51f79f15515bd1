//! Structured results returned by sandbox primitives.
//!
//! Failures are values: every primitive reports what happened through one
//! of these types, and the run executor turns them into events verbatim.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use cordon_protocol::Encoding;

/// Outcome of a `create_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Whether the write happened.
    pub success: bool,
    /// Bytes written on success.
    pub bytes_written: Option<u64>,
    /// Failure detail.
    pub error: Option<String>,
}

impl WriteResult {
    /// A successful write of `bytes` bytes.
    #[must_use]
    pub fn written(bytes: u64) -> Self {
        Self {
            success: true,
            bytes_written: Some(bytes),
            error: None,
        }
    }

    /// A failed write.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            bytes_written: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a `read_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    /// Whether the read happened.
    pub success: bool,
    /// Content in the requested encoding.
    pub content: Option<String>,
    /// Encoding of `content`.
    pub encoding: Option<Encoding>,
    /// File size in bytes.
    pub size: Option<u64>,
    /// Failure detail.
    pub error: Option<String>,
}

impl ReadResult {
    /// A successful read.
    #[must_use]
    pub fn read(content: String, encoding: Encoding, size: u64) -> Self {
        Self {
            success: true,
            content: Some(content),
            encoding: Some(encoding),
            size: Some(size),
            error: None,
        }
    }

    /// A failed read.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            encoding: None,
            size: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of an `edit_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    /// Whether all edits applied.
    pub success: bool,
    /// Number of edits applied on success.
    pub edits_applied: Option<u64>,
    /// Final file size in bytes on success.
    pub size: Option<u64>,
    /// Failure detail.
    pub error: Option<String>,
}

impl EditResult {
    /// All edits applied; the file is `size` bytes now.
    #[must_use]
    pub fn applied(edits: u64, size: u64) -> Self {
        Self {
            success: true,
            edits_applied: Some(edits),
            size: Some(size),
            error: None,
        }
    }

    /// A failed edit.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            edits_applied: None,
            size: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a `delete_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Whether the unlink happened.
    pub success: bool,
    /// Failure detail.
    pub error: Option<String>,
}

impl DeleteResult {
    /// A successful unlink.
    #[must_use]
    pub fn deleted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed unlink.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// One entry returned by `list_files`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Workspace-relative path.
    pub path: String,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

/// Parameters for one exec.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory relative to the container workdir.
    pub cwd: Option<String>,
    /// Extra environment overriding the sandbox base env.
    pub env: Option<HashMap<String, String>>,
    /// Effective wall-clock timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Outcome of an exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// True when the command exited zero without timing out.
    pub success: bool,
    /// Process exit code; 124 when timed out, 1 when the channel failed.
    pub exit_code: i64,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Measured wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the effective timeout expired.
    pub timed_out: bool,
}

impl ExecResult {
    /// The exec channel never started.
    #[must_use]
    pub fn channel_failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: 1,
            stdout: String::new(),
            stderr: reason.into(),
            duration_ms: 0,
            timed_out: false,
        }
    }
}
