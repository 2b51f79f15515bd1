//! Host-side workspace file primitives.
//!
//! The workspace directory is the host half of the bind mount. All paths
//! arriving here are workspace-relative and re-checked against the trust
//! boundary invariants before touching the filesystem; a path that fails to
//! resolve under the root yields a failure result, never an escape.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use cordon_protocol::{validate_path, Encoding, FileEdit};

use crate::result::{DeleteResult, EditResult, FileEntry, ReadResult, WriteResult};

/// Failure message for paths that do not resolve under the root.
const OUTSIDE_WORKSPACE: &str = "Path is outside workspace";

/// Number of probe characters echoed back when an edit does not match.
const EDIT_PROBE_CHARS: usize = 50;

/// The host directory backing one sandbox.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Wrap an existing workspace root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the workspace directory under `base`, named by `id`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be
    /// created.
    pub async fn provision(base: &Path, id: &str) -> std::io::Result<Self> {
        let root = base.join(id);
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The absolute host path of the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root, or refuse it.
    ///
    /// Re-validates the trust-boundary invariants, then joins component by
    /// component (only normal segments survive) and string-prefix checks
    /// the result against the root.
    fn resolve(&self, rel: &str) -> Option<PathBuf> {
        validate_path(rel).ok()?;
        let mut resolved = self.root.clone();
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        resolved.starts_with(&self.root).then_some(resolved)
    }

    /// Write a new file, decoding `content` per `encoding`.
    pub async fn create_file(
        &self,
        rel: &str,
        content: &str,
        encoding: Encoding,
        overwrite: bool,
    ) -> WriteResult {
        let Some(path) = self.resolve(rel) else {
            return WriteResult::failure(OUTSIDE_WORKSPACE);
        };
        if !overwrite && fs::try_exists(&path).await.unwrap_or(false) {
            return WriteResult::failure("File already exists");
        }
        let bytes = match encoding {
            Encoding::Utf8 => content.as_bytes().to_vec(),
            Encoding::Base64 => match BASE64.decode(content) {
                Ok(bytes) => bytes,
                Err(_) => return WriteResult::failure("Invalid base64 content"),
            },
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return WriteResult::failure(format!("Failed to create parent directory: {e}"));
            }
        }
        match fs::write(&path, &bytes).await {
            Ok(()) => WriteResult::written(bytes.len() as u64),
            Err(e) => WriteResult::failure(format!("Failed to write file: {e}")),
        }
    }

    /// Read a file, returning content in the requested encoding.
    pub async fn read_file(&self, rel: &str, encoding: Encoding) -> ReadResult {
        let Some(path) = self.resolve(rel) else {
            return ReadResult::failure(OUTSIDE_WORKSPACE);
        };
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ReadResult::failure("File not found");
            }
            Err(e) => return ReadResult::failure(format!("Failed to read file: {e}")),
        };
        let size = bytes.len() as u64;
        let content = match encoding {
            Encoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
            Encoding::Base64 => BASE64.encode(&bytes),
        };
        ReadResult::read(content, encoding, size)
    }

    /// Apply ordered first-occurrence edits to a UTF-8 file.
    pub async fn edit_file(&self, rel: &str, edits: &[FileEdit]) -> EditResult {
        let Some(path) = self.resolve(rel) else {
            return EditResult::failure(OUTSIDE_WORKSPACE);
        };
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return EditResult::failure("File not found");
            }
            Err(e) => return EditResult::failure(format!("Failed to read file: {e}")),
        };
        let Ok(mut buffer) = String::from_utf8(bytes) else {
            return EditResult::failure("File is not valid UTF-8");
        };
        for edit in edits {
            if !buffer.contains(&edit.old_content) {
                let probe: String = edit.old_content.chars().take(EDIT_PROBE_CHARS).collect();
                return EditResult::failure(format!("Edit target not found: '{probe}'"));
            }
            buffer = buffer.replacen(&edit.old_content, &edit.new_content, 1);
        }
        match fs::write(&path, buffer.as_bytes()).await {
            Ok(()) => EditResult::applied(edits.len() as u64, buffer.len() as u64),
            Err(e) => EditResult::failure(format!("Failed to write file: {e}")),
        }
    }

    /// Unlink a file.
    pub async fn delete_file(&self, rel: &str) -> DeleteResult {
        let Some(path) = self.resolve(rel) else {
            return DeleteResult::failure(OUTSIDE_WORKSPACE);
        };
        match fs::remove_file(&path).await {
            Ok(()) => DeleteResult::deleted(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                DeleteResult::failure("File not found")
            }
            Err(e) => DeleteResult::failure(format!("Failed to delete file: {e}")),
        }
    }

    /// List entries under `rel`, depth-first pre-order, directories before
    /// their contents. A missing directory lists as empty.
    pub async fn list_files(&self, rel: &str, recursive: bool) -> Vec<FileEntry> {
        let Some(dir) = (if rel.is_empty() {
            Some(self.root.clone())
        } else {
            self.resolve(rel)
        }) else {
            return Vec::new();
        };
        let mut entries = Vec::new();
        self.collect_entries(&dir, recursive, &mut entries).await;
        entries
    }

    /// Depth-first pre-order via an explicit stack: an entry is emitted when
    /// popped, and a directory's children (sorted by name) are pushed in
    /// reverse so they pop in listing order, immediately after their parent.
    async fn collect_entries(&self, dir: &Path, recursive: bool, out: &mut Vec<FileEntry>) {
        let mut stack = Vec::new();
        push_children_reversed(dir, &mut stack).await;
        while let Some(path) = stack.pop() {
            let Ok(metadata) = fs::metadata(&path).await else {
                continue;
            };
            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let rel_path = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            let is_directory = metadata.is_dir();
            out.push(FileEntry {
                path: rel_path,
                size: if is_directory { 0 } else { metadata.len() },
                is_directory,
                modified_at,
            });
            if recursive && is_directory {
                push_children_reversed(&path, &mut stack).await;
            }
        }
    }

    /// Recursively delete the workspace directory.
    pub async fn remove(&self) -> std::io::Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Read `dir`'s children sorted by name and push them reversed.
async fn push_children_reversed(dir: &Path, stack: &mut Vec<PathBuf>) {
    let Ok(mut read_dir) = fs::read_dir(dir).await else {
        return;
    };
    let mut children = Vec::new();
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        children.push(entry.path());
    }
    children.sort();
    for child in children.into_iter().rev() {
        stack.push(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn workspace() -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::provision(dir.path(), "abcdef012345").await.unwrap();
        (dir, ws)
    }

    #[tokio::test]
    async fn test_create_and_read_round_trip() {
        let (_dir, ws) = workspace().await;
        let write = ws.create_file("a.txt", "hello", Encoding::Utf8, false).await;
        assert!(write.success);
        assert_eq!(write.bytes_written, Some(5));

        let read = ws.read_file("a.txt", Encoding::Utf8).await;
        assert!(read.success);
        assert_eq!(read.content.as_deref(), Some("hello"));
        assert_eq!(read.size, Some(5));
    }

    #[tokio::test]
    async fn test_base64_round_trip() {
        let (_dir, ws) = workspace().await;
        let encoded = BASE64.encode(b"\x00\x01binary");
        let write = ws
            .create_file("blob.bin", &encoded, Encoding::Base64, false)
            .await;
        assert!(write.success);
        assert_eq!(write.bytes_written, Some(8));

        let read = ws.read_file("blob.bin", Encoding::Base64).await;
        assert_eq!(read.content.as_deref(), Some(encoded.as_str()));
        assert_eq!(read.size, Some(8));
    }

    #[tokio::test]
    async fn test_invalid_base64_is_a_failure_value() {
        let (_dir, ws) = workspace().await;
        let write = ws
            .create_file("blob.bin", "not base64!!", Encoding::Base64, false)
            .await;
        assert!(!write.success);
        assert_eq!(write.error.as_deref(), Some("Invalid base64 content"));
    }

    #[tokio::test]
    async fn test_no_overwrite_preserves_existing_bytes() {
        let (_dir, ws) = workspace().await;
        assert!(ws.create_file("a.txt", "first", Encoding::Utf8, false).await.success);

        let second = ws.create_file("a.txt", "second", Encoding::Utf8, false).await;
        assert!(!second.success);
        assert_eq!(second.error.as_deref(), Some("File already exists"));

        let read = ws.read_file("a.txt", Encoding::Utf8).await;
        assert_eq!(read.content.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_overwrite_replaces() {
        let (_dir, ws) = workspace().await;
        assert!(ws.create_file("a.txt", "first", Encoding::Utf8, false).await.success);
        assert!(ws.create_file("a.txt", "second", Encoding::Utf8, true).await.success);
        let read = ws.read_file("a.txt", Encoding::Utf8).await;
        assert_eq!(read.content.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_parent_directories_created_on_demand() {
        let (_dir, ws) = workspace().await;
        let write = ws
            .create_file("deep/nested/file.txt", "x", Encoding::Utf8, false)
            .await;
        assert!(write.success);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let (_dir, ws) = workspace().await;
        let read = ws.read_file("ghost.txt", Encoding::Utf8).await;
        assert!(!read.success);
        assert_eq!(read.error.as_deref(), Some("File not found"));
    }

    #[tokio::test]
    async fn test_path_escape_refused() {
        let (_dir, ws) = workspace().await;
        for bad in ["../escape.txt", "/etc/passwd", "a/../../b"] {
            let write = ws.create_file(bad, "x", Encoding::Utf8, false).await;
            assert!(!write.success, "path {bad} should be refused");
            assert_eq!(write.error.as_deref(), Some(OUTSIDE_WORKSPACE));
        }
    }

    #[tokio::test]
    async fn test_edit_applies_in_order() {
        let (_dir, ws) = workspace().await;
        ws.create_file("f.txt", "aaa bbb aaa", Encoding::Utf8, false).await;

        let result = ws
            .edit_file(
                "f.txt",
                &[
                    FileEdit {
                        old_content: "aaa".to_string(),
                        new_content: "xxx".to_string(),
                    },
                    FileEdit {
                        old_content: "bbb".to_string(),
                        new_content: "yyy".to_string(),
                    },
                ],
            )
            .await;
        assert!(result.success);
        assert_eq!(result.edits_applied, Some(2));

        // Only the first occurrence of "aaa" was replaced.
        let read = ws.read_file("f.txt", Encoding::Utf8).await;
        assert_eq!(read.content.as_deref(), Some("xxx yyy aaa"));
    }

    #[tokio::test]
    async fn test_edit_unmatched_probe_aborts_without_writing() {
        let (_dir, ws) = workspace().await;
        ws.create_file("f.txt", "hello", Encoding::Utf8, false).await;

        let long_probe = "z".repeat(80);
        let result = ws
            .edit_file(
                "f.txt",
                &[FileEdit {
                    old_content: long_probe,
                    new_content: "y".to_string(),
                }],
            )
            .await;
        assert!(!result.success);
        // The error echoes only the first 50 characters of the probe.
        let error = result.error.unwrap();
        assert!(error.contains(&"z".repeat(50)));
        assert!(!error.contains(&"z".repeat(51)));

        let read = ws.read_file("f.txt", Encoding::Utf8).await;
        assert_eq!(read.content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_edit_later_failure_leaves_file_untouched() {
        let (_dir, ws) = workspace().await;
        ws.create_file("f.txt", "one two", Encoding::Utf8, false).await;

        let result = ws
            .edit_file(
                "f.txt",
                &[
                    FileEdit {
                        old_content: "one".to_string(),
                        new_content: "1".to_string(),
                    },
                    FileEdit {
                        old_content: "three".to_string(),
                        new_content: "3".to_string(),
                    },
                ],
            )
            .await;
        assert!(!result.success);
        let read = ws.read_file("f.txt", Encoding::Utf8).await;
        assert_eq!(read.content.as_deref(), Some("one two"));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, ws) = workspace().await;
        ws.create_file("f.txt", "x", Encoding::Utf8, false).await;
        assert!(ws.delete_file("f.txt").await.success);
        assert!(!ws.delete_file("f.txt").await.success);
    }

    #[tokio::test]
    async fn test_list_files_recursive_pre_order() {
        let (_dir, ws) = workspace().await;
        ws.create_file("b.txt", "1", Encoding::Utf8, false).await;
        ws.create_file("a/inner.txt", "22", Encoding::Utf8, false).await;

        let entries = ws.list_files("", true).await;
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        // Directory `a` is listed before descent into it.
        assert_eq!(paths, vec!["a", "a/inner.txt", "b.txt"]);
        assert!(entries[0].is_directory);
        assert_eq!(entries[1].size, 2);
    }

    #[tokio::test]
    async fn test_list_files_non_recursive() {
        let (_dir, ws) = workspace().await;
        ws.create_file("a/inner.txt", "x", Encoding::Utf8, false).await;
        ws.create_file("top.txt", "x", Encoding::Utf8, false).await;

        let entries = ws.list_files("", false).await;
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "top.txt"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let (_dir, ws) = workspace().await;
        assert!(ws.list_files("nope", true).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_dir, ws) = workspace().await;
        ws.remove().await.unwrap();
        ws.remove().await.unwrap();
    }
}
