//! Structural validation of untrusted envelopes.
//!
//! Serde alone rejects malformed input with a single opaque error. Callers
//! at the trust boundary need every offending field named, so validation
//! walks the raw JSON first, collecting [`ValidationIssue`]s with dotted
//! field paths (`operations.0.path`), and only then deserializes into the
//! typed variants. Unknown extra fields are tolerated; an unknown `type`
//! discriminant is not.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::envelope::{OperationsMessage, PROTOCOL_VERSION};
use crate::operation::{
    Operation, MAX_COMMAND_LEN, MAX_CONTENT_BYTES, MAX_MESSAGE_LEN, MAX_PATH_LEN, MAX_TIMEOUT_MS,
    MIN_TIMEOUT_MS,
};

/// Why a path failed the trust-boundary invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathViolation {
    /// Path starts with a separator.
    #[error("path must be relative")]
    Absolute,
    /// Path contains a parent-traversal segment.
    #[error("path must not contain `..` segments")]
    Traversal,
    /// Path contains a NUL byte.
    #[error("path must not contain NUL bytes")]
    NulByte,
    /// Path exceeds the length limit.
    #[error("path must be at most {MAX_PATH_LEN} bytes")]
    TooLong,
}

/// Check the four path invariants enforced wherever a path crosses a trust
/// boundary: relative, no `..` segment, no NUL, length ≤ 255.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn validate_path(path: &str) -> Result<(), PathViolation> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(PathViolation::Absolute);
    }
    if std::path::Path::new(path)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(PathViolation::Traversal);
    }
    if path.contains('\0') {
        return Err(PathViolation::NulByte);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(PathViolation::TooLong);
    }
    Ok(())
}

/// One offending field in an untrusted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path to the field (e.g. `operations.0.path`).
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate and parse a single untrusted operation.
///
/// # Errors
///
/// Returns every issue found; the list is non-empty on failure.
pub fn validate_operation(value: &Value) -> Result<Operation, Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    check_operation(value, "", &mut issues);
    if !issues.is_empty() {
        return Err(issues);
    }
    serde_json::from_value(value.clone())
        .map_err(|e| vec![ValidationIssue::new("", e.to_string())])
}

/// Validate and parse an untrusted batch envelope.
///
/// Beyond per-operation checks, the envelope must carry the exact
/// `protocolVersion` literal and an `operations` array.
///
/// # Errors
///
/// Returns every issue found across the envelope and its operations.
pub fn validate_operations_message(
    value: &Value,
) -> Result<OperationsMessage, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let Some(obj) = value.as_object() else {
        return Err(vec![ValidationIssue::new("", "expected a JSON object")]);
    };

    match obj.get("protocolVersion").and_then(Value::as_str) {
        Some(PROTOCOL_VERSION) => {}
        Some(other) => issues.push(ValidationIssue::new(
            "protocolVersion",
            format!("unsupported protocol version `{other}`; expected `{PROTOCOL_VERSION}`"),
        )),
        None => issues.push(ValidationIssue::new(
            "protocolVersion",
            format!("missing required field; expected `{PROTOCOL_VERSION}`"),
        )),
    }

    match obj.get("operations").and_then(Value::as_array) {
        Some(operations) => {
            for (i, op) in operations.iter().enumerate() {
                check_operation(op, &format!("operations.{i}"), &mut issues);
            }
        }
        None => issues.push(ValidationIssue::new(
            "operations",
            "missing required operations array",
        )),
    }

    if !issues.is_empty() {
        return Err(issues);
    }
    serde_json::from_value(value.clone())
        .map_err(|e| vec![ValidationIssue::new("", e.to_string())])
}

fn field_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn check_operation(value: &Value, prefix: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(obj) = value.as_object() else {
        issues.push(ValidationIssue::new(prefix, "expected a JSON object"));
        return;
    };

    if let Some(id) = obj.get("id") {
        if !id.is_string() {
            issues.push(ValidationIssue::new(
                field_path(prefix, "id"),
                "id must be a string",
            ));
        }
    }

    let op_type = match obj.get("type").and_then(Value::as_str) {
        Some(t) => t,
        None => {
            issues.push(ValidationIssue::new(
                field_path(prefix, "type"),
                "missing operation type",
            ));
            return;
        }
    };

    match op_type {
        "message" => check_message(obj, prefix, issues),
        "createFile" => check_create_file(obj, prefix, issues),
        "readFile" => {
            check_path_field(obj, prefix, issues);
            check_encoding_field(obj, prefix, issues);
        }
        "editFile" => check_edit_file(obj, prefix, issues),
        "deleteFile" => check_path_field(obj, prefix, issues),
        "shell" => check_shell(obj, prefix, issues),
        other => issues.push(ValidationIssue::new(
            field_path(prefix, "type"),
            format!("unknown operation type `{other}`"),
        )),
    }
}

fn require_string<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            issues.push(ValidationIssue::new(
                field_path(prefix, key),
                format!("{key} must be a string"),
            ));
            None
        }
        None => {
            issues.push(ValidationIssue::new(
                field_path(prefix, key),
                format!("missing required field {key}"),
            ));
            None
        }
    }
}

fn check_path_field(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(path) = require_string(obj, "path", prefix, issues) {
        if let Err(violation) = validate_path(path) {
            issues.push(ValidationIssue::new(
                field_path(prefix, "path"),
                violation.to_string(),
            ));
        }
    }
}

fn check_encoding_field(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(encoding) = obj.get("encoding") {
        match encoding.as_str() {
            Some("utf8" | "base64") => {}
            _ => issues.push(ValidationIssue::new(
                field_path(prefix, "encoding"),
                "encoding must be `utf8` or `base64`",
            )),
        }
    }
}

fn check_message(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(content) = require_string(obj, "content", prefix, issues) {
        if content.chars().count() > MAX_MESSAGE_LEN {
            issues.push(ValidationIssue::new(
                field_path(prefix, "content"),
                format!("content must be at most {MAX_MESSAGE_LEN} characters"),
            ));
        }
    }
}

fn check_create_file(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    check_path_field(obj, prefix, issues);
    if let Some(content) = require_string(obj, "content", prefix, issues) {
        if content.len() > MAX_CONTENT_BYTES {
            issues.push(ValidationIssue::new(
                field_path(prefix, "content"),
                format!("content must be at most {MAX_CONTENT_BYTES} bytes"),
            ));
        }
    }
    check_encoding_field(obj, prefix, issues);
    if let Some(overwrite) = obj.get("overwrite") {
        if !overwrite.is_boolean() {
            issues.push(ValidationIssue::new(
                field_path(prefix, "overwrite"),
                "overwrite must be a boolean",
            ));
        }
    }
}

fn check_edit_file(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    check_path_field(obj, prefix, issues);
    match obj.get("edits").and_then(Value::as_array) {
        Some(edits) if edits.is_empty() => {
            issues.push(ValidationIssue::new(
                field_path(prefix, "edits"),
                "edits must contain at least one edit",
            ));
        }
        Some(edits) => {
            for (j, edit) in edits.iter().enumerate() {
                let edit_prefix = format!("{}.{j}", field_path(prefix, "edits"));
                match edit.as_object() {
                    Some(edit_obj) => {
                        for key in ["oldContent", "newContent"] {
                            require_string(edit_obj, key, &edit_prefix, issues);
                        }
                    }
                    None => issues.push(ValidationIssue::new(edit_prefix, "expected an edit object")),
                }
            }
        }
        None => issues.push(ValidationIssue::new(
            field_path(prefix, "edits"),
            "missing required edits array",
        )),
    }
}

fn check_shell(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(command) = require_string(obj, "command", prefix, issues) {
        if command.chars().count() > MAX_COMMAND_LEN {
            issues.push(ValidationIssue::new(
                field_path(prefix, "command"),
                format!("command must be at most {MAX_COMMAND_LEN} characters"),
            ));
        }
    }
    if let Some(cwd) = obj.get("cwd") {
        match cwd.as_str() {
            Some(cwd) => {
                if let Err(violation) = validate_path(cwd) {
                    issues.push(ValidationIssue::new(
                        field_path(prefix, "cwd"),
                        violation.to_string(),
                    ));
                }
            }
            None => issues.push(ValidationIssue::new(
                field_path(prefix, "cwd"),
                "cwd must be a string",
            )),
        }
    }
    if let Some(timeout) = obj.get("timeoutMs") {
        match timeout.as_u64() {
            Some(ms) if (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&ms) => {}
            _ => issues.push(ValidationIssue::new(
                field_path(prefix, "timeoutMs"),
                format!("timeoutMs must be an integer between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"),
            )),
        }
    }
    if let Some(env) = obj.get("env") {
        match env.as_object() {
            Some(vars) => {
                for (key, val) in vars {
                    if !val.is_string() {
                        issues.push(ValidationIssue::new(
                            format!("{}.{key}", field_path(prefix, "env")),
                            "environment values must be strings",
                        ));
                    }
                }
            }
            None => issues.push(ValidationIssue::new(
                field_path(prefix, "env"),
                "env must be an object of string values",
            )),
        }
    }
}
