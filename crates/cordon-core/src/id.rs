//! Prefixed opaque identifiers.
//!
//! Every externally visible entity carries a typed identifier: a short
//! prefix naming the kind, an underscore, and a 12-character lowercase
//! hex suffix drawn from UUID entropy. Identifiers serialize as plain
//! strings and parse back with prefix checking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Length of the opaque suffix after the prefix.
const SUFFIX_LEN: usize = 12;

/// Generate a fresh 12-character lowercase suffix.
fn fresh_suffix() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..SUFFIX_LEN].to_string()
}

/// Check that a suffix is exactly 12 lowercase hex/alphanumeric characters.
fn suffix_is_valid(suffix: &str) -> bool {
    suffix.len() == SUFFIX_LEN
        && suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Error produced when parsing a prefixed identifier fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id `{value}`: expected `{prefix}` + 12 alphanumeric chars")]
pub struct IdParseError {
    /// The entity kind whose id failed to parse.
    pub kind: &'static str,
    /// The expected prefix, including the underscore.
    pub prefix: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! prefixed_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Allocate a fresh identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}{}", $prefix, fresh_suffix()))
            }

            /// The full identifier string, prefix included.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.strip_prefix($prefix) {
                    Some(suffix) if suffix_is_valid(suffix) => Ok(Self(s.to_string())),
                    _ => Err(IdParseError {
                        kind: $kind,
                        prefix: $prefix,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

prefixed_id!(
    /// Identifier of a space (`spc_` prefix).
    SpaceId,
    "space",
    "spc_"
);

prefixed_id!(
    /// Identifier of a run (`run_` prefix).
    RunId,
    "run",
    "run_"
);

prefixed_id!(
    /// Identifier of an approval record (`apr_` prefix).
    ApprovalId,
    "approval",
    "apr_"
);

/// Identifier of a sandbox workspace directory: a bare 12-character suffix
/// with no prefix, used as the directory name under the workspace base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Allocate a fresh workspace identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(fresh_suffix())
    }

    /// The identifier as a path-safe string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WorkspaceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if suffix_is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(IdParseError {
                kind: "workspace",
                prefix: "",
                value: s.to_string(),
            })
        }
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_carry_prefix() {
        assert!(SpaceId::generate().as_str().starts_with("spc_"));
        assert!(RunId::generate().as_str().starts_with("run_"));
        assert!(ApprovalId::generate().as_str().starts_with("apr_"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SpaceId::generate();
        let b = SpaceId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_suffix_length() {
        let id = RunId::generate();
        assert_eq!(id.as_str().len(), "run_".len() + 12);
    }

    #[test]
    fn test_parse_round_trip() {
        let id = SpaceId::generate();
        let parsed: SpaceId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        let err = "run_0123456789ab".parse::<SpaceId>().unwrap_err();
        assert_eq!(err.prefix, "spc_");
    }

    #[test]
    fn test_parse_rejects_short_suffix() {
        assert!("spc_abc".parse::<SpaceId>().is_err());
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!("spc_0123456789AB".parse::<SpaceId>().is_err());
    }

    #[test]
    fn test_workspace_id_is_bare() {
        let id = WorkspaceId::generate();
        assert_eq!(id.as_str().len(), 12);
        assert!(id.as_str().parse::<WorkspaceId>().is_ok());
    }

    #[test]
    fn test_serde_transparent() {
        let id = RunId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
