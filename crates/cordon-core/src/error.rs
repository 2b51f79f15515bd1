//! Error taxonomy for boundary failures.
//!
//! Five categories classify every failure that can cross the Cordon
//! boundary. Validation and System errors fail the enclosing call; Policy,
//! Execution, and Timeout failures are absorbed into the event stream and
//! never surface as top-level errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a boundary failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed envelope or operation, rejected before execution.
    Validation,
    /// Denied or gated by policy; becomes an event, not an error.
    Policy,
    /// Per-operation runtime failure inside the sandbox.
    Execution,
    /// Shell exceeded its effective timeout.
    Timeout,
    /// Container runtime or registry failure; the call cannot proceed.
    System,
}

impl ErrorCategory {
    /// Whether failures of this category fail the enclosing request.
    #[must_use]
    pub fn fails_request(self) -> bool {
        matches!(self, Self::Validation | Self::System)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Policy => "policy",
            Self::Execution => "execution",
            Self::Timeout => "timeout",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::System.to_string(), "system");
    }

    #[test]
    fn test_only_validation_and_system_fail_requests() {
        assert!(ErrorCategory::Validation.fails_request());
        assert!(ErrorCategory::System.fails_request());
        assert!(!ErrorCategory::Policy.fails_request());
        assert!(!ErrorCategory::Execution.fails_request());
        assert!(!ErrorCategory::Timeout.fails_request());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&ErrorCategory::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
