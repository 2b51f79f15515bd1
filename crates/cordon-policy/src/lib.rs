//! Cordon Policy — per-space rules and the decision engine.
//!
//! A [`Policy`] is immutable for the lifetime of its space: three sections
//! (filesystem, shell, network) built from a named preset with optional
//! field-level overrides. The [`PolicyEngine`] evaluates one operation at a
//! time into a [`Decision`]: allow, deny with a reason, or require human
//! approval. Evaluation is pure: no I/O, no logging, deterministic order.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod engine;
pub mod model;
pub mod pattern;

pub use engine::{Decision, PolicyEngine};
pub use model::{
    FilesystemOverrides, FilesystemPolicy, NetworkOverrides, NetworkPolicy, Policy,
    PolicyOverrides, PolicyPreset, PresetParseError, ShellOverrides, ShellPolicy,
};
pub use pattern::{domain_matches, path_matches};
