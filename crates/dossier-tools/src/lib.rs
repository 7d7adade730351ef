//! Dossier Tools - the closed analyzer manifest and execution facade
//!
//! Every probe the investigation can run is an entry in the manifest.
//! The facade maps manifest entries to external analyzer processes;
//! nothing here executes arbitrary commands.

pub mod bench;
pub mod harvest;
pub mod manifest;

pub use bench::{RawInvocation, ToolBench};
pub use manifest::{ToolKind, ToolManifest, ToolSpec};
