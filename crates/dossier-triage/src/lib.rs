//! Dossier Triage - the investigation workflow controller
//!
//! Drives one case through triage, interrogation, and strategic review
//! until a verdict freezes the record. Safety bounds live here: the
//! step circuit breaker, queue-exhaustion conclusion, and the
//! conservative default when the oracle fails twice.

pub mod controller;
pub mod snapshot;

pub use controller::{Investigator, InvestigatorConfig};
pub use snapshot::SnapshotBuilder;
