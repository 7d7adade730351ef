//! Dossier Core - investigation data model, errors, and configuration

pub mod case;
pub mod config;
pub mod error;
pub mod extraction;
pub mod locker;
pub mod report;
pub mod types;

pub use case::{CaseRecord, FileIdentity};
pub use config::DossierConfig;
pub use error::{Error, Result};
pub use extraction::{ExtractedUrl, ExtractionSummary, UrlKind};
pub use locker::{Artifact, ArtifactBody, ArtifactKind, ArtifactOrigin, EvidenceLocker};
pub use report::{finalize, Report};
pub use types::*;
