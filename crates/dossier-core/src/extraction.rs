//! Metadata shape supplied by the extraction collaborator. The pipeline
//! itself lives in dossier-extract; the case record only stores its
//! summary.

use serde::{Deserialize, Serialize};

/// Where in the file a URL was found.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// From a `/URI` link annotation value.
    Annotation,
    /// From plain text in the raw bytes.
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedUrl {
    pub url: String,
    pub kind: UrlKind,
    /// http/https scheme pointing off the document.
    pub is_external: bool,
}

/// Aggregated collaborator output. Hashes and page count are required;
/// URLs degrade to empty on extraction failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub sha256: String,
    pub sha1: String,
    pub md5: String,
    /// Heuristic census of page objects; best-effort without a renderer.
    pub page_count: u32,
    /// Whether the file starts with a `%PDF` header.
    pub pdf_header: bool,
    pub urls: Vec<ExtractedUrl>,
}
