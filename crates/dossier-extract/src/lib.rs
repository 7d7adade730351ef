//! Dossier Extract - standalone metadata pipeline for candidate files
//!
//! Runs independently of the investigation: hashes, header and page
//! heuristics, and URL extraction. The controller only ever sees the
//! aggregated `ExtractionSummary`.

pub mod hashing;
pub mod pipeline;
pub mod urls;

pub use hashing::{hash_file, FileHashes};
pub use pipeline::extract;
pub use urls::extract_urls;
