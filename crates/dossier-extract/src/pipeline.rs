//! The extraction pipeline: validate, then hash and scan concurrently

use crate::hashing::hash_file;
use crate::urls::extract_urls;
use dossier_core::{Error, ExtractionSummary, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn page_object_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // `/Type /Page` but not `/Type /Pages` (the page tree root).
    RE.get_or_init(|| Regex::new(r"/Type\s*/Page(?:[^s]|$)").ok())
        .as_ref()
}

/// Runs the full pipeline for one candidate file.
///
/// Hashes and the page census are required; URL extraction degrades to
/// an empty list. A missing `%PDF` header is recorded as a flag, not an
/// error, since malware routinely prepends garbage to the magic.
pub async fn extract(path: &Path) -> Result<ExtractionSummary> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::Extraction(format!("cannot read {}: {}", path.display(), e)))?;
    if bytes.is_empty() {
        return Err(Error::Extraction(format!("{} is empty", path.display())));
    }

    let pdf_header = bytes.starts_with(b"%PDF");
    if !pdf_header {
        warn!(path = %path.display(), "no %PDF header at offset 0");
    }
    let page_count = count_page_objects(&bytes);

    let (hashes, urls) = tokio::join!(hash_file(path), async { extract_urls(&bytes) });
    let hashes = hashes?;
    debug!(
        path = %path.display(),
        pages = page_count,
        urls = urls.len(),
        "extraction complete"
    );

    Ok(ExtractionSummary {
        sha256: hashes.sha256,
        sha1: hashes.sha1,
        md5: hashes.md5,
        page_count,
        pdf_header,
        urls,
    })
}

/// Heuristic page census over the raw bytes. Counts `/Type /Page`
/// dictionaries; objects hidden inside compressed streams are missed,
/// which is acceptable for triage metadata.
pub fn count_page_objects(bytes: &[u8]) -> u32 {
    let Some(re) = page_object_regex() else {
        return 0;
    };
    let text = String::from_utf8_lossy(bytes);
    re.find_iter(&text).count() as u32
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_census_skips_the_pages_tree_root() {
        let bytes = b"<< /Type /Pages /Count 2 >>\n<< /Type /Page >>\n<< /Type/Page >>";
        assert_eq!(count_page_objects(bytes), 2);
    }

    #[test]
    fn page_census_handles_page_at_end_of_input() {
        assert_eq!(count_page_objects(b"<< /Type /Page"), 1);
    }
}
