//! Integration tests for the extraction pipeline

use dossier_core::UrlKind;
use dossier_extract::extract;
use std::path::{Path, PathBuf};

// ============================================================================
// Test helpers
// ============================================================================

fn scratch_file(name: &str, content: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "dossier_extract_{}_{}_{}",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::write(&path, content).unwrap();
    path
}

fn cleanup(path: &Path) {
    let _ = std::fs::remove_file(path);
}

const SAMPLE: &[u8] = b"%PDF-1.7\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n\
4 0 obj\n<< /Type /Page /Parent 2 0 R /Annots [5 0 R] >>\nendobj\n\
5 0 obj\n<< /Type /Annot /A << /S /URI /URI (http://landing.example/doc) >> >>\nendobj\n\
%%EOF\n";

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn full_pipeline_aggregates_all_fields() {
    let path = scratch_file("full", SAMPLE);
    let summary = extract(&path).await.unwrap();

    assert!(summary.pdf_header);
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.sha256.len(), 64);
    assert_eq!(summary.sha1.len(), 40);
    assert_eq!(summary.md5.len(), 32);
    assert_eq!(summary.urls.len(), 1);
    assert_eq!(summary.urls[0].url, "http://landing.example/doc");
    assert_eq!(summary.urls[0].kind, UrlKind::Annotation);
    assert!(summary.urls[0].is_external);
    cleanup(&path);
}

#[tokio::test]
async fn hashes_are_stable_across_runs() {
    let path = scratch_file("stable", SAMPLE);
    let first = extract(&path).await.unwrap();
    let second = extract(&path).await.unwrap();
    assert_eq!(first.sha256, second.sha256);
    assert_eq!(first.sha1, second.sha1);
    assert_eq!(first.md5, second.md5);
    cleanup(&path);
}

#[tokio::test]
async fn missing_header_is_a_flag_not_a_failure() {
    let path = scratch_file("magicless", b"GARBAGE\n<< /Type /Page >>\n");
    let summary = extract(&path).await.unwrap();
    assert!(!summary.pdf_header);
    assert_eq!(summary.page_count, 1);
    cleanup(&path);
}

#[tokio::test]
async fn urls_degrade_to_empty_when_none_exist() {
    let path = scratch_file("nourls", b"%PDF-1.4\n<< /Type /Page >>\n");
    let summary = extract(&path).await.unwrap();
    assert!(summary.urls.is_empty());
    cleanup(&path);
}

// ============================================================================
// Required-field failures
// ============================================================================

#[tokio::test]
async fn missing_file_fails() {
    let path = std::env::temp_dir().join("dossier_extract_no_such_file.pdf");
    assert!(extract(&path).await.is_err());
}

#[tokio::test]
async fn empty_file_fails() {
    let path = scratch_file("empty", b"");
    assert!(extract(&path).await.is_err());
    cleanup(&path);
}
