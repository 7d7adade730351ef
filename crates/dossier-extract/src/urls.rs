//! URL extraction from raw PDF bytes

use dossier_core::{ExtractedUrl, UrlKind};
use regex::Regex;
use std::sync::OnceLock;

fn annotation_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/URI\s*\(([^)]+)\)").ok()).as_ref()
}

fn text_url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // Printable ASCII only; control bytes and lossy-decode replacement
    // chars terminate a match instead of being swallowed into the URL.
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"')\]\x00-\x1f\x7f-\x{10ffff}]+"#).ok())
        .as_ref()
}

/// Finds `/URI` annotation values and plain-text `http(s)://` matches
/// in the raw bytes (decoded lossily). Deduplicated on the URL string;
/// an annotation hit wins over a later text hit of the same URL.
pub fn extract_urls(bytes: &[u8]) -> Vec<ExtractedUrl> {
    let text = String::from_utf8_lossy(bytes);
    let mut found: Vec<ExtractedUrl> = Vec::new();

    if let Some(re) = annotation_regex() {
        for cap in re.captures_iter(&text) {
            if let Some(value) = cap.get(1) {
                push_unique(&mut found, value.as_str(), UrlKind::Annotation);
            }
        }
    }
    if let Some(re) = text_url_regex() {
        for m in re.find_iter(&text) {
            push_unique(&mut found, m.as_str(), UrlKind::Text);
        }
    }

    found
}

fn push_unique(found: &mut Vec<ExtractedUrl>, raw: &str, kind: UrlKind) {
    let url = raw.trim().trim_end_matches(['.', ',', ';']).to_string();
    if url.is_empty() || found.iter().any(|u| u.url == url) {
        return;
    }
    let is_external = is_external(&url);
    found.push(ExtractedUrl { url, kind, is_external });
}

/// An http(s) URL whose host is not a loopback name.
fn is_external(url: &str) -> bool {
    let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or("")
    } else {
        authority.split(':').next().unwrap_or("")
    };
    !matches!(host, "" | "localhost" | "127.0.0.1" | "::1")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_and_text_urls_are_classified() {
        let bytes = b"<< /Type /Action /S /URI /URI (http://phish.example/login) >>\n\
                      some text with https://cdn.example/lib.js inside";
        let urls = extract_urls(bytes);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].url, "http://phish.example/login");
        assert_eq!(urls[0].kind, UrlKind::Annotation);
        assert!(urls[0].is_external);
        assert_eq!(urls[1].kind, UrlKind::Text);
    }

    #[test]
    fn annotation_hit_wins_over_text_duplicate() {
        let bytes = b"/URI (https://dup.example/x) and later https://dup.example/x again";
        let urls = extract_urls(bytes);
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].kind, UrlKind::Annotation);
    }

    #[test]
    fn loopback_and_non_http_are_not_external() {
        let bytes = b"/URI (mailto:victim@example.com) /URI (http://localhost:8000/x)";
        let urls = extract_urls(bytes);
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| !u.is_external));
    }

    #[test]
    fn bracketed_ipv6_loopback_is_not_external() {
        assert!(!is_external("http://[::1]/admin"));
        assert!(!is_external("http://[::1]:8080/admin"));
        assert!(is_external("http://[2001:db8::1]/x"));
    }

    #[test]
    fn binary_garbage_around_urls_is_tolerated() {
        let mut bytes = vec![0xff, 0xfe, 0x00];
        bytes.extend_from_slice(b"http://buried.example/a");
        bytes.extend_from_slice(&[0x00, 0x9c]);
        let urls = extract_urls(&bytes);
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url, "http://buried.example/a");
    }

    #[test]
    fn no_urls_yields_empty_vec() {
        assert!(extract_urls(b"%PDF-1.7 plain document").is_empty());
    }
}
