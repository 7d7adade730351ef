//! Deterministic evidence harvesting from analyzer output
//!
//! Locker entries come from exactly two producers: triage seeding and
//! the facade. The facade side is this module, so what lands in the
//! locker is parsed from tool output, never taken from oracle text.

use dossier_core::{AttackLink, Indicator, IndicatorKind};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"')\]]+"#).ok())
        .as_ref()
}

fn uri_value_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/URI\s*\(([^)]+)\)").ok())
        .as_ref()
}

fn object_ref_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+0\s+R\b").ok()).as_ref()
}

/// Evidence pulled out of one successful tool run.
#[derive(Debug, Default)]
pub struct Harvest {
    pub indicators: Vec<Indicator>,
    pub attack_links: Vec<AttackLink>,
}

/// Scans tool output for URLs, `/URI` annotation values, and
/// `Referencing:` lines. `source_object` is the object the tool was
/// pointed at, if any; `source_artifact` the artifact that will record
/// this output, if one exists.
pub fn harvest_output(
    output: &str,
    source_object: Option<u32>,
    source_artifact: Option<&dossier_core::ArtifactId>,
) -> Harvest {
    let mut harvest = Harvest::default();

    for url in extract_urls(output) {
        if let Some(host) = url_host(&url) {
            harvest.indicators.push(Indicator {
                value: host,
                kind: IndicatorKind::Domain,
                source_object,
                source_artifact: source_artifact.cloned(),
                context: format!("host of {}", url),
            });
        }
        harvest.indicators.push(Indicator {
            value: url,
            kind: IndicatorKind::Url,
            source_object,
            source_artifact: source_artifact.cloned(),
            context: "url in tool output".to_string(),
        });
    }

    for link in extract_reference_links(output, source_object) {
        harvest.attack_links.push(link);
    }

    harvest
}

/// All URL-shaped strings in the output: bare `http(s)://` matches plus
/// `/URI (...)` annotation values, deduplicated in first-seen order.
pub fn extract_urls(output: &str) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(re) = url_regex() {
        for m in re.find_iter(output) {
            push_unique(&mut urls, trim_url(m.as_str()));
        }
    }
    if let Some(re) = uri_value_regex() {
        for cap in re.captures_iter(output) {
            if let Some(value) = cap.get(1) {
                push_unique(&mut urls, trim_url(value.as_str()));
            }
        }
    }
    urls
}

/// `Referencing: 9 0 R, 12 0 R` lines become one link per referenced
/// object. With no source object, the references are still noted but
/// anchored at object 0 (the file itself).
pub fn extract_reference_links(output: &str, source_object: Option<u32>) -> Vec<AttackLink> {
    let Some(re) = object_ref_regex() else {
        return Vec::new();
    };
    let source = source_object.unwrap_or(0);
    let mut links = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("Referencing:") else {
            continue;
        };
        for cap in re.captures_iter(rest) {
            let Some(target) = cap.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                continue;
            };
            links.push(AttackLink {
                source_object: source,
                action: "References".to_string(),
                target_object: target,
                description: format!("object {} references object {}", source, target),
            });
        }
    }
    links
}

/// Parses a structure-scan census into `keyword -> count`. Lines look
/// like `/JS 2` or ` obj 12`; only slash-prefixed keywords are kept,
/// matching what the summary is used for downstream.
pub fn parse_structure_census(output: &str) -> BTreeMap<String, u64> {
    let mut census = BTreeMap::new();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(count)) = (parts.next(), parts.next()) else {
            continue;
        };
        if !name.starts_with('/') {
            continue;
        }
        if let Ok(count) = count.parse::<u64>() {
            census.insert(name.to_string(), count);
        }
    }
    census
}

/// Census keys that justify a second look when non-zero.
pub const NOTABLE_KEYWORDS: [&str; 10] = [
    "/JS",
    "/JavaScript",
    "/OpenAction",
    "/AA",
    "/Launch",
    "/EmbeddedFile",
    "/RichMedia",
    "/XFA",
    "/URI",
    "/ObjStm",
];

/// The subset of a census worth calling out in summaries and triage
/// context, in census order.
pub fn notable_findings(census: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    census
        .iter()
        .filter(|(name, count)| **count > 0 && NOTABLE_KEYWORDS.contains(&name.as_str()))
        .map(|(name, count)| (name.clone(), *count))
        .collect()
}

fn push_unique(urls: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !urls.contains(&candidate) {
        urls.push(candidate);
    }
}

fn trim_url(raw: &str) -> String {
    raw.trim_end_matches(['.', ',', ';']).to_string()
}

fn url_host(url: &str) -> Option<String> {
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
