//! Tests for dossier-core: ids, verdicts, records, report contract, config

use dossier_core::*;
use std::path::PathBuf;

fn test_workspace() -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("dossier-core-test-{}-{}", std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &std::path::Path) {
    let _ = std::fs::remove_dir_all(dir);
}

fn sample_file(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("sample.pdf");
    std::fs::write(&path, b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n").unwrap();
    path
}

// ===========================================================================
// CaseId / ArtifactId
// ===========================================================================

#[test]
fn case_id_new_and_display() {
    let id = CaseId::new("abc_20250101_000000");
    assert_eq!(id.as_str(), "abc_20250101_000000");
    assert_eq!(format!("{}", id), "abc_20250101_000000");
}

#[test]
fn case_id_mint_has_timestamp_suffix() {
    let id = CaseId::mint();
    let parts: Vec<&str> = id.as_str().rsplitn(3, '_').collect();
    assert_eq!(parts.len(), 3, "expected uuid_date_time shape: {}", id);
    assert_eq!(parts[0].len(), 6, "HHMMSS suffix: {}", id);
    assert_eq!(parts[1].len(), 8, "YYYYMMDD part: {}", id);
}

#[test]
fn artifact_id_serde_is_transparent() {
    let id = ArtifactId::new("deadbeef0123");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, r#""deadbeef0123""#);
    let back: ArtifactId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

// ===========================================================================
// Verdict / TerminationReason wire strings
// ===========================================================================

#[test]
fn verdict_serde_strings() {
    assert_eq!(serde_json::to_string(&Verdict::Benign).unwrap(), r#""Benign""#);
    assert_eq!(
        serde_json::to_string(&Verdict::PresumedInnocent).unwrap(),
        r#""Presumed_Innocent""#
    );
    assert_eq!(
        serde_json::to_string(&Verdict::Inconclusive).unwrap(),
        r#""Inconclusive""#
    );
}

#[test]
fn termination_reason_serde_strings() {
    assert_eq!(
        serde_json::to_string(&TerminationReason::CircuitBreaker).unwrap(),
        r#""circuit_breaker""#
    );
    assert_eq!(
        serde_json::to_string(&TerminationReason::QueueExhausted).unwrap(),
        r#""queue_exhausted""#
    );
    assert_eq!(
        serde_json::to_string(&TerminationReason::OracleParseFailure).unwrap(),
        r#""oracle_parse_failure""#
    );
    assert_eq!(format!("{}", TerminationReason::Concluded), "concluded");
}

// ===========================================================================
// FileIdentity
// ===========================================================================

#[test]
fn file_identity_hashes_content() {
    let ws = test_workspace();
    let path = sample_file(&ws);
    let identity = FileIdentity::resolve(&path).unwrap();
    assert_eq!(identity.sha256.len(), 64);
    assert_eq!(identity.path, path);

    let again = FileIdentity::resolve(&path).unwrap();
    assert_eq!(identity.sha256, again.sha256);
    cleanup(&ws);
}

#[test]
fn file_identity_rejects_empty_file() {
    let ws = test_workspace();
    let path = ws.join("empty.pdf");
    std::fs::write(&path, b"").unwrap();
    let err = FileIdentity::resolve(&path).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("empty"));
    cleanup(&ws);
}

// ===========================================================================
// ToolInvocationRecord
// ===========================================================================

fn record(stdout: &str) -> ToolInvocationRecord {
    ToolInvocationRecord {
        tool: "object_inspect".into(),
        arguments: serde_json::json!({"object_id": 7}),
        command: "pdf-parser --object 7 sample.pdf".into(),
        status: InvocationStatus::Completed,
        exit_code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
        success: true,
        summary: "object 7 dumped".into(),
        started_at: chrono::Utc::now(),
        duration_ms: 12,
    }
}

#[test]
fn same_outcome_ignores_timestamps() {
    let mut a = record("obj 7 0");
    let b = record("obj 7 0");
    a.started_at = a.started_at - chrono::Duration::seconds(30);
    a.duration_ms = 999;
    assert!(a.same_outcome(&b));
}

#[test]
fn same_outcome_detects_differences() {
    let a = record("obj 7 0");
    let b = record("obj 8 0");
    assert!(!a.same_outcome(&b));
}

// ===========================================================================
// Report contract
// ===========================================================================

#[test]
fn finalize_produces_contract_fields() {
    let ws = test_workspace();
    let path = sample_file(&ws);
    let mut case = CaseRecord::open(&path).unwrap();
    case.record_hypothesis("clean document", 0.9);
    case.push_trail("Triage started.");
    case.conclude(Verdict::Benign, TerminationReason::Concluded);

    let report = finalize(case);
    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["verdict"], "Benign");
    assert_eq!(json["termination_reason"], "concluded");
    assert_eq!(json["step_count"], 0);
    assert!(json["hypothesis_history"].is_array());
    assert!(json["analysis_trail"].is_array());
    assert!(json["tool_log"].is_array());
    assert!(json["evidence_locker"]["artifacts"].is_array());
    assert!(json["evidence_locker"]["indicators"].is_array());
    assert!(json["evidence_locker"]["attack_chain"].is_array());
    cleanup(&ws);
}

#[test]
fn finalize_defaults_unconcluded_case_to_inconclusive() {
    let ws = test_workspace();
    let path = sample_file(&ws);
    let case = CaseRecord::open(&path).unwrap();
    let report = finalize(case);
    assert_eq!(report.verdict, Verdict::Inconclusive);
    cleanup(&ws);
}

#[test]
fn report_references_resolve_in_locker() {
    let ws = test_workspace();
    let path = sample_file(&ws);
    let mut case = CaseRecord::open(&path).unwrap();

    let parent = case.locker.add_artifact(
        ArtifactBody::Inline {
            content: "stream data".into(),
        },
        ArtifactOrigin::new("structure_scan", 0),
        ArtifactKind::Report,
        None,
    );
    case.locker.add_artifact(
        ArtifactBody::FileRef {
            path: ws.join("dumps/obj7.bin"),
        },
        ArtifactOrigin::new("stream_dump", 1),
        ArtifactKind::Stream,
        Some(parent.clone()),
    );
    case.conclude(Verdict::Suspicious, TerminationReason::Concluded);

    let report = finalize(case);
    for artifact in &report.evidence_locker.artifacts {
        if let Some(parent) = &artifact.parent {
            assert!(
                report.evidence_locker.contains(parent),
                "dangling parent reference: {}",
                parent
            );
        }
    }
    cleanup(&ws);
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn error_input_is_the_only_fatal_kind() {
    let input = Error::input("/cases/a.pdf", "file is empty");
    assert!(input.is_fatal());
    assert!(input.to_string().contains("/cases/a.pdf"));

    let tool = Error::tool("object_inspect", "spawn failed");
    assert!(!tool.is_fatal());
    let oracle = Error::oracle("anthropic", "rate limited");
    assert!(!oracle.is_fatal());
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: Error = io_err.into();
    assert!(matches!(e, Error::Io(_)));
    assert!(!e.is_fatal());
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let e: Error = json_err.into();
    assert!(matches!(e, Error::Json(_)));
}

#[test]
fn error_display_all_variants() {
    let errors: Vec<Error> = vec![
        Error::input("p", "m"),
        Error::oracle("p", "m"),
        Error::tool("n", "m"),
        Error::Extraction("x".into()),
        Error::Config("x".into()),
        Error::Internal("x".into()),
    ];
    for e in errors {
        let _ = format!("{}", e);
    }
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_defaults() {
    let config = DossierConfig::default();
    assert_eq!(config.limits.max_steps, 10);
    assert_eq!(config.limits.tool_timeout_secs, 60);
    assert_eq!(config.oracle.api_key_env, "ANTHROPIC_API_KEY");
    assert_eq!(config.tools.structure_scan, "pdfid");
    assert_eq!(config.tool_program("object_inspect"), Some("pdf-parser"));
    assert_eq!(config.tool_program("unlisted"), None);
}

#[test]
fn config_max_steps_clamps_to_one() {
    let mut config = DossierConfig::default();
    config.limits.max_steps = 0;
    assert_eq!(config.max_steps(), 1);
}

#[test]
fn config_toml_roundtrip() {
    let config = DossierConfig::default();
    let toml = config.to_toml();
    assert!(toml.contains("[limits]"));
    assert!(toml.contains("max_steps = 10"));

    let back: DossierConfig = toml::from_str(&toml).unwrap();
    assert_eq!(back.limits.max_steps, config.limits.max_steps);
    assert_eq!(back.oracle.model, config.oracle.model);
}

#[test]
fn config_load_falls_back_on_garbage() {
    let ws = test_workspace();
    let path = ws.join("dossier.toml");
    std::fs::write(&path, "not [valid toml ((").unwrap();
    let config = DossierConfig::load(&path);
    assert_eq!(config.limits.max_steps, 10);
    cleanup(&ws);
}

#[test]
fn config_load_partial_file_keeps_other_defaults() {
    let ws = test_workspace();
    let path = ws.join("dossier.toml");
    std::fs::write(&path, "[limits]\nmax_steps = 3\n").unwrap();
    let config = DossierConfig::load(&path);
    assert_eq!(config.limits.max_steps, 3);
    assert_eq!(config.limits.tool_timeout_secs, 60);
    assert_eq!(config.tools.structure_scan, "pdfid");
    cleanup(&ws);
}
