//! Execution facade: manifest entries in, audit records out
//!
//! `execute` is infallible by design. Every way a probe can go wrong
//! (unlisted tool, bad arguments, dangling target, spawn failure,
//! non-zero exit, timeout) ends as a `ToolInvocationRecord` with the
//! matching status; nothing here returns `Err`.

use crate::harvest;
use crate::manifest::{require_object_id, ToolKind, ToolManifest};
use chrono::{DateTime, Utc};
use dossier_core::{
    ArtifactBody, ArtifactKind, ArtifactOrigin, CaseRecord, DossierConfig, InvocationStatus,
    ToolCall, ToolInvocationRecord,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Raw outcome of one spawned probe, before normalization. Carries no
/// case state so triage can run probes concurrently and record the
/// results itself.
#[derive(Debug)]
pub struct RawInvocation {
    pub command: String,
    pub status: InvocationStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Where a dump-class probe was told to write its output.
    pub dump_path: Option<PathBuf>,
}

pub struct ToolBench {
    manifest: ToolManifest,
    programs: dossier_core::config::ToolProgramConfig,
    timeout: Duration,
    inline_cap: usize,
    session_dir: PathBuf,
}

impl ToolBench {
    /// `session_dir` is this case's output directory; dump-class probes
    /// write under `<session_dir>/dumps`.
    pub fn new(config: &DossierConfig, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest: ToolManifest::new(),
            programs: config.tools.clone(),
            timeout: Duration::from_secs(config.limits.tool_timeout_secs.max(1)),
            inline_cap: config.limits.inline_cap_bytes,
            session_dir: session_dir.into(),
        }
    }

    pub fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Bounds a blob at the inline cap before it is stored in the
    /// locker. Used by triage when seeding analyzer output artifacts.
    pub fn cap_inline(&self, text: &str) -> String {
        truncate_output(text, self.inline_cap)
    }

    fn program_for(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::StructureScan => &self.programs.structure_scan,
            ToolKind::ObjectStats => &self.programs.object_stats,
            ToolKind::ObjectInspect => &self.programs.object_inspect,
            ToolKind::StreamDump => &self.programs.stream_dump,
            ToolKind::KeywordSearch => &self.programs.keyword_search,
        }
    }

    /// Validates and runs one probe against a concrete path. Performs
    /// no case mutation; callers record the outcome themselves.
    pub async fn invoke(&self, call: &ToolCall, target: &Path, step: u32) -> RawInvocation {
        let kind = match self.manifest.validate(&call.tool, &call.arguments) {
            Ok(kind) => kind,
            Err(reason) => return rejected(reason),
        };
        let (argv, dump_path) = match self.build_argv(kind, &call.arguments, target, step) {
            Ok(plan) => plan,
            Err(reason) => return rejected(reason),
        };
        if let Some(dump) = &dump_path {
            if let Some(dir) = dump.parent() {
                if let Err(e) = tokio::fs::create_dir_all(dir).await {
                    return rejected(format!("cannot create dump directory: {}", e));
                }
            }
        }
        self.spawn(argv, dump_path).await
    }

    /// Full pipeline for one interrogation probe: resolve the target
    /// against the locker, run it, normalize, harvest evidence, record
    /// dump artifacts, and append the audit row. Never fails; the
    /// returned record is also the last entry of `case.tool_log`.
    pub async fn execute(&self, call: &ToolCall, case: &mut CaseRecord) -> ToolInvocationRecord {
        let step = case.step_count + 1;
        let target = match self.resolve_target(call, case).await {
            Ok(path) => path,
            Err(reason) => {
                warn!(tool = %call.tool, %reason, "probe target rejected");
                let record = self.normalize(call, rejected(reason));
                case.push_error(format!("step {}: {}", step, record.summary));
                case.push_tool_record(record.clone());
                return record;
            }
        };

        let raw = self.invoke(call, &target, step).await;
        let dump_path = raw.dump_path.clone();
        let mut record = self.normalize(call, raw);

        if record.success {
            self.harvest_into_case(call, &record, case);
            if let Some(dump) = dump_path {
                self.record_dump_artifact(call, &mut record, case, &dump, step).await;
            }
        } else {
            case.push_error(format!("step {}: {}", step, record.summary));
        }

        case.push_tool_record(record.clone());
        record
    }

    fn harvest_into_case(&self, call: &ToolCall, record: &ToolInvocationRecord, case: &mut CaseRecord) {
        let source_object = object_id_of(&call.arguments);
        let found = harvest::harvest_output(&record.stdout, source_object, call.target_artifact.as_ref());
        for indicator in found.indicators {
            if case.locker.add_indicator(indicator) {
                debug!(tool = %call.tool, "harvested indicator");
            }
        }
        for link in found.attack_links {
            case.locker.add_attack_link(link);
        }
    }

    async fn record_dump_artifact(
        &self,
        call: &ToolCall,
        record: &mut ToolInvocationRecord,
        case: &mut CaseRecord,
        dump: &Path,
        step: u32,
    ) {
        match tokio::fs::metadata(dump).await {
            Ok(meta) if meta.len() > 0 => {
                let id = case.locker.add_artifact(
                    ArtifactBody::FileRef { path: dump.to_path_buf() },
                    ArtifactOrigin { tool: call.tool.clone(), step },
                    ArtifactKind::Stream,
                    call.target_artifact.clone(),
                );
                case.push_trail(format!(
                    "step {}: {} stored {} bytes as artifact {}",
                    step,
                    call.tool,
                    meta.len(),
                    id
                ));
                record.summary = format!("{}; artifact {}", record.summary, id);
            }
            _ => {
                // Exit 0 with nothing written: likely the object has no
                // stream. Absorbed, not fatal.
                case.push_error(format!(
                    "step {}: {} exited cleanly but wrote no dump file",
                    step, call.tool
                ));
                record.summary = format!("{}; no dump file produced", record.summary);
            }
        }
    }

    async fn resolve_target(&self, call: &ToolCall, case: &CaseRecord) -> Result<PathBuf, String> {
        let Some(id) = &call.target_artifact else {
            return Ok(case.file.path.clone());
        };
        let artifact = case
            .locker
            .artifact(id)
            .ok_or_else(|| format!("target artifact {} is not in the evidence locker", id))?;
        match &artifact.body {
            ArtifactBody::FileRef { path } => Ok(path.clone()),
            ArtifactBody::Inline { content } => {
                // Inline evidence is materialized to a scratch file so
                // external analyzers can read it.
                let dir = self.session_dir.join("materialized");
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| format!("cannot create scratch directory: {}", e))?;
                let path = dir.join(format!("{}.dat", id));
                tokio::fs::write(&path, content.as_bytes())
                    .await
                    .map_err(|e| format!("cannot materialize artifact {}: {}", id, e))?;
                Ok(path)
            }
        }
    }

    fn build_argv(
        &self,
        kind: ToolKind,
        arguments: &Value,
        target: &Path,
        step: u32,
    ) -> Result<(Vec<String>, Option<PathBuf>), String> {
        let program = self.program_for(kind).to_string();
        let target = target.display().to_string();
        match kind {
            ToolKind::StructureScan => {
                Ok((vec![program, "-d".into(), "-f".into(), target], None))
            }
            ToolKind::ObjectStats => Ok((vec![program, "-a".into(), target], None)),
            ToolKind::ObjectInspect => {
                let id = require_object_id(kind, arguments)?;
                Ok((vec![program, "-o".into(), id.to_string(), target], None))
            }
            ToolKind::StreamDump => {
                let id = require_object_id(kind, arguments)?;
                let raw = arguments.get("raw").and_then(Value::as_bool).unwrap_or(false);
                let dump = self
                    .session_dir
                    .join("dumps")
                    .join(format!("object_{}_step{}.dump", id, step));
                let mut argv = vec![program, "-o".into(), id.to_string()];
                if !raw {
                    argv.push("-f".into());
                }
                argv.push("-d".into());
                argv.push(dump.display().to_string());
                argv.push(target);
                Ok((argv, Some(dump)))
            }
            ToolKind::KeywordSearch => {
                let keyword = arguments
                    .get("keyword")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok((vec![program, "-s".into(), keyword, target], None))
            }
        }
    }

    async fn spawn(&self, argv: Vec<String>, dump_path: Option<PathBuf>) -> RawInvocation {
        let command = argv.join(" ");
        let started_at = Utc::now();
        let start = Instant::now();
        debug!(%command, "spawning probe");

        let mut child = match Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return RawInvocation {
                    command,
                    status: InvocationStatus::Failed,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("failed to spawn {}: {}", argv[0], e),
                    started_at,
                    duration_ms: start.elapsed().as_millis() as u64,
                    dump_path,
                };
            }
        };

        // Drain pipes concurrently with the wait so a chatty analyzer
        // cannot deadlock on a full pipe buffer, and so a timed-out
        // probe still yields whatever it wrote before the kill.
        let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

        let (status, exit_code) = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(exit)) => (InvocationStatus::Completed, exit.code()),
            Ok(Err(e)) => {
                warn!(%command, error = %e, "probe wait failed");
                (InvocationStatus::Failed, None)
            }
            Err(_) => {
                let _ = child.kill().await;
                warn!(%command, timeout_secs = self.timeout.as_secs(), "probe timed out");
                (InvocationStatus::TimedOut, None)
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        RawInvocation {
            command,
            status,
            exit_code,
            stdout,
            stderr,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            dump_path,
        }
    }

    /// Turns a raw invocation into the audit record: bounded output
    /// copies, success bit, and a per-tool digest.
    fn normalize(&self, call: &ToolCall, raw: RawInvocation) -> ToolInvocationRecord {
        let success = raw.status == InvocationStatus::Completed && raw.exit_code == Some(0);
        let stdout = truncate_output(&raw.stdout, self.inline_cap);
        let stderr = truncate_output(&raw.stderr, self.inline_cap);
        let summary = self.summarize(call, &raw, success);
        ToolInvocationRecord {
            tool: call.tool.clone(),
            arguments: call.arguments.clone(),
            command: raw.command,
            status: raw.status,
            exit_code: raw.exit_code,
            stdout,
            stderr,
            success,
            summary,
            started_at: raw.started_at,
            duration_ms: raw.duration_ms,
        }
    }

    fn summarize(&self, call: &ToolCall, raw: &RawInvocation, success: bool) -> String {
        match raw.status {
            InvocationStatus::Rejected => format!("rejected: {}", first_line(&raw.stderr)),
            InvocationStatus::TimedOut => format!(
                "{} timed out after {}s",
                call.tool,
                self.timeout.as_secs()
            ),
            InvocationStatus::Failed => {
                format!("{} failed: {}", call.tool, first_line(&raw.stderr))
            }
            InvocationStatus::Completed if !success => format!(
                "{} exited with code {}: {}",
                call.tool,
                raw.exit_code.unwrap_or(-1),
                first_line(if raw.stderr.is_empty() { &raw.stdout } else { &raw.stderr })
            ),
            InvocationStatus::Completed => self.success_summary(call, raw),
        }
    }

    fn success_summary(&self, call: &ToolCall, raw: &RawInvocation) -> String {
        let kind = ToolKind::from_name(&call.tool);
        match kind {
            Some(ToolKind::StructureScan) => {
                let census = harvest::parse_structure_census(&raw.stdout);
                let notable = harvest::notable_findings(&census);
                if notable.is_empty() {
                    format!("structure scan: {} keywords, none notable", census.len())
                } else {
                    let listed = notable
                        .iter()
                        .map(|(name, count)| format!("{}={}", name, count))
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!("structure scan: notable {}", listed)
                }
            }
            Some(ToolKind::ObjectStats) => {
                format!("object census captured ({} lines)", raw.stdout.lines().count())
            }
            Some(ToolKind::ObjectInspect) => {
                let object = object_id_of(&call.arguments).unwrap_or(0);
                let refs = harvest::extract_reference_links(&raw.stdout, Some(object)).len();
                format!(
                    "inspected object {}: {} output lines, {} outbound references",
                    object,
                    raw.stdout.lines().count(),
                    refs
                )
            }
            Some(ToolKind::StreamDump) => {
                let object = object_id_of(&call.arguments).unwrap_or(0);
                format!("dumped object {} stream", object)
            }
            Some(ToolKind::KeywordSearch) => {
                let keyword = call
                    .arguments
                    .get("keyword")
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                let hits = raw
                    .stdout
                    .lines()
                    .filter(|line| line.trim_start().starts_with("obj "))
                    .count();
                format!("keyword '{}': {} matching objects", keyword, hits)
            }
            None => format!("{} completed", call.tool),
        }
    }
}

fn rejected(reason: String) -> RawInvocation {
    RawInvocation {
        command: "(not spawned)".to_string(),
        status: InvocationStatus::Rejected,
        exit_code: None,
        stdout: String::new(),
        stderr: reason,
        started_at: Utc::now(),
        duration_ms: 0,
        dump_path: None,
    }
}

fn object_id_of(arguments: &Value) -> Option<u32> {
    arguments
        .get("object_id")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

async fn read_pipe(pipe: Option<impl tokio::io::AsyncRead + Unpin>) -> String {
    use tokio::io::AsyncReadExt;
    match pipe {
        Some(mut p) => {
            let mut buf = Vec::new();
            let _ = p.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).to_string()
        }
        None => String::new(),
    }
}

fn truncate_output(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... [truncated, {} total chars]", &text[..end], text.len())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_marks_and_bounds() {
        let long = "x".repeat(100);
        let out = truncate_output(&long, 10);
        assert!(out.starts_with("xxxxxxxxxx\n... [truncated, 100 total chars]"));
        assert_eq!(truncate_output("short", 10), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "aé".repeat(50);
        let out = truncate_output(&text, 3);
        assert!(out.contains("[truncated"));
    }

    #[test]
    fn argv_for_stream_dump_places_dump_file_under_session() {
        let bench = ToolBench::new(&DossierConfig::default(), "/tmp/session");
        let (argv, dump) = bench
            .build_argv(
                ToolKind::StreamDump,
                &serde_json::json!({ "object_id": 8 }),
                Path::new("/tmp/f.pdf"),
                3,
            )
            .unwrap();
        let dump = dump.unwrap();
        assert!(dump.starts_with("/tmp/session/dumps"));
        assert!(dump.display().to_string().contains("object_8_step3"));
        assert!(argv.contains(&"-f".to_string()));
        assert_eq!(argv.last().unwrap(), "/tmp/f.pdf");
    }

    #[test]
    fn raw_stream_dump_skips_filter_flag() {
        let bench = ToolBench::new(&DossierConfig::default(), "/tmp/session");
        let (argv, _) = bench
            .build_argv(
                ToolKind::StreamDump,
                &serde_json::json!({ "object_id": 8, "raw": true }),
                Path::new("/tmp/f.pdf"),
                1,
            )
            .unwrap();
        assert!(!argv.contains(&"-f".to_string()));
    }

    #[test]
    fn default_programs_come_from_config() {
        let mut config = DossierConfig::default();
        config.tools.structure_scan = "my-pdfid".to_string();
        let bench = ToolBench::new(&config, "/tmp/s");
        assert_eq!(bench.program_for(ToolKind::StructureScan), "my-pdfid");
        assert_eq!(bench.program_for(ToolKind::ObjectStats), "pdf-parser");
    }
}
