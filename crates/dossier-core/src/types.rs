//! Core types for Dossier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Investigation session identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct CaseId(Arc<str>);

impl CaseId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Mint a fresh id: `{uuid}_{YYYYMMDD_HHMMSS}`.
    pub fn mint() -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        Self::new(format!("{}_{}", uuid::Uuid::new_v4(), stamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for CaseId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CaseId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Self::new(String::deserialize(deserializer)?))
    }
}

/// Evidence locker artifact identifier.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Categorical verdict on the candidate file.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    Benign,
    Suspicious,
    Malicious,
    #[serde(rename = "Presumed_Innocent")]
    PresumedInnocent,
    /// Reserved for the conservative default when the oracle fails twice.
    Inconclusive,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Benign => write!(f, "Benign"),
            Self::Suspicious => write!(f, "Suspicious"),
            Self::Malicious => write!(f, "Malicious"),
            Self::PresumedInnocent => write!(f, "Presumed_Innocent"),
            Self::Inconclusive => write!(f, "Inconclusive"),
        }
    }
}

/// Current position of the investigation state machine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Triage,
    Interrogate,
    StrategicReview,
    Finalize,
}

/// Why the investigation stopped. Always set on a frozen case.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The strategic review concluded on its own.
    Concluded,
    /// Step cap reached; safety overrode the oracle.
    CircuitBreaker,
    /// Review said continue but no tasks remained.
    QueueExhausted,
    /// The oracle failed twice at one call site.
    OracleParseFailure,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concluded => write!(f, "concluded"),
            Self::CircuitBreaker => write!(f, "circuit_breaker"),
            Self::QueueExhausted => write!(f, "queue_exhausted"),
            Self::OracleParseFailure => write!(f, "oracle_parse_failure"),
        }
    }
}

/// One entry in the hypothesis history. The current working theory is
/// always the last entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hypothesis {
    pub statement: String,
    /// 0.0 (no confidence) to 1.0 (certain); clamped on ingest.
    pub confidence: f64,
    pub recorded_at_step: u32,
}

impl Hypothesis {
    pub fn new(statement: impl Into<String>, confidence: f64, step: u32) -> Self {
        Self {
            statement: statement.into(),
            confidence: confidence.clamp(0.0, 1.0),
            recorded_at_step: step,
        }
    }
}

pub const PRIORITY_HIGHEST: u8 = 1;
pub const PRIORITY_LOWEST: u8 = 10;
pub const PRIORITY_BASELINE: u8 = 5;

/// Oracle-supplied task shape: everything but the id, which the case
/// record mints on enqueue so ids can never collide.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskSeed {
    /// Indirect object number to investigate, when object-specific.
    #[serde(default)]
    pub object_id: Option<u32>,
    /// Locker artifact to focus on; `None` means whole-file scope.
    #[serde(default)]
    pub artifact: Option<ArtifactId>,
    /// 1 = highest, 10 = lowest.
    pub priority: u8,
    /// The investigative goal for this task.
    pub reason: String,
    /// Free-form context when neither object nor artifact applies.
    #[serde(default)]
    pub context: Option<String>,
}

/// A pending unit of investigative work.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub object_id: Option<u32>,
    pub artifact: Option<ArtifactId>,
    pub priority: u8,
    pub reason: String,
    pub context: Option<String>,
}

impl Task {
    pub fn from_seed(seed: TaskSeed) -> Self {
        Self {
            id: mint_task_id(),
            object_id: seed.object_id,
            artifact: seed.artifact,
            priority: seed.priority.clamp(PRIORITY_HIGHEST, PRIORITY_LOWEST),
            reason: seed.reason,
            context: seed.context,
        }
    }

    /// Short target description for trail entries.
    pub fn describe_target(&self) -> String {
        match (&self.artifact, self.object_id) {
            (Some(a), _) => format!("artifact {}", a),
            (None, Some(obj)) => format!("object {}", obj),
            (None, None) => "whole file".to_string(),
        }
    }
}

fn mint_task_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("task_{}", &hex[..8])
}

/// What class of indicator was harvested.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Url,
    Domain,
    ObjectRef,
    Other,
}

/// A concrete indicator of compromise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Indicator {
    pub value: String,
    pub kind: IndicatorKind,
    /// Indirect object the indicator was found in, when known.
    #[serde(default)]
    pub source_object: Option<u32>,
    /// Locker artifact the indicator was harvested from, when any.
    #[serde(default)]
    pub source_artifact: Option<ArtifactId>,
    /// The line or snippet it appeared in.
    pub context: String,
}

impl Indicator {
    /// Dedup key: the set is unordered and keyed on value + source.
    pub fn dedup_key(&self) -> (String, Option<u32>, Option<String>) {
        (
            self.value.clone(),
            self.source_object,
            self.source_artifact.as_ref().map(|a| a.as_str().to_string()),
        )
    }
}

/// One directed link in the reconstructed attack chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttackLink {
    pub source_object: u32,
    /// The relationship, e.g. "Executes", "References", "Decodes".
    pub action: String,
    pub target_object: u32,
    pub description: String,
}

/// How a facade invocation ended.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Completed,
    Failed,
    TimedOut,
    /// Manifest or target validation refused the call before spawn.
    Rejected,
}

/// A request for the execution facade, produced from a tool-selection
/// decision or by triage itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: serde_json::Value,
    #[serde(default)]
    pub target_artifact: Option<ArtifactId>,
}

impl ToolCall {
    pub fn whole_file(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            arguments: serde_json::Value::Object(Default::default()),
            target_artifact: None,
        }
    }
}

/// Verbatim audit row for one facade invocation. Appended to the tool log
/// regardless of outcome; tool failure is evidence, not an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub tool: String,
    pub arguments: serde_json::Value,
    /// The concrete command line that was (or would have been) spawned.
    pub command: String,
    pub status: InvocationStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// Normalized one-paragraph digest from the facade.
    pub summary: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ToolInvocationRecord {
    /// Outcome equality for audit checks: identical tool + arguments +
    /// input must reproduce the same record, timestamps excluded.
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.tool == other.tool
            && self.arguments == other.arguments
            && self.command == other.command
            && self.status == other.status
            && self.exit_code == other.exit_code
            && self.stdout == other.stdout
            && self.stderr == other.stderr
            && self.success == other.success
            && self.summary == other.summary
    }
}
