//! Terminal report and the finalizer that produces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{CaseRecord, FileIdentity};
use crate::extraction::ExtractionSummary;
use crate::locker::EvidenceLocker;
use crate::types::{CaseId, Hypothesis, TerminationReason, ToolInvocationRecord, Verdict};

/// The frozen terminal report. Shape is identical whether termination
/// came from a natural conclusion, the circuit breaker, queue exhaustion,
/// or an oracle failure; `termination_reason` distinguishes them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub case_id: CaseId,
    pub file: FileIdentity,
    pub verdict: Verdict,
    pub hypothesis_history: Vec<Hypothesis>,
    pub evidence_locker: EvidenceLocker,
    pub tool_log: Vec<ToolInvocationRecord>,
    pub analysis_trail: Vec<String>,
    pub termination_reason: TerminationReason,
    pub step_count: u32,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Report {
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Pure function over a frozen case record. Consumes the record by value:
/// nothing can mutate the investigation after this point.
///
/// A controller bug that skipped `conclude` would surface here as the
/// most conservative possible report rather than a panic.
pub fn finalize(case: CaseRecord) -> Report {
    let verdict = case.verdict.unwrap_or(Verdict::Inconclusive);
    let termination_reason = case.termination.unwrap_or(TerminationReason::Concluded);
    Report {
        case_id: case.case_id,
        file: case.file,
        verdict,
        hypothesis_history: case.hypothesis_history,
        evidence_locker: case.locker,
        tool_log: case.tool_log,
        analysis_trail: case.trail,
        termination_reason,
        step_count: case.step_count,
        errors: case.errors,
        extraction: case.extraction,
        started_at: case.started_at,
        finished_at: Utc::now(),
    }
}
