//! Case record: the aggregate state of one investigation. Mutable until
//! `conclude` sets the verdict, then handed to `finalize` by value so the
//! type system enforces the freeze.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::extraction::ExtractionSummary;
use crate::locker::EvidenceLocker;
use crate::types::{
    CaseId, Hypothesis, Phase, Task, TaskSeed, TerminationReason, ToolInvocationRecord, Verdict,
};

/// Identity of the file under investigation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub sha256: String,
}

impl FileIdentity {
    /// Read and hash the file. This is the fatal gate: a missing,
    /// unreadable, or empty path aborts before the workflow starts.
    pub fn resolve(path: &Path) -> Result<Self> {
        use sha2::{Digest, Sha256};

        let bytes = std::fs::read(path)
            .map_err(|e| Error::input(path.display().to_string(), e.to_string()))?;
        if bytes.is_empty() {
            return Err(Error::input(path.display().to_string(), "file is empty"));
        }
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Ok(Self {
            path: path.to_path_buf(),
            sha256,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: CaseId,
    pub file: FileIdentity,
    pub phase: Phase,
    /// Current working theory is the last entry.
    pub hypothesis_history: Vec<Hypothesis>,
    /// Pending tasks in arrival order; selection is by priority with a
    /// first-in tie break.
    pub queue: Vec<Task>,
    /// Ordered narrative of the investigation.
    pub trail: Vec<String>,
    /// Interrogation audit: one row per facade execution.
    /// `tool_log.len() == step_count` holds on every frozen case.
    pub tool_log: Vec<ToolInvocationRecord>,
    pub locker: EvidenceLocker,
    /// Interrogation steps taken; non-decreasing, bounded by the breaker.
    pub step_count: u32,
    /// Absorbed non-fatal failures, in arrival order.
    pub errors: Vec<String>,
    /// Optional metadata from the extraction collaborator.
    pub extraction: Option<ExtractionSummary>,
    pub verdict: Option<Verdict>,
    pub termination: Option<TerminationReason>,
    pub started_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Open a case for the given path. Fails only on input errors.
    pub fn open(path: &Path) -> Result<Self> {
        let file = FileIdentity::resolve(path)?;
        Ok(Self {
            case_id: CaseId::mint(),
            file,
            phase: Phase::Triage,
            hypothesis_history: Vec::new(),
            queue: Vec::new(),
            trail: Vec::new(),
            tool_log: Vec::new(),
            locker: EvidenceLocker::new(),
            step_count: 0,
            errors: Vec::new(),
            extraction: None,
            verdict: None,
            termination: None,
            started_at: Utc::now(),
        })
    }

    pub fn current_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypothesis_history.last()
    }

    pub fn record_hypothesis(&mut self, statement: impl Into<String>, confidence: f64) {
        self.hypothesis_history
            .push(Hypothesis::new(statement, confidence, self.step_count));
    }

    pub fn push_trail(&mut self, entry: impl Into<String>) {
        self.trail.push(entry.into());
    }

    pub fn push_error(&mut self, entry: impl Into<String>) {
        self.errors.push(entry.into());
    }

    pub fn push_tool_record(&mut self, record: ToolInvocationRecord) {
        self.tool_log.push(record);
    }

    /// Only the interrogate step calls this; the counter never decreases.
    pub fn bump_step(&mut self) {
        self.step_count += 1;
    }

    // ------------------------------------------------------------------
    // Queue operations: append and remove-by-id only, for auditability.
    // ------------------------------------------------------------------

    /// Append a task, minting its id. Returns the id.
    pub fn enqueue(&mut self, seed: TaskSeed) -> String {
        let task = Task::from_seed(seed);
        let id = task.id.clone();
        self.queue.push(task);
        id
    }

    /// Take the highest-priority pending task (1 before 10), first-in
    /// among equals.
    pub fn take_next(&mut self) -> Option<Task> {
        let best = self
            .queue
            .iter()
            .enumerate()
            .min_by_key(|(idx, task)| (task.priority, *idx))
            .map(|(idx, _)| idx)?;
        Some(self.queue.remove(best))
    }

    /// Remove a pending task by id. False when the id is unknown.
    pub fn remove_task(&mut self, id: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|t| t.id != id);
        self.queue.len() != before
    }

    /// Every queued artifact reference must resolve in the locker or be
    /// whole-file. Returns offending task ids.
    pub fn dangling_task_refs(&self) -> Vec<String> {
        self.queue
            .iter()
            .filter(|t| {
                t.artifact
                    .as_ref()
                    .map(|a| !self.locker.contains(a))
                    .unwrap_or(false)
            })
            .map(|t| t.id.clone())
            .collect()
    }

    /// The single freeze point. Sets verdict and termination reason once;
    /// no mutation path is exercised after this.
    pub fn conclude(&mut self, verdict: Verdict, reason: TerminationReason) {
        if self.verdict.is_some() {
            tracing::warn!(case = %self.case_id, "conclude called on a frozen case; ignoring");
            return;
        }
        self.phase = Phase::Finalize;
        self.verdict = Some(verdict);
        self.termination = Some(reason);
    }

    pub fn is_frozen(&self) -> bool {
        self.verdict.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PRIORITY_BASELINE;

    fn seed(priority: u8, reason: &str) -> TaskSeed {
        TaskSeed {
            object_id: None,
            artifact: None,
            priority,
            reason: reason.into(),
            context: None,
        }
    }

    fn open_case() -> CaseRecord {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("dossier-case-{}-{}", std::process::id(), id));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.pdf");
        std::fs::write(&path, b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n").unwrap();
        CaseRecord::open(&path).unwrap()
    }

    #[test]
    fn queue_orders_by_priority_then_fifo() {
        let mut case = open_case();
        case.enqueue(seed(5, "first at five"));
        case.enqueue(seed(1, "urgent"));
        case.enqueue(seed(5, "second at five"));

        assert_eq!(case.take_next().unwrap().reason, "urgent");
        assert_eq!(case.take_next().unwrap().reason, "first at five");
        assert_eq!(case.take_next().unwrap().reason, "second at five");
        assert!(case.take_next().is_none());
    }

    #[test]
    fn priorities_clamp_into_range() {
        let mut case = open_case();
        case.enqueue(seed(0, "too high"));
        case.enqueue(seed(200, "too low"));
        assert_eq!(case.queue[0].priority, 1);
        assert_eq!(case.queue[1].priority, 10);
    }

    #[test]
    fn remove_task_by_id() {
        let mut case = open_case();
        let id = case.enqueue(seed(PRIORITY_BASELINE, "removable"));
        assert!(case.remove_task(&id));
        assert!(!case.remove_task(&id));
        assert!(case.queue.is_empty());
    }

    #[test]
    fn conclude_freezes_once() {
        let mut case = open_case();
        case.conclude(Verdict::Benign, TerminationReason::Concluded);
        case.conclude(Verdict::Malicious, TerminationReason::CircuitBreaker);
        assert_eq!(case.verdict, Some(Verdict::Benign));
        assert_eq!(case.termination, Some(TerminationReason::Concluded));
    }

    #[test]
    fn open_rejects_missing_file() {
        let err = CaseRecord::open(Path::new("/nonexistent/definitely/missing.pdf")).unwrap_err();
        assert!(err.is_fatal());
    }
}
