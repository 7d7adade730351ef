//! Bounded JSON snapshots of case state for each oracle call site
//!
//! The oracle never sees the raw case record. Each site gets a capped
//! digest: full narrative tails, clipped tool output, and the locker
//! inventory instead of artifact bodies.

use dossier_core::{CaseRecord, Task, ToolInvocationRecord};
use serde_json::{json, Value};

const TRAIL_TAIL: usize = 12;
const HYPOTHESIS_TAIL: usize = 4;
const INDICATOR_TAIL: usize = 20;

pub struct SnapshotBuilder {
    output_cap: usize,
}

impl SnapshotBuilder {
    /// `output_cap` bounds every embedded tool output, in characters.
    pub fn new(output_cap: usize) -> Self {
        Self {
            output_cap: output_cap.max(256),
        }
    }

    /// Context for the one-time triage decision: file identity,
    /// collaborator metadata, and the raw analyzer outputs.
    pub fn triage(&self, case: &CaseRecord, scan: Option<&str>, stats: Option<&str>) -> Value {
        json!({
            "case_id": case.case_id.as_str(),
            "file": {
                "path": case.file.path.display().to_string(),
                "sha256": case.file.sha256,
            },
            "extraction": serde_json::to_value(&case.extraction).unwrap_or(Value::Null),
            "structural_summary": case.locker.structural_summary,
            "structure_scan_output": scan.map(|s| self.clip(s)),
            "object_stats_output": stats.map(|s| self.clip(s)),
            "analyzer_failures": case.errors,
        })
    }

    /// Context for selecting a probe for one task. The task is fixed by
    /// the controller; the oracle only chooses the tool.
    pub fn tool_selection(&self, case: &CaseRecord, task: &Task, manifest: Value) -> Value {
        json!({
            "case": self.case_digest(case),
            "current_task": serde_json::to_value(task).unwrap_or(Value::Null),
            "tool_manifest": manifest,
        })
    }

    /// Context for the strategic review: the step that just ran, the
    /// remaining queue, and how much step budget is left.
    pub fn review(
        &self,
        case: &CaseRecord,
        last_step: Option<&ToolInvocationRecord>,
        max_steps: u32,
    ) -> Value {
        let last = last_step.map(|record| {
            json!({
                "tool": record.tool,
                "arguments": record.arguments,
                "status": record.status,
                "success": record.success,
                "summary": record.summary,
                "stdout": self.clip(&record.stdout),
                "stderr": self.clip(&record.stderr),
            })
        });
        json!({
            "case": self.case_digest(case),
            "last_step": last,
            "remaining_queue": queue_listing(&case.queue),
            "budget": {
                "steps_taken": case.step_count,
                "max_steps": max_steps,
            },
        })
    }

    fn case_digest(&self, case: &CaseRecord) -> Value {
        let hypotheses: Vec<Value> = tail(&case.hypothesis_history, HYPOTHESIS_TAIL)
            .iter()
            .map(|h| serde_json::to_value(h).unwrap_or(Value::Null))
            .collect();
        let indicators: Vec<&str> = tail(&case.locker.indicators, INDICATOR_TAIL)
            .iter()
            .map(|i| i.value.as_str())
            .collect();
        json!({
            "case_id": case.case_id.as_str(),
            "file_sha256": case.file.sha256,
            "step_count": case.step_count,
            "hypotheses": hypotheses,
            "structural_summary": case.locker.structural_summary,
            "artifacts": case.locker.artifact_digest(),
            "indicators": indicators,
            "attack_chain_len": case.locker.attack_chain.len(),
            "trail": tail(&case.trail, TRAIL_TAIL),
            "errors": tail(&case.errors, TRAIL_TAIL),
        })
    }

    fn clip(&self, text: &str) -> String {
        if text.len() <= self.output_cap {
            return text.to_string();
        }
        let mut end = self.output_cap;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n... [clipped, {} total chars]", &text[..end], text.len())
    }
}

fn queue_listing(queue: &[Task]) -> Vec<Value> {
    queue
        .iter()
        .map(|task| {
            json!({
                "id": task.id,
                "target": task.describe_target(),
                "priority": task.priority,
                "reason": task.reason,
            })
        })
        .collect()
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_bounds_long_output() {
        let builder = SnapshotBuilder::new(300);
        let clipped = builder.clip(&"y".repeat(1000));
        assert!(clipped.contains("[clipped, 1000 total chars]"));
        assert!(clipped.len() < 400);
    }

    #[test]
    fn cap_has_a_floor() {
        let builder = SnapshotBuilder::new(0);
        assert_eq!(builder.clip("short"), "short");
    }

    #[test]
    fn tail_takes_the_last_entries() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(tail(&items, 2), &[4, 5]);
        assert_eq!(tail(&items, 10), &[1, 2, 3, 4, 5]);
    }
}
