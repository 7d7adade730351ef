//! Structured decision types returned by the reasoning oracle

use dossier_core::{ArtifactId, TaskSeed, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three places in the investigation loop that ask the oracle for
/// a decision. Each site accepts exactly one [`Decision`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSite {
    Triage,
    ToolSelection,
    Review,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Triage => write!(f, "triage"),
            CallSite::ToolSelection => write!(f, "tool_selection"),
            CallSite::Review => write!(f, "review"),
        }
    }
}

/// Initial assessment produced once per case, before any tool runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriageAnalysis {
    /// Working theory about the file, in one or two sentences.
    pub hypothesis: String,
    /// Confidence in the hypothesis, 0.0 to 1.0.
    pub confidence: f64,
    /// Which way the structural evidence leans before interrogation.
    pub verdict_leaning: Verdict,
    /// Suspicious regions to queue for interrogation. May be empty for
    /// structurally clean files.
    #[serde(default)]
    pub seed_tasks: Vec<TaskSeed>,
    /// Narrative summary of the structural findings.
    pub summary: String,
}

/// Tool choice for the single task the controller is currently
/// interrogating. The oracle picks the probe, never the task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSelection {
    /// Name of a tool listed in the manifest the oracle was shown.
    pub tool: String,
    /// Tool-specific arguments, matching the manifest's argument shape.
    #[serde(default)]
    pub arguments: serde_json::Value,
    /// Evidence-locker artifact to run the tool against, or `None` to
    /// target the candidate file itself.
    #[serde(default)]
    pub target_artifact: Option<ArtifactId>,
    pub reasoning: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Continue,
    Conclude,
}

/// Strategic checkpoint decision issued after each interrogation step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategicReview {
    pub updated_hypothesis: String,
    pub confidence: f64,
    /// New tasks to append to the review queue.
    #[serde(default)]
    pub add_tasks: Vec<TaskSeed>,
    /// Ids of queued tasks that new evidence has made irrelevant.
    #[serde(default)]
    pub remove_task_ids: Vec<String>,
    pub action: ReviewAction,
    /// Required when `action` is `conclude`, ignored otherwise.
    #[serde(default)]
    pub verdict: Option<Verdict>,
    pub reasoning: String,
}

/// Union of all decision shapes, discriminated by the `kind` field on
/// the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Triage(TriageAnalysis),
    ToolSelection(ToolSelection),
    Review(StrategicReview),
}

impl Decision {
    /// The call site this decision answers.
    pub fn site(&self) -> CallSite {
        match self {
            Decision::Triage(_) => CallSite::Triage,
            Decision::ToolSelection(_) => CallSite::ToolSelection,
            Decision::Review(_) => CallSite::Review,
        }
    }

    /// Checks the constraints that hold regardless of case state:
    /// confidence bounds and the conclude-carries-verdict rule.
    /// State-dependent checks (tool exists, artifact resolves) are
    /// supplied by the caller through [`DecisionClient::request`].
    ///
    /// [`DecisionClient::request`]: crate::provider::DecisionClient::request
    pub fn validate_intrinsic(&self) -> Result<(), String> {
        match self {
            Decision::Triage(t) => check_confidence(t.confidence),
            Decision::ToolSelection(s) => {
                if s.tool.trim().is_empty() {
                    return Err("tool_selection named an empty tool".to_string());
                }
                Ok(())
            }
            Decision::Review(r) => {
                check_confidence(r.confidence)?;
                if r.action == ReviewAction::Conclude && r.verdict.is_none() {
                    return Err("review concluded without a verdict".to_string());
                }
                Ok(())
            }
        }
    }
}

fn check_confidence(value: f64) -> Result<(), String> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("confidence {} outside 0.0..=1.0", value))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_kind_tag_round_trips() {
        let json = r#"{
            "kind": "review",
            "updated_hypothesis": "embedded script is inert",
            "confidence": 0.9,
            "action": "conclude",
            "verdict": "Benign",
            "reasoning": "decoded stream is a font program"
        }"#;
        let decision: Decision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.site(), CallSite::Review);
        let wire = serde_json::to_value(&decision).unwrap();
        assert_eq!(wire["kind"], "review");
        assert_eq!(wire["verdict"], "Benign");
    }

    #[test]
    fn triage_seed_tasks_default_to_empty() {
        let json = r#"{
            "kind": "triage",
            "hypothesis": "clean file",
            "confidence": 0.8,
            "verdict_leaning": "Benign",
            "summary": "no active content keywords"
        }"#;
        let decision: Decision = serde_json::from_str(json).unwrap();
        match decision {
            Decision::Triage(t) => assert!(t.seed_tasks.is_empty()),
            other => panic!("expected triage, got {:?}", other),
        }
    }

    #[test]
    fn conclude_without_verdict_is_rejected() {
        let review = Decision::Review(StrategicReview {
            updated_hypothesis: "done".to_string(),
            confidence: 0.5,
            add_tasks: Vec::new(),
            remove_task_ids: Vec::new(),
            action: ReviewAction::Conclude,
            verdict: None,
            reasoning: "stop".to_string(),
        });
        assert!(review.validate_intrinsic().is_err());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let triage = Decision::Triage(TriageAnalysis {
            hypothesis: "h".to_string(),
            confidence: 1.5,
            verdict_leaning: Verdict::Suspicious,
            seed_tasks: Vec::new(),
            summary: "s".to_string(),
        });
        assert!(triage.validate_intrinsic().is_err());
        let nan = Decision::Triage(TriageAnalysis {
            hypothesis: "h".to_string(),
            confidence: f64::NAN,
            verdict_leaning: Verdict::Suspicious,
            seed_tasks: Vec::new(),
            summary: "s".to_string(),
        });
        assert!(nan.validate_intrinsic().is_err());
    }
}
