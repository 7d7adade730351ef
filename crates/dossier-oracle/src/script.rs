//! Scripted oracle for tests and offline runs

use crate::decision::{
    Decision, ReviewAction, StrategicReview, ToolSelection, TriageAnalysis,
};
use crate::provider::{DecisionRequest, Oracle, OracleError, OracleResult};
use async_trait::async_trait;
use dossier_core::{TaskSeed, Verdict, PRIORITY_BASELINE};
use std::sync::Mutex;

/// One scripted reply. `Decision` serializes to wire JSON, `Raw`
/// returns the text verbatim (for malformed-output tests), `Fail`
/// simulates a transport failure.
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    Decision(Decision),
    Raw(String),
    Fail(String),
}

/// Deterministic [`Oracle`] that replays a fixed script. Responses are
/// consumed in order; once the script is exhausted the default
/// response repeats.
pub struct ScriptedOracle {
    responses: Mutex<Vec<ScriptedResponse>>,
    default_response: ScriptedResponse,
    call_count: Mutex<usize>,
}

impl ScriptedOracle {
    /// Replies with the same response on every call.
    pub fn constant(response: ScriptedResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            default_response: response,
            call_count: Mutex::new(0),
        }
    }

    /// Replies with each response once, in order, then falls back to a
    /// raw "(script exhausted)" payload.
    pub fn sequence(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            default_response: ScriptedResponse::Raw("(script exhausted)".to_string()),
            call_count: Mutex::new(0),
        }
    }

    /// Canned three-step script for offline runs: triage one baseline
    /// task, probe the file structure, conclude presumed innocent.
    pub fn conservative_walkthrough() -> Self {
        Self::sequence(vec![
            ScriptedResponse::Decision(Decision::Triage(TriageAnalysis {
                hypothesis: "offline run, no reasoning backend attached".to_string(),
                confidence: 0.5,
                verdict_leaning: Verdict::Inconclusive,
                seed_tasks: vec![TaskSeed {
                    object_id: None,
                    artifact: None,
                    priority: PRIORITY_BASELINE,
                    reason: "baseline structural pass over the whole file".to_string(),
                    context: None,
                }],
                summary: "scripted triage".to_string(),
            })),
            ScriptedResponse::Decision(Decision::ToolSelection(ToolSelection {
                tool: "structure_scan".to_string(),
                arguments: serde_json::json!({}),
                target_artifact: None,
                reasoning: "scripted baseline probe".to_string(),
            })),
            ScriptedResponse::Decision(Decision::Review(StrategicReview {
                updated_hypothesis: "offline walkthrough complete".to_string(),
                confidence: 0.5,
                add_tasks: Vec::new(),
                remove_task_ids: Vec::new(),
                action: ReviewAction::Conclude,
                verdict: Some(Verdict::PresumedInnocent),
                reasoning: "no reasoning backend; concluding conservatively".to_string(),
            })),
        ])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn next_response(&self) -> ScriptedResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.default_response.clone()
        } else {
            responses.remove(0)
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, _request: &DecisionRequest) -> OracleResult<String> {
        *self.call_count.lock().unwrap() += 1;
        match self.next_response() {
            ScriptedResponse::Decision(decision) => {
                serde_json::to_string(&decision).map_err(|e| OracleError::Malformed(e.to_string()))
            }
            ScriptedResponse::Raw(text) => Ok(text),
            ScriptedResponse::Fail(message) => Err(OracleError::RequestFailed(message)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
