//! Dossier Oracle - decision contracts and reasoning backends

pub mod anthropic;
pub mod decision;
pub mod prompts;
pub mod provider;
pub mod script;

pub use anthropic::AnthropicOracle;
pub use decision::{
    CallSite, Decision, ReviewAction, StrategicReview, ToolSelection, TriageAnalysis,
};
pub use provider::{DecisionClient, DecisionRequest, Oracle, OracleError, OracleResult};
pub use script::{ScriptedOracle, ScriptedResponse};
