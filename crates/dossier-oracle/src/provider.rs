//! Oracle trait, transport errors, and the retry-once decision client

use crate::decision::{CallSite, Decision};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    RequestFailed(String),

    #[error("oracle authentication failed: {0}")]
    AuthFailed(String),

    #[error("oracle rate limited")]
    RateLimited,

    #[error("oracle returned malformed output: {0}")]
    Malformed(String),

    #[error("oracle decision rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// One request to the reasoning oracle. The context is a JSON snapshot
/// of whatever the call site wants the oracle to see.
#[derive(Clone, Debug)]
pub struct DecisionRequest {
    pub site: CallSite,
    pub system: String,
    pub context: Value,
}

/// A backend that can answer decision requests with raw text. The
/// [`DecisionClient`] owns parsing and validation, so backends stay
/// transport-only and test doubles can return arbitrary payloads.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(&self, request: &DecisionRequest) -> OracleResult<String>;
}

/// Wraps an [`Oracle`] with the parse-validate-retry policy: one retry
/// with the failure appended to the context, then the error surfaces
/// for the caller to absorb with its conservative default.
pub struct DecisionClient {
    oracle: Arc<dyn Oracle>,
}

impl DecisionClient {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Requests a decision for `site`, validating each response with
    /// the intrinsic checks plus the caller's state-dependent check.
    /// A failed attempt is retried exactly once, with a
    /// `previous_error` note merged into the context so the oracle can
    /// correct itself.
    pub async fn request<F>(
        &self,
        site: CallSite,
        system: &str,
        context: Value,
        validate: F,
    ) -> OracleResult<Decision>
    where
        F: Fn(&Decision) -> Result<(), String>,
    {
        let mut last_error: Option<OracleError> = None;
        for attempt in 0..2 {
            let mut ctx = context.clone();
            if let Some(err) = &last_error {
                warn!(site = %site, error = %err, "oracle attempt failed, retrying once");
                merge_previous_error(&mut ctx, err);
            }
            let request = DecisionRequest {
                site,
                system: system.to_string(),
                context: ctx,
            };
            match self.attempt(&request, &validate).await {
                Ok(decision) => {
                    debug!(site = %site, attempt, oracle = self.oracle.name(), "oracle decision accepted");
                    return Ok(decision);
                }
                Err(err) => last_error = Some(err),
            }
        }
        // Both attempts failed. The unwrap cannot fire: the loop body
        // always stores an error before falling through.
        Err(last_error
            .unwrap_or_else(|| OracleError::RequestFailed("no attempts made".to_string())))
    }

    async fn attempt<F>(
        &self,
        request: &DecisionRequest,
        validate: &F,
    ) -> OracleResult<Decision>
    where
        F: Fn(&Decision) -> Result<(), String>,
    {
        let raw = self.oracle.decide(request).await?;
        let decision = parse_decision(&raw)?;
        if decision.site() != request.site {
            return Err(OracleError::Rejected(format!(
                "expected a {} decision, got {}",
                request.site,
                decision.site()
            )));
        }
        decision
            .validate_intrinsic()
            .map_err(OracleError::Rejected)?;
        validate(&decision).map_err(OracleError::Rejected)?;
        Ok(decision)
    }
}

fn merge_previous_error(context: &mut Value, error: &OracleError) {
    let note = Value::String(format!(
        "your previous response was rejected ({}); reply again with a single valid JSON object",
        error
    ));
    match context.as_object_mut() {
        Some(map) => {
            map.insert("previous_error".to_string(), note);
        }
        None => {
            *context = serde_json::json!({ "context": context.clone(), "previous_error": note });
        }
    }
}

/// Parses a raw oracle reply into a [`Decision`]. Tolerates the two
/// wrappers models actually produce: fenced code blocks and prose
/// around a single JSON object.
pub fn parse_decision(raw: &str) -> OracleResult<Decision> {
    let stripped = strip_code_fence(raw.trim());
    match serde_json::from_str::<Decision>(stripped) {
        Ok(decision) => Ok(decision),
        Err(first_err) => {
            if let Some(body) = extract_json_object(stripped) {
                if let Ok(decision) = serde_json::from_str::<Decision>(body) {
                    return Ok(decision);
                }
            }
            Err(OracleError::Malformed(first_err.to_string()))
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") up to the first newline, then the
    // closing fence.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
