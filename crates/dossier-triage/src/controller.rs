//! The investigation state machine
//!
//! One `Investigator` drives one case at a time: triage once, then
//! interrogate/review rounds until a verdict freezes the record. Every
//! analyzer or oracle failure inside the loop is absorbed into the
//! case; the only error that escapes `run` is a bad input file.

use crate::snapshot::SnapshotBuilder;
use dossier_core::{
    finalize, ArtifactBody, ArtifactKind, ArtifactOrigin, CaseRecord, DossierConfig,
    ExtractionSummary, InvocationStatus, Phase, Report, Result, TaskSeed, TerminationReason,
    ToolCall, Verdict, PRIORITY_BASELINE,
};
use dossier_oracle::{prompts, CallSite, Decision, DecisionClient, ReviewAction};
use dossier_tools::harvest::parse_structure_census;
use dossier_tools::{RawInvocation, ToolBench};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct InvestigatorConfig {
    /// Interrogation step cap; the circuit breaker fires at this count.
    pub max_steps: u32,
    /// Character cap per tool output embedded in oracle snapshots.
    pub snapshot_output_cap: usize,
}

impl Default for InvestigatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            snapshot_output_cap: 8_000,
        }
    }
}

impl InvestigatorConfig {
    pub fn from_config(config: &DossierConfig) -> Self {
        Self {
            max_steps: config.max_steps(),
            snapshot_output_cap: config.limits.snapshot_output_cap,
        }
    }
}

pub struct Investigator {
    client: DecisionClient,
    bench: ToolBench,
    config: InvestigatorConfig,
    snapshots: SnapshotBuilder,
}

impl Investigator {
    pub fn new(client: DecisionClient, bench: ToolBench, config: InvestigatorConfig) -> Self {
        let snapshots = SnapshotBuilder::new(config.snapshot_output_cap);
        Self {
            client,
            bench,
            config,
            snapshots,
        }
    }

    /// Run a full investigation. `extraction` is optional collaborator
    /// metadata gathered before the case opened. Fails only when the
    /// input file is missing, unreadable, or empty; everything after
    /// the case record exists is absorbed into it.
    pub async fn run(
        &self,
        path: &Path,
        extraction: Option<ExtractionSummary>,
    ) -> Result<Report> {
        let mut case = CaseRecord::open(path)?;
        case.extraction = extraction;
        info!(
            case_id = %case.case_id,
            file = %path.display(),
            sha256 = %case.file.sha256,
            oracle = self.client.oracle_name(),
            "investigation opened"
        );

        self.triage(&mut case).await;
        while !case.is_frozen() {
            self.interrogate(&mut case).await;
            if case.is_frozen() {
                break;
            }
            self.review(&mut case).await;
        }

        let report = finalize(case);
        info!(
            case_id = %report.case_id,
            verdict = %report.verdict,
            termination = %report.termination_reason,
            steps = report.step_count,
            "investigation closed"
        );
        Ok(report)
    }

    // ========================================================================
    // TRIAGE
    // ========================================================================

    /// Entered exactly once. Runs both baseline analyzers concurrently,
    /// seeds the locker with their output, then asks the oracle for the
    /// initial hypothesis and task seeds.
    async fn triage(&self, case: &mut CaseRecord) {
        info!(phase = "triage", "running baseline analyzers");
        let scan_call = ToolCall::whole_file("structure_scan");
        let stats_call = ToolCall::whole_file("object_stats");
        let target = case.file.path.clone();
        let (scan, stats) = tokio::join!(
            self.bench.invoke(&scan_call, &target, 0),
            self.bench.invoke(&stats_call, &target, 0),
        );

        let scan_out = self.seed_analyzer_output(case, "structure_scan", scan);
        let stats_out = self.seed_analyzer_output(case, "object_stats", stats);
        if let Some(output) = &scan_out {
            case.locker
                .set_structural_summary(parse_structure_census(output));
        }

        let context = self
            .snapshots
            .triage(case, scan_out.as_deref(), stats_out.as_deref());
        let locker = &case.locker;
        let outcome = self
            .client
            .request(
                CallSite::Triage,
                prompts::for_site(CallSite::Triage),
                context,
                |decision| match decision {
                    Decision::Triage(t) => check_seed_refs(&t.seed_tasks, locker),
                    _ => Err("expected a triage decision".to_string()),
                },
            )
            .await;

        match outcome {
            Ok(Decision::Triage(triage)) => {
                case.record_hypothesis(triage.hypothesis, triage.confidence);
                case.push_trail(format!(
                    "triage: {} (leaning {})",
                    triage.summary, triage.verdict_leaning
                ));
                for seed in triage.seed_tasks {
                    let id = case.enqueue(seed);
                    debug!(task = %id, "triage seeded task");
                }
            }
            Ok(_) => {
                self.conservative_default(case, "triage", "decision shape mismatch");
                return;
            }
            Err(e) => {
                self.conservative_default(case, "triage", &e.to_string());
                return;
            }
        }

        // A structurally clean file may seed nothing; interrogation
        // still needs one task to act on.
        if case.queue.is_empty() {
            let id = case.enqueue(TaskSeed {
                object_id: None,
                artifact: None,
                priority: PRIORITY_BASELINE,
                reason: "baseline pass over the whole file".to_string(),
                context: None,
            });
            case.push_trail(format!(
                "triage seeded no tasks; queued whole-file baseline {}",
                id
            ));
        }
        case.phase = Phase::Interrogate;
    }

    /// Record one baseline analyzer outcome: success becomes a report
    /// artifact plus a trail entry, failure an absorbed error. Returns
    /// stdout on success for snapshot use.
    fn seed_analyzer_output(
        &self,
        case: &mut CaseRecord,
        tool: &str,
        raw: RawInvocation,
    ) -> Option<String> {
        let success = raw.status == InvocationStatus::Completed
            && raw.exit_code == Some(0)
            && !raw.stdout.trim().is_empty();
        if !success {
            warn!(tool, status = ?raw.status, "baseline analyzer failed");
            case.push_error(format!(
                "triage: {} failed ({})",
                tool,
                first_line(&raw.stderr)
            ));
            case.push_trail(format!("triage: {} produced no usable output", tool));
            return None;
        }
        let body = self.bench.cap_inline(&raw.stdout);
        let id = case.locker.add_artifact(
            ArtifactBody::Inline { content: body },
            ArtifactOrigin {
                tool: tool.to_string(),
                step: 0,
            },
            ArtifactKind::Report,
            None,
        );
        case.push_trail(format!(
            "triage: {} captured {} bytes as artifact {}",
            tool,
            raw.stdout.len(),
            id
        ));
        Some(raw.stdout)
    }

    // ========================================================================
    // INTERROGATE
    // ========================================================================

    /// Consume the highest-priority task, let the oracle pick the probe,
    /// execute it, and count the step.
    async fn interrogate(&self, case: &mut CaseRecord) {
        let Some(task) = case.take_next() else {
            // The review routing keeps empty queues out of this state;
            // if one slips through, conclude the way rule three would.
            warn!("interrogation entered with an empty queue");
            case.push_trail("interrogation found no pending tasks".to_string());
            case.conclude(Verdict::PresumedInnocent, TerminationReason::QueueExhausted);
            return;
        };
        let step = case.step_count + 1;
        info!(
            phase = "interrogate",
            task = %task.id,
            target = %task.describe_target(),
            step,
            "interrogating"
        );

        let context =
            self.snapshots
                .tool_selection(case, &task, self.bench.manifest().for_oracle());
        let manifest = self.bench.manifest();
        let locker = &case.locker;
        let outcome = self
            .client
            .request(
                CallSite::ToolSelection,
                prompts::for_site(CallSite::ToolSelection),
                context,
                |decision| match decision {
                    Decision::ToolSelection(sel) => {
                        manifest.validate(&sel.tool, &sel.arguments)?;
                        match &sel.target_artifact {
                            Some(id) if !locker.contains(id) => Err(format!(
                                "target artifact {} is not in the evidence locker",
                                id
                            )),
                            _ => Ok(()),
                        }
                    }
                    _ => Err("expected a tool_selection decision".to_string()),
                },
            )
            .await;

        let selection = match outcome {
            Ok(Decision::ToolSelection(sel)) => sel,
            Ok(_) => {
                self.conservative_default(case, "tool_selection", "decision shape mismatch");
                return;
            }
            Err(e) => {
                self.conservative_default(case, "tool_selection", &e.to_string());
                return;
            }
        };

        case.push_trail(format!(
            "step {}: task {} ({}) -> {}: {}",
            step,
            task.id,
            task.describe_target(),
            selection.tool,
            selection.reasoning
        ));
        let call = ToolCall {
            tool: selection.tool,
            arguments: selection.arguments,
            target_artifact: selection.target_artifact,
        };
        let record = self.bench.execute(&call, case).await;
        case.bump_step();
        case.push_trail(format!("step {}: {}", case.step_count, record.summary));
        case.phase = Phase::StrategicReview;
    }

    // ========================================================================
    // STRATEGIC REVIEW
    // ========================================================================

    /// Apply the oracle's review, then route through the single
    /// checkpoint: breaker, conclude, queue exhaustion, continue.
    async fn review(&self, case: &mut CaseRecord) {
        let last = case.tool_log.last().cloned();
        let context = self.snapshots.review(case, last.as_ref(), self.config.max_steps);
        let locker = &case.locker;
        let outcome = self
            .client
            .request(
                CallSite::Review,
                prompts::for_site(CallSite::Review),
                context,
                |decision| match decision {
                    Decision::Review(r) => check_seed_refs(&r.add_tasks, locker),
                    _ => Err("expected a review decision".to_string()),
                },
            )
            .await;

        let review = match outcome {
            Ok(Decision::Review(review)) => review,
            Ok(_) => {
                self.conservative_default(case, "review", "decision shape mismatch");
                return;
            }
            Err(e) => {
                self.conservative_default(case, "review", &e.to_string());
                return;
            }
        };

        case.record_hypothesis(review.updated_hypothesis.clone(), review.confidence);
        case.push_trail(format!(
            "review after step {}: {}",
            case.step_count, review.reasoning
        ));
        for seed in review.add_tasks {
            let id = case.enqueue(seed);
            debug!(task = %id, "review added task");
        }
        for id in &review.remove_task_ids {
            if case.remove_task(id) {
                debug!(task = %id, "review removed task");
            } else {
                warn!(task = %id, "review asked to remove an unknown task");
                case.push_error(format!("review: cannot remove unknown task {}", id));
            }
        }

        // Routing checkpoint. Order matters: safety first, then the
        // oracle's choice, then the empty queue.
        if case.step_count >= self.config.max_steps {
            info!(
                steps = case.step_count,
                max_steps = self.config.max_steps,
                "circuit breaker tripped"
            );
            case.push_trail(format!(
                "circuit breaker: {} steps reached the cap",
                case.step_count
            ));
            case.conclude(
                review.verdict.unwrap_or(Verdict::Inconclusive),
                TerminationReason::CircuitBreaker,
            );
        } else if review.action == ReviewAction::Conclude {
            case.conclude(
                review.verdict.unwrap_or(Verdict::Inconclusive),
                TerminationReason::Concluded,
            );
        } else if case.queue.is_empty() {
            case.push_trail("review chose to continue but no tasks remain".to_string());
            case.conclude(
                review.verdict.unwrap_or(Verdict::PresumedInnocent),
                TerminationReason::QueueExhausted,
            );
        } else {
            case.phase = Phase::Interrogate;
        }
    }

    /// Uniform fallback when the oracle failed both attempts at any
    /// site: close the case rather than guess.
    fn conservative_default(&self, case: &mut CaseRecord, site: &str, detail: &str) {
        warn!(site, detail, "oracle failed twice; concluding conservatively");
        case.push_error(format!("{}: oracle failed twice: {}", site, detail));
        case.push_trail(format!(
            "{}: no usable decision after retry; concluding Inconclusive",
            site
        ));
        case.conclude(Verdict::Inconclusive, TerminationReason::OracleParseFailure);
    }
}

/// Seed tasks may only reference artifacts that already exist.
fn check_seed_refs(
    seeds: &[TaskSeed],
    locker: &dossier_core::EvidenceLocker,
) -> std::result::Result<(), String> {
    for seed in seeds {
        if let Some(id) = &seed.artifact {
            if !locker.contains(id) {
                return Err(format!(
                    "seed task references unknown artifact {}",
                    id
                ));
            }
        }
    }
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("(no output)").trim()
}
