//! Build/test pipeline orchestration.

use crate::event::{EventLog, StageEvent, StageEventKind};
use crate::plan::CiPlan;
use crate::runner::{CiRunner, StageResult};
use crate::stage::StageConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;
use vtag_core::obs;

/// Result of a complete pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique id of this run.
    pub run_id: String,

    /// Whether all enabled stages passed.
    pub success: bool,

    /// Results of the stages that ran, in order.
    pub stages: Vec<StageResult>,

    /// Enabled stages that never ran because an earlier stage failed.
    pub skipped: Vec<String>,

    /// Stage lifecycle events.
    pub events: Vec<StageEvent>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the executed plan.
    pub plan_digest: String,
}

impl PipelineResult {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }

    /// The stage that halted the pipeline, if any.
    pub fn first_failure(&self) -> Option<&StageResult> {
        self.stages.iter().find(|s| !s.passed())
    }
}

/// Sequential stage pipeline.
pub struct CiPipeline;

impl CiPipeline {
    /// Execute the enabled stages of `plan` in order.
    ///
    /// The pipeline halts at the first failed stage; later stages are
    /// recorded as skipped and never spawned. There are no retries.
    pub async fn run(plan: &CiPlan, stages: Vec<StageConfig>) -> anyhow::Result<PipelineResult> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        Self::run_stages(plan, stages, run_id).instrument(span).await
    }

    async fn run_stages(
        plan: &CiPlan,
        stages: Vec<StageConfig>,
        run_id: String,
    ) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        info!(run_id = %run_id, plan = %plan.short_digest(), "Starting build/test pipeline");

        let mut log = EventLog::new();
        let mut stage_results = Vec::new();
        let mut skipped = Vec::new();
        let mut halted = false;

        for config in stages {
            if !config.enabled {
                info!(stage = %config.name, "Skipping disabled stage");
                continue;
            }

            if halted {
                obs::emit_stage_skipped(&config.name, "previous stage failed");
                log.record(
                    StageEventKind::StageSkipped,
                    &config.name,
                    json!({ "reason": "previous stage failed" }),
                );
                skipped.push(config.name);
                continue;
            }

            obs::emit_stage_started(&config.name, &config.command);
            log.record(
                StageEventKind::StageStarted,
                &config.name,
                json!({
                    "command": &config.command,
                    "timeout_secs": config.timeout_secs,
                }),
            );

            let stage_start = Instant::now();
            let result = match CiRunner::execute_stage(&config, &plan.workspace_path).await {
                Ok(r) => r,
                // Spawn errors and timeouts count as a failed stage.
                Err(e) => StageResult::errored(
                    &config.name,
                    &e,
                    stage_start.elapsed().as_millis() as u64,
                ),
            };

            obs::emit_stage_finished(
                &result.stage_name,
                result.exit_code,
                result.duration_ms,
                result.passed(),
            );

            if result.passed() {
                log.record(
                    StageEventKind::StagePassed,
                    &config.name,
                    json!({
                        "exit_code": result.exit_code,
                        "duration_ms": result.duration_ms,
                    }),
                );
            } else {
                halted = true;
                log.record(
                    StageEventKind::StageFailed,
                    &config.name,
                    json!({
                        "exit_code": result.exit_code,
                        "duration_ms": result.duration_ms,
                        "stderr": &result.stderr,
                        "error": format!("Stage '{}' exited with code {}", config.name, result.exit_code),
                    }),
                );
            }

            stage_results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = !halted;

        if success {
            info!(run_id = %run_id, duration_ms, "Build/test pipeline passed");
        } else {
            info!(run_id = %run_id, duration_ms, "Build/test pipeline failed");
        }

        Ok(PipelineResult {
            run_id,
            success,
            stages: stage_results,
            skipped,
            events: log.into_events(),
            duration_ms,
            plan_digest: plan.digest.clone(),
        })
    }
}
