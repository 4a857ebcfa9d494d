//! Two-stage release workflow: build/test, then a gated tag publication.

use crate::gate::{CiGate, GateVerdict};
use crate::pipeline::{CiPipeline, PipelineResult};
use crate::plan::CiPlan;
use crate::stage::{self, StageConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use vtag_core::{
    manifest, GitBackend, ReleaseConfig, ReleaseGate, TagDecision, TagOutcome, TagPublisher,
    Trigger,
};

/// Everything a workflow run decided and did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub trigger: Trigger,
    pub pipeline: PipelineResult,
    pub gate: GateVerdict,
    pub decision: TagDecision,
    /// Present only when the tag stage ran and succeeded.
    pub tag: Option<TagOutcome>,
    /// Why the tag stage failed, with its error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_error: Option<String>,
}

impl WorkflowReport {
    /// Build/test stage passed.
    pub fn build_passed(&self) -> bool {
        self.pipeline.success && self.gate.passed
    }

    /// Build/test passed and the tag stage, if it ran, succeeded.
    pub fn success(&self) -> bool {
        self.build_passed() && self.tag_error.is_none()
    }
}

/// Build/test stage followed by the tag stage.
pub struct Workflow {
    config: ReleaseConfig,
    stages: Vec<StageConfig>,
}

impl Workflow {
    /// Workflow running `cargo build` and `cargo test` with all features.
    pub fn new(config: ReleaseConfig) -> Self {
        let stages = stage::build_and_test(
            &config.color,
            config.build_timeout_secs,
            config.test_timeout_secs,
        );
        Self { config, stages }
    }

    /// Replace the build/test stages.
    pub fn with_stages(mut self, stages: Vec<StageConfig>) -> Self {
        self.stages = stages;
        self
    }

    /// Run both stages. The tag stage runs only when the release gate
    /// allows it; a tag or push failure is recorded in `tag_error` so the
    /// build/test results are still reported.
    pub async fn run(&self, trigger: &Trigger, git: &dyn GitBackend) -> anyhow::Result<WorkflowReport> {
        self.config.validate()?;
        info!(trigger = %trigger, "Starting release workflow");

        let pipeline = self.build_and_test().await?;
        let gate = CiGate::evaluate(&pipeline.events);
        for violation in &gate.violations {
            warn!(violation = %violation, "Gate violation");
        }

        let decision = ReleaseGate::decide(
            trigger,
            &self.config.main_branch,
            pipeline.success && gate.passed,
        );

        let (tag, tag_error) = match decision {
            TagDecision::Publish => match self.publish_tag(git).await {
                Ok(outcome) => (Some(outcome), None),
                Err(e) => {
                    let message = format!("{e:#}");
                    error!(error = %message, "Tag stage failed");
                    (None, Some(message))
                }
            },
            TagDecision::Skip(reason) => {
                info!(reason = %reason, "Tag stage skipped");
                (None, None)
            }
        };

        Ok(WorkflowReport {
            trigger: trigger.clone(),
            pipeline,
            gate,
            decision,
            tag,
            tag_error,
        })
    }

    /// Stage 1: build and test.
    pub async fn build_and_test(&self) -> anyhow::Result<PipelineResult> {
        let plan = CiPlan::new(self.config.workspace.clone(), &self.stages);
        CiPipeline::run(&plan, self.stages.clone()).await
    }

    /// Stage 2: read the manifest version and publish `v<version>`.
    ///
    /// Does not consult the release gate.
    pub async fn publish_tag(&self, git: &dyn GitBackend) -> anyhow::Result<TagOutcome> {
        let version = manifest::read_version(&self.config.manifest)
            .with_context(|| format!("Failed to read version from {}", self.config.manifest.display()))?;
        info!(version = %version, tag = %version.tag_name(), "Publishing release tag");

        TagPublisher::publish(git, &version, &self.config.publish_options())
            .await
            .with_context(|| format!("Failed to publish tag {}", version.tag_name()))
    }
}

/// Determine the trigger: GitHub Actions environment first, otherwise a
/// manual run on the checked-out branch.
pub async fn detect_trigger(git: &dyn GitBackend) -> anyhow::Result<Trigger> {
    if let Some(trigger) = Trigger::from_env()? {
        return Ok(trigger);
    }
    let branch = git
        .current_branch()
        .await?
        .context("HEAD is detached; pass --event and --branch explicitly")?;
    Ok(Trigger::Manual { branch })
}
