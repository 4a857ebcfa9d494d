//! Structured observability hooks for the release workflow.
//!
//! Each function emits one `info!` (or `warn!`) record with an `event` field
//! so log aggregation can key on it:
//! `stage.started`, `stage.finished`, `release.decided`, `tag.published`.

use tracing::{info, warn};

/// Span tagged with the run_id. Attach it to a run's future with
/// `tracing::Instrument::instrument` so every record carries the id.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("vtag.run", run_id = %run_id)
}

pub fn emit_stage_started(stage: &str, command: &[String]) {
    info!(event = "stage.started", stage = %stage, command = %command.join(" "));
}

/// Emit event: stage finished with exit code, duration, and pass/fail.
pub fn emit_stage_finished(stage: &str, exit_code: i32, duration_ms: u64, passed: bool) {
    if passed {
        info!(
            event = "stage.finished",
            stage = %stage,
            exit_code = exit_code,
            duration_ms = duration_ms,
            passed = passed,
        );
    } else {
        warn!(
            event = "stage.finished",
            stage = %stage,
            exit_code = exit_code,
            duration_ms = duration_ms,
            passed = passed,
        );
    }
}

/// Emit event: stage skipped because an earlier stage failed or it is disabled.
pub fn emit_stage_skipped(stage: &str, reason: &str) {
    info!(event = "stage.skipped", stage = %stage, reason = %reason);
}

/// Emit event: the release gate decided whether the tag stage runs.
pub fn emit_release_decided(publish: bool, reason: &str) {
    info!(event = "release.decided", publish = publish, reason = %reason);
}

/// Emit event: tag created (and possibly pushed).
pub fn emit_tag_published(
    tag: &str,
    commit: &str,
    previous_target: Option<&str>,
    pushed: bool,
    dry_run: bool,
) {
    info!(
        event = "tag.published",
        tag = %tag,
        commit = %commit,
        previous_target = previous_target.unwrap_or("none"),
        moved = previous_target.is_some_and(|p| p != commit),
        pushed = pushed,
        dry_run = dry_run,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _entered = run_span("test-run-id").entered();
        emit_stage_skipped("cargo_test", "previous stage failed");
    }
}
