//! Release gate: decides whether the tag stage runs.
//!
//! The tag stage runs only for a push to the main branch after the
//! build/test stage passed. Every other combination is a skip with a reason.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::trigger::Trigger;

/// Why the tag stage was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The trigger was not a push (pull request, manual run).
    NotPush,
    /// The pushed ref is not the main branch (another branch or a tag).
    NotMainBranch,
    /// The build/test stage did not pass.
    BuildFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotPush => "not_push",
            SkipReason::NotMainBranch => "not_main_branch",
            SkipReason::BuildFailed => "build_failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the release gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum TagDecision {
    Publish,
    Skip(SkipReason),
}

impl TagDecision {
    pub fn should_publish(&self) -> bool {
        matches!(self, TagDecision::Publish)
    }
}

pub struct ReleaseGate;

impl ReleaseGate {
    /// Decide whether to publish. A failed build wins over trigger reasons
    /// so the log names the actual blocker on main.
    pub fn decide(trigger: &Trigger, main_branch: &str, build_passed: bool) -> TagDecision {
        let decision = match trigger {
            _ if !build_passed => TagDecision::Skip(SkipReason::BuildFailed),
            Trigger::Push { branch } if branch == main_branch => TagDecision::Publish,
            Trigger::Push { .. } | Trigger::PushTag { .. } => {
                TagDecision::Skip(SkipReason::NotMainBranch)
            }
            Trigger::PullRequest { .. } | Trigger::Manual { .. } => {
                TagDecision::Skip(SkipReason::NotPush)
            }
        };

        let reason = match decision {
            TagDecision::Publish => "push_to_main",
            TagDecision::Skip(r) => r.as_str(),
        };
        crate::obs::emit_release_decided(decision.should_publish(), reason);
        decision
    }
}
