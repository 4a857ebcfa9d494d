//! CI gate evaluation for pass/fail criteria.

use crate::event::{StageEvent, StageEventKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// CI gate evaluation rules.
pub struct CiGate;

impl CiGate {
    /// Evaluate whether the build/test stage as a whole passed.
    ///
    /// Gate rule:
    /// - Every `stage_started` must be followed by a `stage_passed`
    /// - Any `stage_failed` or `stage_skipped` is a violation
    pub fn evaluate(events: &[StageEvent]) -> GateVerdict {
        let mut violations = Vec::new();
        let mut started = BTreeSet::new();
        let mut passed = BTreeSet::new();

        for event in events {
            match event.kind {
                StageEventKind::StageStarted => {
                    started.insert(event.stage.as_str());
                }
                StageEventKind::StagePassed => {
                    passed.insert(event.stage.as_str());
                }
                StageEventKind::StageFailed => {
                    let error = event.payload["error"].as_str().unwrap_or("unknown error");
                    violations.push(format!("Stage '{}' failed: {}", event.stage, error));
                }
                StageEventKind::StageSkipped => {
                    violations.push(format!("Stage '{}' was skipped", event.stage));
                }
            }
        }

        for stage in started.difference(&passed) {
            if !violations.iter().any(|v| v.contains(&format!("'{stage}'"))) {
                violations.push(format!("Stage '{}' was started but never completed", stage));
            }
        }

        let passed = violations.is_empty();
        let message = if passed {
            "All stages passed".to_string()
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}
