//! Stage lifecycle events recorded by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of stage event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageEventKind {
    StageStarted,
    StagePassed,
    StageFailed,
    StageSkipped,
}

/// One entry in a run's event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageEvent {
    /// Monotonic sequence number within the run (1-indexed).
    pub seq: u64,
    pub kind: StageEventKind,
    pub stage: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// Append-only event log with sequence numbering.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<StageEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: StageEventKind, stage: &str, payload: Value) {
        let seq = self.events.len() as u64 + 1;
        self.events.push(StageEvent {
            seq,
            kind,
            stage: stage.to_string(),
            payload,
            timestamp: Utc::now(),
        });
    }

    pub fn into_events(self) -> Vec<StageEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sequence_numbers_start_at_one() {
        let mut log = EventLog::new();
        log.record(StageEventKind::StageStarted, "cargo_build", json!({}));
        log.record(StageEventKind::StagePassed, "cargo_build", json!({ "exit_code": 0 }));
        let events = log.into_events();
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].seq, 2);
        assert_eq!(events[1].kind, StageEventKind::StagePassed);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_value(StageEventKind::StageSkipped).unwrap();
        assert_eq!(json, "stage_skipped");
    }
}
