//! Pipeline plan identity.

use crate::stage::StageConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// The ordered stages a run will execute, with a stable digest.
///
/// Two runs with the same enabled stages, commands, and environment share
/// a digest, so logs from reruns can be grouped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CiPlan {
    /// Workspace root path.
    pub workspace_path: PathBuf,

    /// Names of the enabled stages, in order.
    pub stage_names: Vec<String>,

    /// SHA-256 digest of the ordered stage definitions.
    pub digest: String,
}

impl CiPlan {
    pub fn new(workspace_path: PathBuf, stages: &[StageConfig]) -> Self {
        let enabled: Vec<&StageConfig> = stages.iter().filter(|s| s.enabled).collect();
        Self {
            workspace_path,
            stage_names: enabled.iter().map(|s| s.name.clone()).collect(),
            digest: compute_stages_digest(&enabled),
        }
    }

    /// Short form (first 12 hex chars).
    pub fn short_digest(&self) -> &str {
        &self.digest[..12.min(self.digest.len())]
    }
}

/// Compute deterministic digest of ordered stage definitions.
fn compute_stages_digest(stages: &[&StageConfig]) -> String {
    let mut hasher = Sha256::new();
    for stage in stages {
        hasher.update(stage.name.as_bytes());
        hasher.update(b"\0");
        for arg in &stage.command {
            hasher.update(arg.as_bytes());
            hasher.update(b"\x1f");
        }
        for (key, value) in &stage.env {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{build_and_test, BuiltinStage};

    #[test]
    fn test_plan_names_enabled_stages() {
        let stages = vec![
            StageConfig::from_builtin(BuiltinStage::CargoBuild, 10),
            StageConfig::from_builtin(BuiltinStage::CargoTest, 10).disabled(),
        ];
        let plan = CiPlan::new(PathBuf::from("."), &stages);
        assert_eq!(plan.stage_names, vec!["cargo_build"]);
        assert_eq!(plan.digest.len(), 64);
        assert_eq!(plan.short_digest().len(), 12);
    }

    #[test]
    fn test_digest_deterministic() {
        let a = CiPlan::new(PathBuf::from("."), &build_and_test("always", 1, 1));
        let b = CiPlan::new(PathBuf::from("."), &build_and_test("always", 1, 1));
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_digest_order_sensitive() {
        let mut stages = build_and_test("always", 1, 1);
        let forward = CiPlan::new(PathBuf::from("."), &stages);
        stages.reverse();
        let reversed = CiPlan::new(PathBuf::from("."), &stages);
        assert_ne!(forward.digest, reversed.digest);
    }

    #[test]
    fn test_digest_tracks_environment() {
        let always = CiPlan::new(PathBuf::from("."), &build_and_test("always", 1, 1));
        let never = CiPlan::new(PathBuf::from("."), &build_and_test("never", 1, 1));
        assert_ne!(always.digest, never.digest);
    }
}
