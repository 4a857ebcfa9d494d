//! CI stage definitions and configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Builtin CI stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// cargo build --all-features
    CargoBuild,

    /// cargo test --all-features
    CargoTest,
}

impl BuiltinStage {
    /// Build then test, in the order the pipeline runs them.
    pub const DEFAULT_ORDER: [BuiltinStage; 2] = [BuiltinStage::CargoBuild, BuiltinStage::CargoTest];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::CargoBuild => "cargo_build",
            BuiltinStage::CargoTest => "cargo_test",
        }
    }

    /// Get the stage's command.
    pub fn command(&self) -> Vec<String> {
        let sub = match self {
            BuiltinStage::CargoBuild => "build",
            BuiltinStage::CargoTest => "test",
        };
        vec!["cargo".to_string(), sub.to_string(), "--all-features".to_string()]
    }
}

/// Configuration for a CI stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageConfig {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Extra environment for the child process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Timeout in seconds (0 disables).
    pub timeout_secs: u64,

    /// Forward the child's stdout/stderr to ours while it runs.
    #[serde(default = "default_echo")]
    pub echo: bool,

    /// Whether this stage is enabled.
    pub enabled: bool,
}

impl StageConfig {
    /// Create a new stage configuration from a builtin stage.
    pub fn from_builtin(stage: BuiltinStage, timeout_secs: u64) -> Self {
        Self {
            name: stage.name().to_string(),
            command: stage.command(),
            env: BTreeMap::new(),
            timeout_secs,
            echo: true,
            enabled: true,
        }
    }

    /// Create a custom stage configuration.
    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            env: BTreeMap::new(),
            timeout_secs,
            echo: true,
            enabled: true,
        }
    }

    /// Set an environment variable for the stage's process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Capture output without echoing it.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Disable this stage.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_echo() -> bool {
    true
}

/// The build/test stages for a workspace, with the terminal color toggle
/// passed through as `CARGO_TERM_COLOR`.
pub fn build_and_test(color: &str, build_timeout_secs: u64, test_timeout_secs: u64) -> Vec<StageConfig> {
    BuiltinStage::DEFAULT_ORDER
        .iter()
        .map(|stage| {
            let timeout = match stage {
                BuiltinStage::CargoBuild => build_timeout_secs,
                BuiltinStage::CargoTest => test_timeout_secs,
            };
            StageConfig::from_builtin(*stage, timeout).with_env("CARGO_TERM_COLOR", color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_stage_names() {
        assert_eq!(BuiltinStage::CargoBuild.name(), "cargo_build");
        assert_eq!(BuiltinStage::CargoTest.name(), "cargo_test");
    }

    #[test]
    fn test_builtin_commands_enable_all_features() {
        assert_eq!(
            BuiltinStage::CargoBuild.command(),
            vec!["cargo", "build", "--all-features"]
        );
        assert_eq!(
            BuiltinStage::CargoTest.command(),
            vec!["cargo", "test", "--all-features"]
        );
    }

    #[test]
    fn test_stage_config_from_builtin() {
        let config = StageConfig::from_builtin(BuiltinStage::CargoBuild, 300);
        assert_eq!(config.name, "cargo_build");
        assert_eq!(config.timeout_secs, 300);
        assert!(config.enabled);
        assert!(config.echo);
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_stage_config_quiet() {
        let config = StageConfig::from_builtin(BuiltinStage::CargoBuild, 300).quiet();
        assert!(!config.echo);

        let json = r#"{"name":"x","command":["true"],"timeout_secs":0,"enabled":true}"#;
        let parsed: StageConfig = serde_json::from_str(json).unwrap();
        assert!(parsed.echo);
    }

    #[test]
    fn test_stage_config_custom() {
        let config = StageConfig::custom(
            "my_stage".to_string(),
            vec!["echo".to_string(), "hello".to_string()],
            60,
        );
        assert_eq!(config.name, "my_stage");
        assert_eq!(config.timeout_secs, 60);
        assert!(config.enabled);
    }

    #[test]
    fn test_stage_config_disabled() {
        let config = StageConfig::from_builtin(BuiltinStage::CargoTest, 300).disabled();
        assert!(!config.enabled);
    }

    #[test]
    fn test_build_and_test_order_and_color() {
        let stages = build_and_test("never", 10, 20);
        let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["cargo_build", "cargo_test"]);
        assert_eq!(stages[0].timeout_secs, 10);
        assert_eq!(stages[1].timeout_secs, 20);
        for stage in &stages {
            assert_eq!(stage.env.get("CARGO_TERM_COLOR").map(String::as_str), Some("never"));
        }
    }
}
