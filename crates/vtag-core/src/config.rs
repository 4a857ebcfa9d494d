//! Resolved run configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, VtagError};
use crate::manifest;
use crate::publisher::{PublishOptions, TagPolicy};

pub const DEFAULT_MAIN_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_COLOR: &str = "always";
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 3600;

/// Values `CARGO_TERM_COLOR` accepts.
const COLOR_CHOICES: [&str; 3] = ["auto", "always", "never"];

/// Settings for one workflow run, after CLI/env resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Directory cargo runs in and git operates on.
    pub workspace: PathBuf,

    /// Manifest the version is read from.
    pub manifest: PathBuf,

    /// Only pushes to this branch are tagged.
    pub main_branch: String,

    pub remote: String,

    /// Value for `CARGO_TERM_COLOR` in cargo stages.
    pub color: String,

    pub policy: TagPolicy,

    pub push: bool,

    pub dry_run: bool,

    pub build_timeout_secs: u64,

    pub test_timeout_secs: u64,
}

impl ReleaseConfig {
    /// Configuration with defaults for `workspace`.
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let manifest = manifest::manifest_path(&workspace, None);
        Self {
            workspace,
            manifest,
            main_branch: DEFAULT_MAIN_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            color: DEFAULT_COLOR.to_string(),
            policy: TagPolicy::default(),
            push: true,
            dry_run: false,
            build_timeout_secs: DEFAULT_BUILD_TIMEOUT_SECS,
            test_timeout_secs: DEFAULT_TEST_TIMEOUT_SECS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.main_branch.trim().is_empty() {
            return Err(VtagError::Config("main branch must not be empty".to_string()));
        }
        if self.remote.trim().is_empty() {
            return Err(VtagError::Config("remote must not be empty".to_string()));
        }
        if !COLOR_CHOICES.contains(&self.color.as_str()) {
            return Err(VtagError::Config(format!(
                "color must be one of {}, got {:?}",
                COLOR_CHOICES.join(", "),
                self.color
            )));
        }
        Ok(())
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            remote: self.remote.clone(),
            policy: self.policy,
            push: self.push,
            dry_run: self.dry_run,
        }
    }
}
