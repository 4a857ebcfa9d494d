//! The event that started a run.
//!
//! Detected from the GitHub Actions environment when present, otherwise
//! supplied by the caller (e.g. the local branch for a manual run).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, VtagError};

/// Triggering event for a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Trigger {
    /// A push of `branch`.
    Push { branch: String },

    /// A push of a tag ref (e.g. `v1.2.3`); never a release trigger.
    PushTag { tag: String },

    /// A pull request from `head` into `base`.
    PullRequest { head: String, base: String },

    /// A run started by hand on `branch`.
    Manual { branch: String },
}

impl Trigger {
    /// Detect the trigger from the process environment.
    ///
    /// Returns `Ok(None)` when not running under GitHub Actions.
    pub fn from_env() -> Result<Option<Self>> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Detect the trigger from a set of GitHub Actions variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Option<Self>> {
        let Some(event) = vars.get("GITHUB_EVENT_NAME") else {
            return Ok(None);
        };
        let get = |key: &str| vars.get(key).cloned().unwrap_or_default();

        let trigger = match event.as_str() {
            "push" => {
                let git_ref = get("GITHUB_REF");
                if let Some(branch) = branch_from_ref(&git_ref) {
                    Trigger::Push { branch }
                } else if let Some(tag) = git_ref
                    .strip_prefix("refs/tags/")
                    .filter(|t| !t.is_empty())
                {
                    Trigger::PushTag {
                        tag: tag.to_string(),
                    }
                } else {
                    return Err(VtagError::Trigger(format!(
                        "push event without a branch or tag ref: {git_ref:?}"
                    )));
                }
            }
            "pull_request" | "pull_request_target" => Trigger::PullRequest {
                head: get("GITHUB_HEAD_REF"),
                base: get("GITHUB_BASE_REF"),
            },
            "workflow_dispatch" => Trigger::Manual {
                branch: get("GITHUB_REF_NAME"),
            },
            other => {
                return Err(VtagError::Trigger(format!("unsupported event: {other}")));
            }
        };
        Ok(Some(trigger))
    }
}

/// Strip `refs/heads/` from a ref. Tag refs are not branches.
pub fn branch_from_ref(git_ref: &str) -> Option<String> {
    git_ref
        .strip_prefix("refs/heads/")
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Push { branch } => write!(f, "push to {branch}"),
            Trigger::PushTag { tag } => write!(f, "push of tag {tag}"),
            Trigger::PullRequest { head, base } => write!(f, "pull request {head} -> {base}"),
            Trigger::Manual { branch } => write!(f, "manual run on {branch}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_github_env() {
        assert_eq!(Trigger::from_vars(&HashMap::new()).unwrap(), None);
    }

    #[test]
    fn test_push_event() {
        let t = Trigger::from_vars(&vars(&[
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_REF", "refs/heads/main"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            t,
            Trigger::Push {
                branch: "main".to_string()
            }
        );
    }

    #[test]
    fn test_push_of_tag_is_a_tag_trigger() {
        let t = Trigger::from_vars(&vars(&[
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_REF", "refs/tags/v1.0.0"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            t,
            Trigger::PushTag {
                tag: "v1.0.0".to_string()
            }
        );
        assert_eq!(t.to_string(), "push of tag v1.0.0");
        assert_eq!(serde_json::to_value(&t).unwrap()["event"], "push_tag");
    }

    #[test]
    fn test_push_of_other_ref_is_rejected() {
        let err = Trigger::from_vars(&vars(&[
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_REF", "refs/notes/commits"),
        ]))
        .unwrap_err();
        assert!(matches!(err, VtagError::Trigger(_)));
    }

    #[test]
    fn test_pull_request_event() {
        let t = Trigger::from_vars(&vars(&[
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_REF", "refs/pull/7/merge"),
            ("GITHUB_HEAD_REF", "feature"),
            ("GITHUB_BASE_REF", "main"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            t,
            Trigger::PullRequest {
                head: "feature".to_string(),
                base: "main".to_string(),
            }
        );
    }

    #[test]
    fn test_unsupported_event() {
        let err = Trigger::from_vars(&vars(&[("GITHUB_EVENT_NAME", "schedule")])).unwrap_err();
        assert!(err.to_string().contains("schedule"));
    }

    #[test]
    fn test_branch_from_ref() {
        assert_eq!(branch_from_ref("refs/heads/release/1.x").as_deref(), Some("release/1.x"));
        assert_eq!(branch_from_ref("refs/heads/"), None);
        assert_eq!(branch_from_ref("main"), None);
    }

    #[test]
    fn test_serde_shape() {
        let t = Trigger::Push {
            branch: "main".to_string(),
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["event"], "push");
        assert_eq!(json["branch"], "main");
    }
}
