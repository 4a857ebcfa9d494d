//! Tag publication.
//!
//! Given a version V, create the tag `v{V}` at HEAD and push it to the
//! remote. Under [`TagPolicy::Force`] an existing tag of the same name is
//! overwritten locally and on the remote; under [`TagPolicy::FailIfExists`]
//! the publisher refuses to touch it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{Result, VtagError};
use crate::git::GitBackend;
use crate::obs;
use crate::version::{ReleaseVersion, TagName};

/// What to do when the tag already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagPolicy {
    /// Overwrite the tag locally and on the remote.
    #[default]
    Force,
    /// Fail if the tag exists locally or on the remote.
    FailIfExists,
}

impl TagPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagPolicy::Force => "force",
            TagPolicy::FailIfExists => "fail-if-exists",
        }
    }

    fn force(&self) -> bool {
        matches!(self, TagPolicy::Force)
    }
}

impl fmt::Display for TagPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagPolicy {
    type Err = VtagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "force" => Ok(TagPolicy::Force),
            "fail-if-exists" => Ok(TagPolicy::FailIfExists),
            other => Err(VtagError::Config(format!(
                "unknown tag policy {other:?} (expected force or fail-if-exists)"
            ))),
        }
    }
}

/// Options for a single publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub remote: String,
    pub policy: TagPolicy,
    /// Create the local tag but do not push it.
    pub push: bool,
    /// Compute and log the tag without changing any refs.
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            policy: TagPolicy::Force,
            push: true,
            dry_run: false,
        }
    }
}

/// Result of a tag publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOutcome {
    pub tag: TagName,
    /// Commit the tag now points at.
    pub commit: String,
    /// Commit the tag pointed at before this run, locally or on the remote.
    pub previous_target: Option<String>,
    pub pushed: bool,
    pub dry_run: bool,
}

impl TagOutcome {
    /// Whether an existing tag was moved to a different commit.
    pub fn moved(&self) -> bool {
        self.previous_target
            .as_deref()
            .is_some_and(|prev| prev != self.commit)
    }
}

pub struct TagPublisher;

impl TagPublisher {
    /// Create and push `v{version}` at HEAD according to `options`.
    pub async fn publish(
        git: &dyn GitBackend,
        version: &ReleaseVersion,
        options: &PublishOptions,
    ) -> Result<TagOutcome> {
        let tag = version.tag_name();
        let commit = git.head_sha().await?;

        let local = git.tag_target(&tag).await?;
        let remote = if options.push {
            git.remote_tag_target(&options.remote, &tag).await?
        } else {
            None
        };
        let previous_target = remote.or(local);

        if let Some(prev) = &previous_target {
            match options.policy {
                TagPolicy::FailIfExists => {
                    return Err(VtagError::TagAlreadyExists {
                        tag: tag.to_string(),
                        target: Some(prev.clone()),
                    });
                }
                TagPolicy::Force if prev != &commit => {
                    warn!(tag = %tag, from = %prev, to = %commit, "Overwriting existing tag");
                }
                TagPolicy::Force => {}
            }
        }

        if options.dry_run {
            info!(tag = %tag, commit = %commit, remote = %options.remote, "Dry run: not creating tag");
            obs::emit_tag_published(
                tag.as_str(),
                &commit,
                previous_target.as_deref(),
                false,
                true,
            );
            return Ok(TagOutcome {
                tag,
                commit,
                previous_target,
                pushed: false,
                dry_run: true,
            });
        }

        let force = options.policy.force();
        git.create_tag(&tag, &commit, force).await?;
        info!(
            tag = %tag,
            commit = %commit,
            force = force,
            prerelease = version.is_prerelease(),
            "Created tag"
        );

        if options.push {
            git.push_tag(&options.remote, &tag, force).await?;
            info!(tag = %tag, remote = %options.remote, force = force, "Pushed tag");
        }

        obs::emit_tag_published(
            tag.as_str(),
            &commit,
            previous_target.as_deref(),
            options.push,
            false,
        );

        Ok(TagOutcome {
            tag,
            commit,
            previous_target,
            pushed: options.push,
            dry_run: false,
        })
    }
}
