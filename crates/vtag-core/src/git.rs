//! Git integration for reading repository state and publishing tags.
//!
//! [`GitBackend`] is the seam the tag publisher talks to. [`SystemGit`]
//! shells out to the `git` binary; [`crate::fakes::MemoryGit`] backs tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VtagError};
use crate::version::TagName;

/// Repository operations needed to publish a release tag.
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Full SHA of the commit at HEAD.
    async fn head_sha(&self) -> Result<String>;

    /// Checked-out branch, or `None` on a detached HEAD.
    async fn current_branch(&self) -> Result<Option<String>>;

    /// Commit a local tag points at, or `None` if it does not exist.
    async fn tag_target(&self, tag: &TagName) -> Result<Option<String>>;

    /// Commit a tag points at on `remote`, or `None` if absent there.
    async fn remote_tag_target(&self, remote: &str, tag: &TagName) -> Result<Option<String>>;

    /// Create `tag` at `commit`. With `force`, an existing tag is moved.
    async fn create_tag(&self, tag: &TagName, commit: &str, force: bool) -> Result<()>;

    /// Push `tag` to `remote`. With `force`, the remote tag is overwritten.
    async fn push_tag(&self, remote: &str, tag: &TagName, force: bool) -> Result<()>;
}

/// [`GitBackend`] that runs the `git` CLI in a working tree.
#[derive(Debug, Clone)]
pub struct SystemGit {
    repo_dir: PathBuf,
}

impl SystemGit {
    /// Open the repository containing `dir`. Fails if `dir` is not inside a
    /// git work tree or git is not installed.
    pub async fn open(dir: &Path) -> Result<Self> {
        let git = Self {
            repo_dir: dir.to_path_buf(),
        };
        let inside = git.run(&["rev-parse", "--is-inside-work-tree"]).await?;
        if inside != "true" {
            return Err(VtagError::Git(format!(
                "{} is not inside a git work tree",
                dir.display()
            )));
        }
        Ok(git)
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!(args = ?args, dir = %self.repo_dir.display(), "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VtagError::Git(format!("failed to run git: {e}")))
    }

    /// Run git and return trimmed stdout, failing on non-zero exit.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VtagError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl GitBackend for SystemGit {
    async fn head_sha(&self) -> Result<String> {
        let sha = self.run(&["rev-parse", "HEAD"]).await?;
        if sha.is_empty() {
            return Err(VtagError::Git(
                "git rev-parse HEAD returned empty output".to_string(),
            ));
        }
        Ok(sha)
    }

    async fn current_branch(&self) -> Result<Option<String>> {
        let output = self.output(&["symbolic-ref", "--quiet", "--short", "HEAD"]).await?;
        // Exit 1 with --quiet means detached HEAD.
        if !output.status.success() {
            return Ok(None);
        }
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!branch.is_empty()).then_some(branch))
    }

    async fn tag_target(&self, tag: &TagName) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", tag.refname());
        let output = self.output(&["rev-parse", "--quiet", "--verify", &spec]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    async fn remote_tag_target(&self, remote: &str, tag: &TagName) -> Result<Option<String>> {
        let refname = tag.refname();
        let peeled = format!("{refname}^{{}}");
        let listing = self
            .run(&["ls-remote", "--tags", remote, &refname, &peeled])
            .await?;

        // Annotated tags list the tag object first and the peeled commit as `^{}`.
        let mut direct = None;
        for line in listing.lines() {
            let Some((sha, name)) = line.split_once('\t') else {
                continue;
            };
            if name == peeled {
                return Ok(Some(sha.to_string()));
            }
            if name == refname {
                direct = Some(sha.to_string());
            }
        }
        Ok(direct)
    }

    async fn create_tag(&self, tag: &TagName, commit: &str, force: bool) -> Result<()> {
        let mut args = vec!["tag"];
        if force {
            args.push("--force");
        }
        args.extend([tag.as_str(), commit]);
        self.run(&args).await.map(|_| ())
    }

    async fn push_tag(&self, remote: &str, tag: &TagName, force: bool) -> Result<()> {
        let refname = tag.refname();
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend([remote, refname.as_str()]);
        self.run(&args).await.map(|_| ())
    }
}
