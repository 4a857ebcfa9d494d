//! In-memory fakes for the git backend (testing only)
//!
//! `MemoryGit` models one local repository and one remote's tag namespace
//! without touching the filesystem.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, VtagError};
use crate::git::GitBackend;
use crate::version::TagName;

#[derive(Debug, Default)]
struct RepoState {
    head: String,
    branch: Option<String>,
    local_tags: HashMap<String, String>,
    remote_tags: HashMap<String, HashMap<String, String>>,
    pushes: Vec<(String, String, bool)>,
    fail_push: bool,
}

/// In-memory repository with a single HEAD and per-remote tag maps.
#[derive(Debug, Default)]
pub struct MemoryGit {
    state: Mutex<RepoState>,
}

impl MemoryGit {
    pub fn new(head: &str, branch: &str) -> Self {
        Self {
            state: Mutex::new(RepoState {
                head: head.to_string(),
                branch: Some(branch.to_string()),
                ..RepoState::default()
            }),
        }
    }

    /// Move HEAD to a new commit, as a new push to the branch would.
    pub fn advance_head(&self, sha: &str) {
        self.state.lock().unwrap().head = sha.to_string();
    }

    /// Seed an existing tag on `remote` (and locally, as a fetch would).
    pub fn seed_tag(&self, remote: &str, tag: &str, sha: &str) {
        let mut state = self.state.lock().unwrap();
        state.local_tags.insert(tag.to_string(), sha.to_string());
        state
            .remote_tags
            .entry(remote.to_string())
            .or_default()
            .insert(tag.to_string(), sha.to_string());
    }

    /// Make every subsequent push fail, e.g. to simulate rejected credentials.
    pub fn fail_pushes(&self) {
        self.state.lock().unwrap().fail_push = true;
    }

    pub fn local_tag(&self, tag: &str) -> Option<String> {
        self.state.lock().unwrap().local_tags.get(tag).cloned()
    }

    pub fn remote_tag(&self, remote: &str, tag: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .remote_tags
            .get(remote)
            .and_then(|tags| tags.get(tag))
            .cloned()
    }

    /// Recorded pushes as `(remote, tag, force)`.
    pub fn pushes(&self) -> Vec<(String, String, bool)> {
        self.state.lock().unwrap().pushes.clone()
    }
}

#[async_trait]
impl GitBackend for MemoryGit {
    async fn head_sha(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().head.clone())
    }

    async fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().branch.clone())
    }

    async fn tag_target(&self, tag: &TagName) -> Result<Option<String>> {
        Ok(self.local_tag(tag.as_str()))
    }

    async fn remote_tag_target(&self, remote: &str, tag: &TagName) -> Result<Option<String>> {
        Ok(self.remote_tag(remote, tag.as_str()))
    }

    async fn create_tag(&self, tag: &TagName, commit: &str, force: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !force && state.local_tags.contains_key(tag.as_str()) {
            return Err(VtagError::Git(format!("tag '{tag}' already exists")));
        }
        state
            .local_tags
            .insert(tag.as_str().to_string(), commit.to_string());
        Ok(())
    }

    async fn push_tag(&self, remote: &str, tag: &TagName, force: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_push {
            return Err(VtagError::Git(format!(
                "push of {tag} to {remote} rejected: authentication failed"
            )));
        }
        let Some(target) = state.local_tags.get(tag.as_str()).cloned() else {
            return Err(VtagError::Git(format!("src refspec {tag} does not match any")));
        };
        let remote_tags = state.remote_tags.entry(remote.to_string()).or_default();
        if !force
            && remote_tags
                .get(tag.as_str())
                .is_some_and(|existing| existing != &target)
        {
            return Err(VtagError::Git(format!("{tag} rejected (already exists)")));
        }
        remote_tags.insert(tag.as_str().to_string(), target);
        state
            .pushes
            .push((remote.to_string(), tag.as_str().to_string(), force));
        Ok(())
    }
}
