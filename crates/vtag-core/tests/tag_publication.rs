//! Manifest-to-tag publication against a real git repository.

use std::path::Path;
use std::process::Command;

use vtag_core::{manifest, GitBackend, PublishOptions, SystemGit, TagPublisher};

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn workspace_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Cargo.toml"),
        "[workspace]\nmembers = [\"crates/app\"]\n\n[workspace.package]\nversion = \"4.2.0-beta.1\"\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("crates/app")).unwrap();
    std::fs::write(
        dir.path().join("crates/app/Cargo.toml"),
        "[package]\nname = \"app\"\nversion.workspace = true\n",
    )
    .unwrap();

    run_git(dir.path(), &["init", "-b", "main"]);
    run_git(dir.path(), &["config", "user.name", "test-user"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-m", "initial"]);
    dir
}

#[tokio::test]
async fn inherited_workspace_version_is_tagged_locally() {
    let repo = workspace_repo();
    let member = repo.path().join("crates/app/Cargo.toml");

    let version = manifest::read_version(&member).unwrap();
    assert_eq!(version.as_str(), "4.2.0-beta.1");
    assert!(version.is_prerelease());

    let git = SystemGit::open(repo.path()).await.unwrap();
    let options = PublishOptions {
        push: false,
        ..PublishOptions::default()
    };
    let outcome = TagPublisher::publish(&git, &version, &options).await.unwrap();

    assert_eq!(outcome.tag.as_str(), "v4.2.0-beta.1");
    assert!(!outcome.pushed);
    assert_eq!(
        git.tag_target(&outcome.tag).await.unwrap(),
        Some(git.head_sha().await.unwrap())
    );
    assert_eq!(run_git(repo.path(), &["tag", "--list"]), "v4.2.0-beta.1");
}

#[tokio::test]
async fn republishing_same_commit_is_not_a_move() {
    let repo = workspace_repo();
    let version = manifest::read_version(&repo.path().join("crates/app/Cargo.toml")).unwrap();
    let git = SystemGit::open(repo.path()).await.unwrap();
    let options = PublishOptions {
        push: false,
        ..PublishOptions::default()
    };

    let first = TagPublisher::publish(&git, &version, &options).await.unwrap();
    let second = TagPublisher::publish(&git, &version, &options).await.unwrap();

    assert_eq!(first.tag, second.tag);
    assert_eq!(second.previous_target.as_deref(), Some(first.commit.as_str()));
    assert!(!second.moved());
}
