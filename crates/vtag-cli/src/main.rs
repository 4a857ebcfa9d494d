//! vtag - build, test, and tag releases
//!
//! ## Commands
//!
//! - `run`: build and test, then tag `v<version>` on pushes to main
//! - `check`: build and test only
//! - `tag`: tag stage only
//! - `version`: print the manifest version and tag name

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use vtag_ci::{detect_trigger, PipelineResult, Workflow, WorkflowReport};
use vtag_core::config::{
    DEFAULT_BUILD_TIMEOUT_SECS, DEFAULT_COLOR, DEFAULT_MAIN_BRANCH, DEFAULT_REMOTE,
    DEFAULT_TEST_TIMEOUT_SECS,
};
use vtag_core::{
    manifest, GitBackend, ReleaseConfig, ReleaseGate, SystemGit, TagDecision, TagOutcome,
    TagPolicy, Trigger,
};

#[derive(Parser)]
#[command(name = "vtag")]
#[command(author)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build, test, and tag releases from a Cargo manifest", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and test, then tag the release on pushes to the main branch
    Run {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[command(flatten)]
        trigger: TriggerArgs,

        #[command(flatten)]
        tag: TagArgs,

        /// Write the JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Build and test only
    Check {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },

    /// Tag stage only (still gated on a push to the main branch)
    Tag {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[command(flatten)]
        trigger: TriggerArgs,

        #[command(flatten)]
        tag: TagArgs,

        /// Publish regardless of trigger and branch
        #[arg(long)]
        skip_gate: bool,
    },

    /// Print the manifest version and tag name
    Version {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
}

#[derive(Args, Clone)]
struct WorkspaceArgs {
    /// Workspace path
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Manifest to read the version from (default: <workspace>/Cargo.toml)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Branch whose pushes are tagged
    #[arg(long, env = "VTAG_MAIN_BRANCH", default_value = DEFAULT_MAIN_BRANCH)]
    main_branch: String,

    /// Terminal color for cargo stages (auto, always, never)
    #[arg(long, env = "CARGO_TERM_COLOR", default_value = DEFAULT_COLOR)]
    color: String,

    /// Build stage timeout in seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_BUILD_TIMEOUT_SECS)]
    build_timeout: u64,

    /// Test stage timeout in seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_TEST_TIMEOUT_SECS)]
    test_timeout: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventArg {
    Push,
    PullRequest,
    Manual,
}

#[derive(Args, Clone)]
struct TriggerArgs {
    /// Override the triggering event (default: detect from GitHub Actions or git)
    #[arg(long, value_enum, requires = "branch")]
    event: Option<EventArg>,

    /// Branch for an explicit --event
    #[arg(long, requires = "event")]
    branch: Option<String>,
}

#[derive(Args, Clone)]
struct TagArgs {
    /// Remote the tag is pushed to
    #[arg(long, env = "VTAG_REMOTE", default_value = DEFAULT_REMOTE)]
    remote: String,

    /// Existing-tag policy
    #[arg(long, value_enum, default_value = "force")]
    policy: PolicyArg,

    /// Create the tag locally without pushing it
    #[arg(long)]
    no_push: bool,

    /// Log what would be tagged without changing any refs
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Force,
    FailIfExists,
}

impl From<PolicyArg> for TagPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Force => TagPolicy::Force,
            PolicyArg::FailIfExists => TagPolicy::FailIfExists,
        }
    }
}

fn build_config(ws: &WorkspaceArgs, tag: Option<&TagArgs>) -> Result<ReleaseConfig> {
    let mut config = ReleaseConfig::for_workspace(ws.workspace.clone());
    config.manifest = manifest::manifest_path(&ws.workspace, ws.manifest.as_deref());
    config.main_branch = ws.main_branch.clone();
    config.color = ws.color.clone();
    config.build_timeout_secs = ws.build_timeout;
    config.test_timeout_secs = ws.test_timeout;
    if let Some(tag) = tag {
        config.remote = tag.remote.clone();
        config.policy = tag.policy.into();
        config.push = !tag.no_push;
        config.dry_run = tag.dry_run;
    }
    config.validate()?;
    Ok(config)
}

/// Explicit `--event`/`--branch` first, otherwise detected.
async fn resolve_trigger(args: &TriggerArgs, git: &dyn GitBackend) -> Result<Trigger> {
    match (args.event, args.branch.clone()) {
        (Some(EventArg::Push), Some(branch)) => Ok(Trigger::Push { branch }),
        (Some(EventArg::Manual), Some(branch)) => Ok(Trigger::Manual { branch }),
        (Some(EventArg::PullRequest), Some(head)) => Ok(Trigger::PullRequest {
            head,
            base: String::new(),
        }),
        _ => detect_trigger(git).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    vtag_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            workspace,
            trigger,
            tag,
            report,
        } => cmd_run(&workspace, &trigger, &tag, report.as_deref()).await,
        Commands::Check { workspace } => cmd_check(&workspace).await,
        Commands::Tag {
            workspace,
            trigger,
            tag,
            skip_gate,
        } => cmd_tag(&workspace, &trigger, &tag, skip_gate).await,
        Commands::Version { workspace } => cmd_version(&workspace),
    }
}

/// Full workflow: build/test, then gated tag publication
async fn cmd_run(
    ws: &WorkspaceArgs,
    trigger_args: &TriggerArgs,
    tag_args: &TagArgs,
    report_path: Option<&Path>,
) -> Result<()> {
    let config = build_config(ws, Some(tag_args))?;
    let git = SystemGit::open(&config.workspace)
        .await
        .context("Failed to open git repository")?;
    let trigger = resolve_trigger(trigger_args, &git).await?;

    let report = Workflow::new(config).run(&trigger, &git).await?;

    print_pipeline(&report.pipeline);
    print_report(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote run report");
    }

    if !report.build_passed() {
        anyhow::bail!("Build/test stage failed");
    }
    if let Some(err) = &report.tag_error {
        anyhow::bail!("Tag stage failed: {}", err);
    }
    Ok(())
}

/// Build/test stage only
async fn cmd_check(ws: &WorkspaceArgs) -> Result<()> {
    let config = build_config(ws, None)?;
    let result = Workflow::new(config).build_and_test().await?;
    print_pipeline(&result);

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("Build/test stage failed")
    }
}

/// Tag stage only
async fn cmd_tag(
    ws: &WorkspaceArgs,
    trigger_args: &TriggerArgs,
    tag_args: &TagArgs,
    skip_gate: bool,
) -> Result<()> {
    let config = build_config(ws, Some(tag_args))?;
    let git = SystemGit::open(&config.workspace)
        .await
        .context("Failed to open git repository")?;

    if !skip_gate {
        let trigger = resolve_trigger(trigger_args, &git).await?;
        // The build/test stage is assumed green when tagging on its own.
        let decision = ReleaseGate::decide(&trigger, &config.main_branch, true);
        if let TagDecision::Skip(reason) = decision {
            println!("Tag skipped ({}): {}", reason, trigger);
            return Ok(());
        }
    }

    let outcome = Workflow::new(config).publish_tag(&git).await?;
    print_tag(&outcome);
    Ok(())
}

/// Print manifest version and derived tag
fn cmd_version(ws: &WorkspaceArgs) -> Result<()> {
    let path = manifest::manifest_path(&ws.workspace, ws.manifest.as_deref());
    let version = manifest::read_version(&path)
        .with_context(|| format!("Failed to read version from {}", path.display()))?;
    println!("version: {}", version);
    println!("tag:     {}", version.tag_name());
    Ok(())
}

fn print_pipeline(result: &PipelineResult) {
    println!("Run ID: {}", result.run_id);
    println!("Status: {}", if result.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", result.duration_ms);
    println!();

    for stage in &result.stages {
        let status = if stage.passed() { "✓" } else { "✗" };
        println!(
            "  {} {} ({}ms, exit code: {})",
            status, stage.stage_name, stage.duration_ms, stage.exit_code
        );
    }
    for name in &result.skipped {
        println!("  - {} (skipped)", name);
    }

    // Stage output was streamed live; a spawn failure or timeout has none.
    if let Some(failed) = result.first_failure() {
        if failed.exit_code < 0 {
            println!();
            println!("{} error: {}", failed.stage_name, failed.stderr.trim());
        }
    }

    println!();
    println!(
        "Summary: {}/{} stages passed, {} failed, {} skipped",
        result.passed_count(),
        result.stages.len() + result.skipped.len(),
        result.failed_count(),
        result.skipped.len()
    );
}

fn print_report(report: &WorkflowReport) {
    println!("Trigger: {}", report.trigger);
    println!("Gate: {}", if report.gate.passed { "✓ PASSED" } else { "✗ FAILED" });
    for violation in &report.gate.violations {
        println!("  - {}", violation);
    }

    match (&report.tag, report.decision) {
        (Some(outcome), _) => print_tag(outcome),
        (None, TagDecision::Publish) if report.tag_error.is_some() => {
            println!("Tag: ✗ FAILED");
        }
        (None, TagDecision::Skip(reason)) => println!("Tag: skipped ({})", reason),
        (None, TagDecision::Publish) => println!("Tag: not published"),
    }
}

fn print_tag(outcome: &TagOutcome) {
    let mode = if outcome.dry_run {
        " [dry run]"
    } else if outcome.pushed {
        " [pushed]"
    } else {
        " [local]"
    };
    println!("Tag: {} -> {}{}", outcome.tag, outcome.commit, mode);
    if outcome.moved() {
        if let Some(prev) = &outcome.previous_target {
            println!("  moved from {}", prev);
        }
    }
}
