//! vtag core - manifest versions, release gating, and tag publication
//!
//! Provides the pieces of the release stage:
//! - Reading `package.version` from a Cargo manifest
//! - Deciding whether a run may publish (push to main, green build)
//! - Creating and force-pushing the `v<version>` tag through a git backend

pub mod config;
pub mod error;
pub mod fakes;
pub mod git;
pub mod manifest;
pub mod obs;
pub mod publisher;
pub mod release_gate;
pub mod telemetry;
pub mod trigger;
pub mod version;

// Re-export key types
pub use config::ReleaseConfig;
pub use error::{Result, VtagError};
pub use git::{GitBackend, SystemGit};
pub use publisher::{PublishOptions, TagOutcome, TagPolicy, TagPublisher};
pub use release_gate::{ReleaseGate, SkipReason, TagDecision};
pub use telemetry::init_tracing;
pub use trigger::Trigger;
pub use version::{ReleaseVersion, TagName};
