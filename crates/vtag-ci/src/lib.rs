//! vtag CI - build, test, and tag
//!
//! Provides the release workflow that:
//! - Executes Cargo stages (build, test) with all features enabled
//! - Halts at the first failing stage and evaluates a pass/fail gate
//! - Publishes the `v<version>` tag for pushes to the main branch

pub mod event;
pub mod gate;
pub mod pipeline;
pub mod plan;
pub mod runner;
pub mod stage;
pub mod workflow;

// Re-export key types
pub use event::{StageEvent, StageEventKind};
pub use gate::{CiGate, GateVerdict};
pub use pipeline::{CiPipeline, PipelineResult};
pub use plan::CiPlan;
pub use runner::{CiRunner, StageResult};
pub use stage::{BuiltinStage, StageConfig};
pub use workflow::{detect_trigger, Workflow, WorkflowReport};
