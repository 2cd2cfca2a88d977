//! The job pipeline: state machine rules, lifecycle events, and the
//! orchestrator that drives a job from upload to completion.

pub mod events;
pub mod orchestrator;
pub mod stage;

pub use events::{PipelineEvent, PipelineEventKind};
pub use orchestrator::{JobCommand, Orchestrator, OrchestratorConfig};
