//! # Pourfix Core
//!
//! "The Brain" - job orchestration, POUR fixing agents, and state
//! management for the Pourfix accessibility pipeline.
//!
//! ## Architecture
//!
//! - `models`: Job, Issue, Fix, ValidationResult data model
//! - `fileset`: in-memory file sets and directory ingestion
//! - `detect`: accessibility issue detection (rule-based built-in)
//! - `agents`: the four POUR category fixing agents
//! - `patch`: fix application and merge conflict handling
//! - `validate`: post-fix re-checking of touched files
//! - `summary`: derived job aggregates
//! - `report`: report assembly and Markdown rendering
//! - `state`: job store (in-memory + SQLite persistence)
//! - `pipeline`: the job state machine and orchestrator

pub mod agents;
pub mod detect;
pub mod fileset;
pub mod models;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod state;
pub mod summary;
pub mod validate;

pub use fileset::FileSet;
pub use models::{
    Category, Fix, Issue, Job, JobStatus, JobSummary, MergeNote, Severity,
    ValidationResult,
};
pub use pipeline::orchestrator::{JobCommand, Orchestrator, OrchestratorConfig};
pub use state::store::JobStore;
