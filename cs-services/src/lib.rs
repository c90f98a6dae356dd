//! chatstack services - everything that drives the orchestration tool.
//!
//! This crate provides:
//! - The `Orchestrator` trait and its process-spawning implementation
//! - Compose command construction for a configured project
//! - Stack lifecycle: up, down, restart, purge, logs, status
//! - First-run setup: environment file, public bucket, identity credentials

pub mod orchestrator;
pub mod compose;
pub mod lifecycle;
pub mod status;
pub mod setup;

// Re-export key types
pub use orchestrator::{CapturedOutput, Invocation, Orchestrator, ProcessOrchestrator};
pub use compose::ComposeCommand;
pub use lifecycle::StackLifecycle;
pub use status::{ContainerStatus, StackStatus, VolumeStatus};
pub use setup::{IdentityRegistration, SetupChecklist};
