//! chatstack models - the typed description of the four-container stack.
//!
//! This crate provides:
//! - Service and volume specifications derived from configuration
//! - Topology validation and dependency-ordered start waves
//! - Rendering of the service definition consumed by the orchestration tool
//! - A comment-preserving model of the shared environment file

pub mod service;
pub mod topology;
pub mod compose;
pub mod env_file;

// Re-export key types
pub use service::{Dependency, Endpoint, HealthCheck, PortMapping, ServiceRole, ServiceSpec, StartCondition, VolumeMount, VolumeSpec};
pub use topology::Topology;
pub use compose::{ComposeFile, VolumeUsage};
pub use env_file::EnvFile;
