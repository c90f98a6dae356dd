//! Service, volume and endpoint specifications.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which of the four collaborators a service is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRole {
    /// The user-facing chat application.
    Chat,
    /// S3-compatible object storage for uploaded files.
    ObjectStore,
    /// OAuth identity provider.
    Identity,
    /// Relational store for structured application state.
    Database,
}

impl ServiceRole {
    /// Human-readable role name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat => "chat application",
            Self::ObjectStore => "object store",
            Self::Identity => "identity provider",
            Self::Database => "relational store",
        }
    }
}

impl std::fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A published port, `host:container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    pub fn new(host: u16, container: u16) -> Self {
        Self { host, container }
    }
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// A named volume attached at a path inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub volume: String,
    pub path: String,
}

impl std::fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.volume, self.path)
    }
}

/// What a dependent waits for before starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartCondition {
    /// The dependency container has been started.
    Started,
    /// The dependency's health check passes.
    Healthy,
}

impl StartCondition {
    /// Condition string understood by the orchestration tool.
    pub fn as_compose_str(&self) -> &'static str {
        match self {
            Self::Started => "service_started",
            Self::Healthy => "service_healthy",
        }
    }
}

/// A start-order edge: the owning service starts after `service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub service: String,
    pub condition: StartCondition,
}

impl Dependency {
    pub fn started(service: impl Into<String>) -> Self {
        Self { service: service.into(), condition: StartCondition::Started }
    }

    pub fn healthy(service: impl Into<String>) -> Self {
        Self { service: service.into(), condition: StartCondition::Healthy }
    }
}

/// Container health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Test command in exec form, e.g. `["CMD-SHELL", "pg_isready"]`.
    pub test: Vec<String>,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub retries: u32,
}

/// One container of the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub role: ServiceRole,
    pub image: String,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub depends_on: Vec<Dependency>,
    /// Overrides the image's default command.
    pub command: Option<Vec<String>>,
    /// Literal environment entries; may reference `${KEY}` from the env file.
    pub environment: BTreeMap<String, String>,
    pub health_check: Option<HealthCheck>,
    /// Environment file loaded into the container.
    pub env_file: Option<String>,
}

impl ServiceSpec {
    /// Whether this service waits on `other`.
    pub fn depends_on_service(&self, other: &str) -> bool {
        self.depends_on.iter().any(|d| d.service == other)
    }
}

/// A named persistent volume and the one service that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    pub owner: String,
    /// What is irrecoverably lost when the volume is deleted.
    pub holds: String,
}

/// An HTTP surface exposed to the operator on a fixed local port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Short label, e.g. "chat" or "identity console".
    pub name: String,
    pub service: String,
    pub role: ServiceRole,
    pub url: String,
}
