//! Snapshot of the running stack: containers, volumes and endpoints.

use serde::{Deserialize, Serialize};

use cs_api::EndpointReport;
use cs_core::error::{CsResult, StackError};

/// One row of `compose ps --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service: String,
    /// `running`, `exited`, `created`, ...
    #[serde(default)]
    pub state: String,
    /// Human status, e.g. `Up 2 minutes (healthy)`.
    #[serde(default)]
    pub status: String,
    /// `healthy`, `unhealthy`, `starting` or empty when there is no check.
    #[serde(default)]
    pub health: String,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Whether a named volume exists on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeStatus {
    /// Name in the service definition.
    pub name: String,
    /// Name on the host (`<project>_<name>`).
    pub qualified_name: String,
    pub owner: String,
    pub exists: bool,
}

/// Everything `status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct StackStatus {
    pub project: String,
    /// Services from the definition with no container at all.
    pub missing_services: Vec<String>,
    pub containers: Vec<ContainerStatus>,
    pub volumes: Vec<VolumeStatus>,
    pub endpoints: Vec<EndpointReport>,
}

impl StackStatus {
    /// All defined services have a running container.
    pub fn all_running(&self) -> bool {
        self.missing_services.is_empty() && self.containers.iter().all(|c| c.is_running())
    }
}

/// Parse `compose ps --format json` output.
///
/// Older tool versions print one JSON array, newer ones print one object per
/// line. Both are accepted; empty output means no containers.
pub fn parse_ps_output(stdout: &str) -> CsResult<Vec<ContainerStatus>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<ContainerStatus>(line).map_err(StackError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_form() {
        let out = r#"[{"Name":"chatstack-chat-1","Service":"chat","State":"running","Status":"Up 5 seconds","Health":""}]"#;
        let containers = parse_ps_output(out).unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].service, "chat");
        assert!(containers[0].is_running());
    }

    #[test]
    fn test_parse_line_form_with_extra_fields() {
        let out = concat!(
            r#"{"Name":"chatstack-database-1","Service":"database","State":"running","Health":"healthy","Publishers":[]}"#,
            "\n",
            r#"{"Name":"chatstack-identity-1","Service":"identity","State":"exited","Status":"Exited (1)"}"#,
            "\n"
        );
        let containers = parse_ps_output(out).unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].health, "healthy");
        assert!(!containers[1].is_running());
        assert_eq!(containers[1].status, "Exited (1)");
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(parse_ps_output("  \n").unwrap().is_empty());
        assert!(parse_ps_output("not json").is_err());
    }

    #[test]
    fn test_all_running() {
        let running = ContainerStatus {
            name: "c".into(),
            service: "chat".into(),
            state: "running".into(),
            status: String::new(),
            health: String::new(),
        };
        let mut status = StackStatus {
            project: "chatstack".into(),
            missing_services: vec![],
            containers: vec![running],
            volumes: vec![],
            endpoints: vec![],
        };
        assert!(status.all_running());
        status.missing_services.push("database".into());
        assert!(!status.all_running());
    }
}
