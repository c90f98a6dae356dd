//! The service definition file consumed by the orchestration tool.
//!
//! Only the subset of the compose format this stack needs is modelled.
//! Maps are `BTreeMap` so rendering is deterministic and re-running
//! `render` on an unchanged config produces a byte-identical file.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use cs_core::error::CsResult;

use crate::topology::Topology;

/// Header written above the rendered YAML.
const GENERATED_HEADER: &str =
    "# Generated by chatstack from config.toml. Edits are overwritten on `chatstack up`\n\
     # unless [orchestrator] render_compose = false.\n";

/// Top-level compose document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub name: String,
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default)]
    pub volumes: BTreeMap<String, ComposeVolume>,
}

/// One service entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_file: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, ComposeDependsOn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthcheck>,
}

/// Long-form `depends_on` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeDependsOn {
    pub condition: String,
}

/// Health check block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeHealthcheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

/// Top-level volume declaration. Empty means "tool-managed named volume".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeVolume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ComposeFile {
    /// Build the document from a topology.
    pub fn from_topology(topology: &Topology) -> Self {
        let services = topology
            .services
            .iter()
            .map(|svc| {
                let service = ComposeService {
                    image: svc.image.clone(),
                    command: svc.command.clone(),
                    restart: Some("unless-stopped".to_string()),
                    env_file: svc.env_file.iter().cloned().collect(),
                    environment: svc.environment.clone(),
                    ports: svc.ports.iter().map(|p| p.to_string()).collect(),
                    volumes: svc.volumes.iter().map(|v| v.to_string()).collect(),
                    depends_on: svc
                        .depends_on
                        .iter()
                        .map(|d| {
                            (
                                d.service.clone(),
                                ComposeDependsOn {
                                    condition: d.condition.as_compose_str().to_string(),
                                },
                            )
                        })
                        .collect(),
                    healthcheck: svc.health_check.as_ref().map(|h| ComposeHealthcheck {
                        test: h.test.clone(),
                        interval: format!("{}s", h.interval_secs),
                        timeout: format!("{}s", h.timeout_secs),
                        retries: h.retries,
                    }),
                };
                (svc.name.clone(), service)
            })
            .collect();

        let volumes = topology
            .volumes
            .iter()
            .map(|v| (v.name.clone(), ComposeVolume::default()))
            .collect();

        Self {
            name: topology.project.clone(),
            services,
            volumes,
        }
    }

    /// Serialize to YAML with the generated-file header.
    pub fn to_yaml(&self) -> CsResult<String> {
        let body = serde_yaml_ng::to_string(self)?;
        Ok(format!("{GENERATED_HEADER}{body}"))
    }

    /// Parse a compose document.
    pub fn parse(yaml: &str) -> CsResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Names of services that mount `volume`.
    pub fn services_mounting(&self, volume: &str) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, svc)| svc.volumes.iter().any(|v| mount_source(v) == Some(volume)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Volume mistakes in this document. See [`VolumeUsage::problems`].
    pub fn volume_problems(&self) -> Vec<String> {
        VolumeUsage::from_compose(self).problems()
    }
}

/// Named-volume declarations and mounts, read from any compose document.
///
/// Hand-written files use short forms this crate never renders (string
/// `command`, list `depends_on`, long-form mounts), so this works on the
/// untyped YAML and ignores everything but volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeUsage {
    declared: BTreeSet<String>,
    /// Service name to the named volumes it mounts.
    mounts: BTreeMap<String, Vec<String>>,
}

impl VolumeUsage {
    pub fn from_compose(compose: &ComposeFile) -> Self {
        Self {
            declared: compose.volumes.keys().cloned().collect(),
            mounts: compose
                .services
                .iter()
                .map(|(name, svc)| {
                    let named = svc.volumes.iter().filter_map(|v| mount_source(v)).map(String::from);
                    (name.clone(), named.collect())
                })
                .collect(),
        }
    }

    /// Read volume usage from compose YAML of any shape.
    pub fn from_yaml(yaml: &str) -> CsResult<Self> {
        let doc: Value = serde_yaml_ng::from_str(yaml)?;

        let declared = match doc.get("volumes") {
            Some(Value::Mapping(map)) => map.keys().filter_map(Value::as_str).map(String::from).collect(),
            _ => BTreeSet::new(),
        };

        let mut mounts = BTreeMap::new();
        if let Some(Value::Mapping(services)) = doc.get("services") {
            for (name, svc) in services {
                let Some(name) = name.as_str() else { continue };
                let named = match svc.get("volumes") {
                    Some(Value::Sequence(items)) => items.iter().filter_map(long_or_short_source).collect(),
                    _ => Vec::new(),
                };
                mounts.insert(name.to_string(), named);
            }
        }

        Ok(Self { declared, mounts })
    }

    /// Services mounting `volume`.
    pub fn services_mounting(&self, volume: &str) -> Vec<&str> {
        self.mounts
            .iter()
            .filter(|(_, named)| named.iter().any(|v| v == volume))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Declared volumes that no service or several services mount, and
    /// mounts of named volumes missing from the declaration.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for name in &self.declared {
            match self.services_mounting(name).len() {
                0 => problems.push(format!("volume '{name}' is declared but never mounted")),
                1 => {}
                n => problems.push(format!("volume '{name}' is mounted by {n} services")),
            }
        }
        for (svc_name, named) in &self.mounts {
            for source in named {
                if !self.declared.contains(source) {
                    problems.push(format!(
                        "service '{svc_name}' mounts '{source}' which is not declared"
                    ));
                }
            }
        }
        problems
    }
}

/// Named volume of a short-form mount (`name:/path[:mode]`). Bind mounts
/// and anonymous volumes have none.
fn mount_source(mount: &str) -> Option<&str> {
    let (source, _) = mount.split_once(':')?;
    let is_path = source.starts_with('.') || source.starts_with('/') || source.starts_with('~');
    (!source.is_empty() && !is_path).then_some(source)
}

fn long_or_short_source(item: &Value) -> Option<String> {
    match item {
        Value::String(short) => mount_source(short).map(String::from),
        Value::Mapping(_) => {
            let kind = item.get("type").and_then(Value::as_str).unwrap_or("volume");
            if kind != "volume" {
                return None;
            }
            item.get("source").and_then(Value::as_str).map(String::from)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::config::StackConfig;

    fn rendered() -> ComposeFile {
        Topology::from_config(&StackConfig::default()).to_compose()
    }

    #[test]
    fn test_declares_exactly_two_volumes() {
        let compose = rendered();
        let names: Vec<_> = compose.volumes.keys().cloned().collect();
        assert_eq!(names, vec!["chat-data".to_string(), "db-data".to_string()]);
        assert_eq!(compose.services_mounting("chat-data"), vec!["chat"]);
        assert_eq!(compose.services_mounting("db-data"), vec!["database"]);
        assert!(compose.volume_problems().is_empty());
    }

    #[test]
    fn test_chat_service_entry() {
        let compose = rendered();
        let chat = &compose.services["chat"];
        assert_eq!(chat.ports, vec!["3000:3000".to_string()]);
        assert_eq!(chat.env_file, vec![".env".to_string()]);
        assert_eq!(chat.depends_on["database"].condition, "service_healthy");
        assert_eq!(chat.depends_on["identity"].condition, "service_started");
    }

    #[test]
    fn test_yaml_parses_back() {
        let compose = rendered();
        let yaml = compose.to_yaml().unwrap();
        assert!(yaml.starts_with("# Generated by chatstack"));
        assert!(yaml.contains("pg_isready"));
        let parsed = ComposeFile::parse(&yaml).unwrap();
        assert_eq!(parsed, compose);
    }

    #[test]
    fn test_volume_problems_on_hand_edited_file() {
        let yaml = r#"
name: chatstack
services:
  chat:
    image: chat
    volumes: ["chat-data:/app/data", "./local:/mnt"]
  worker:
    image: worker
    volumes: ["chat-data:/data", "scratch:/tmp"]
volumes:
  chat-data: {}
  db-data: {}
"#;
        let problems = ComposeFile::parse(yaml).unwrap().volume_problems();
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("'db-data' is declared but never mounted")));
        assert!(problems.iter().any(|p| p.contains("'chat-data' is mounted by 2 services")));
        assert!(problems.iter().any(|p| p.contains("'scratch' which is not declared")));
    }

    #[test]
    fn test_usage_from_short_form_file() {
        let yaml = r#"
services:
  chat:
    image: chat
    env_file: .env
    command: server /data
    depends_on: [db]
    volumes:
      - chat-data:/app/data
      - ./config:/config:ro
  db:
    image: postgres:16
    volumes:
      - type: volume
        source: db-data
        target: /var/lib/postgresql/data
      - type: bind
        source: ./init
        target: /docker-entrypoint-initdb.d
volumes:
  chat-data:
  db-data:
"#;
        assert!(ComposeFile::parse(yaml).is_err());

        let usage = VolumeUsage::from_yaml(yaml).unwrap();
        assert_eq!(usage.services_mounting("db-data"), vec!["db"]);
        assert!(usage.problems().is_empty(), "{:?}", usage.problems());
    }

    #[test]
    fn test_usage_from_yaml_matches_typed_check() {
        let yaml = rendered().to_yaml().unwrap();
        let usage = VolumeUsage::from_yaml(&yaml).unwrap();
        assert_eq!(usage, VolumeUsage::from_compose(&rendered()));
        assert!(VolumeUsage::from_yaml("services: [unclosed").is_err());
    }
}
