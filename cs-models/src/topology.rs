//! The stack topology: which services run, how they depend on each other
//! and which of them own the persistent volumes.
//!
//! Start order is modelled as a directed graph (dependency -> dependent).
//! A topological sort rejects cycles, and depth-based grouping produces
//! start waves: every service in a wave only waits on earlier waves.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use tracing::debug;

use cs_core::config::StackConfig;
use cs_core::constants::{self, env_keys};
use cs_core::error::{CsResult, StackError};

use crate::compose::ComposeFile;
use crate::service::{
    Dependency, Endpoint, HealthCheck, PortMapping, ServiceRole, ServiceSpec, VolumeMount,
    VolumeSpec,
};

/// Port the object-store API listens on inside its container.
const OBJECT_STORE_API_PORT: u16 = 9000;
/// Port the object-store console listens on inside its container.
const OBJECT_STORE_CONSOLE_PORT: u16 = 9001;
/// Port the identity provider listens on inside its container.
const IDENTITY_PORT: u16 = 8000;

/// The full set of services and volumes managed together.
#[derive(Debug, Clone)]
pub struct Topology {
    pub project: String,
    pub services: Vec<ServiceSpec>,
    pub volumes: Vec<VolumeSpec>,
}

impl Topology {
    /// Build the four-service stack described by `config`.
    pub fn from_config(config: &StackConfig) -> Self {
        let env_file = Some(config.orchestrator.env_file.clone());
        let db = &config.database;
        let store = &config.object_store;
        let idp = &config.identity;
        let chat = &config.chat;

        let database = ServiceSpec {
            name: db.service_name.clone(),
            role: ServiceRole::Database,
            image: db.image.clone(),
            ports: vec![],
            volumes: vec![VolumeMount {
                volume: config.volumes.db_data.clone(),
                path: db.data_path.clone(),
            }],
            depends_on: vec![],
            command: None,
            environment: BTreeMap::new(),
            health_check: Some(HealthCheck {
                test: vec![
                    "CMD-SHELL".into(),
                    format!("pg_isready -U $${{{}}}", env_keys::POSTGRES_USER),
                ],
                interval_secs: 5,
                timeout_secs: 5,
                retries: 10,
            }),
            env_file: env_file.clone(),
        };

        let object_store = ServiceSpec {
            name: store.service_name.clone(),
            role: ServiceRole::ObjectStore,
            image: store.image.clone(),
            ports: vec![
                PortMapping::new(store.api_port, OBJECT_STORE_API_PORT),
                PortMapping::new(store.console_port, OBJECT_STORE_CONSOLE_PORT),
            ],
            volumes: vec![],
            depends_on: vec![],
            command: Some(vec![
                "server".into(),
                "/data".into(),
                "--console-address".into(),
                format!(":{OBJECT_STORE_CONSOLE_PORT}"),
            ]),
            environment: BTreeMap::new(),
            health_check: None,
            env_file: env_file.clone(),
        };

        let mut idp_env = BTreeMap::new();
        idp_env.insert("driverName".to_string(), "postgres".to_string());
        idp_env.insert(
            "dataSourceName".to_string(),
            format!(
                "user=${{{}}} password=${{{}}} host={} port={} sslmode=disable dbname=",
                env_keys::POSTGRES_USER,
                env_keys::POSTGRES_PASSWORD,
                db.service_name,
                constants::DATABASE_PORT
            ),
        );
        idp_env.insert("dbName".to_string(), format!("${{{}}}", env_keys::POSTGRES_DB));

        let identity = ServiceSpec {
            name: idp.service_name.clone(),
            role: ServiceRole::Identity,
            image: idp.image.clone(),
            ports: vec![PortMapping::new(idp.port, IDENTITY_PORT)],
            volumes: vec![],
            depends_on: vec![Dependency::healthy(&db.service_name)],
            command: None,
            environment: idp_env,
            health_check: None,
            env_file: env_file.clone(),
        };

        let chat_service = ServiceSpec {
            name: chat.service_name.clone(),
            role: ServiceRole::Chat,
            image: chat.image.clone(),
            ports: vec![PortMapping::new(chat.port, chat.container_port)],
            volumes: vec![VolumeMount {
                volume: config.volumes.app_data.clone(),
                path: chat.data_path.clone(),
            }],
            depends_on: vec![
                Dependency::healthy(&db.service_name),
                Dependency::started(&store.service_name),
                Dependency::started(&idp.service_name),
            ],
            command: None,
            environment: BTreeMap::new(),
            health_check: None,
            env_file,
        };

        let volumes = vec![
            VolumeSpec {
                name: config.volumes.app_data.clone(),
                owner: chat.service_name.clone(),
                holds: "chat settings, uploaded documents and conversation history".into(),
            },
            VolumeSpec {
                name: config.volumes.db_data.clone(),
                owner: db.service_name.clone(),
                holds: "relational store data (users, conversations, identity records)".into(),
            },
        ];

        Self {
            project: config.project.name.clone(),
            services: vec![database, object_store, identity, chat_service],
            volumes,
        }
    }

    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Look up the service playing `role`.
    pub fn service_for(&self, role: ServiceRole) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.role == role)
    }

    /// Check the definition for structural mistakes.
    ///
    /// Rejects duplicate service names, dependencies on unknown services,
    /// dependency cycles, two services publishing the same host port,
    /// mounts of undeclared volumes, and any volume that is not mounted by
    /// exactly one service.
    pub fn validate(&self) -> CsResult<()> {
        let mut names = HashSet::new();
        for svc in &self.services {
            if !names.insert(svc.name.as_str()) {
                return Err(StackError::Topology(format!(
                    "duplicate service name '{}'",
                    svc.name
                )));
            }
        }

        let mut host_ports: HashMap<u16, &str> = HashMap::new();
        for svc in &self.services {
            for port in &svc.ports {
                if let Some(other) = host_ports.insert(port.host, svc.name.as_str()) {
                    return Err(StackError::Topology(format!(
                        "host port {} is published by both '{}' and '{}'",
                        port.host, other, svc.name
                    )));
                }
            }
        }

        let declared: HashSet<&str> = self.volumes.iter().map(|v| v.name.as_str()).collect();
        let mut mounters: HashMap<&str, Vec<&str>> = HashMap::new();
        for svc in &self.services {
            for mount in &svc.volumes {
                if !declared.contains(mount.volume.as_str()) {
                    return Err(StackError::Topology(format!(
                        "service '{}' mounts undeclared volume '{}'",
                        svc.name, mount.volume
                    )));
                }
                mounters.entry(mount.volume.as_str()).or_default().push(svc.name.as_str());
            }
        }
        for volume in &self.volumes {
            match mounters.get(volume.name.as_str()).map(Vec::as_slice) {
                Some([only]) if *only == volume.owner => {}
                Some([only]) => {
                    return Err(StackError::Topology(format!(
                        "volume '{}' is owned by '{}' but mounted by '{}'",
                        volume.name, volume.owner, only
                    )));
                }
                Some(many) if many.len() > 1 => {
                    return Err(StackError::Topology(format!(
                        "volume '{}' is mounted by more than one service: {}",
                        volume.name,
                        many.join(", ")
                    )));
                }
                _ => {
                    return Err(StackError::Topology(format!(
                        "volume '{}' is not mounted by any service",
                        volume.name
                    )));
                }
            }
        }

        self.start_waves().map(|_| ())
    }

    /// Group services into start waves.
    ///
    /// Wave 0 holds services without dependencies; each later wave only
    /// depends on services in earlier waves. Within a wave, services keep
    /// their declaration order.
    pub fn start_waves(&self) -> CsResult<Vec<Vec<&ServiceSpec>>> {
        if self.services.is_empty() {
            return Ok(vec![]);
        }

        let id_to_idx: HashMap<&str, usize> = self
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();

        // Edge from dependency -> dependent
        let mut graph = DiGraph::<&str, ()>::new();
        let nodes: Vec<_> = self
            .services
            .iter()
            .map(|s| graph.add_node(s.name.as_str()))
            .collect();

        for (to_idx, svc) in self.services.iter().enumerate() {
            for dep in &svc.depends_on {
                let from_idx = id_to_idx.get(dep.service.as_str()).ok_or_else(|| {
                    StackError::Topology(format!(
                        "service '{}' depends on unknown service '{}'",
                        svc.name, dep.service
                    ))
                })?;
                graph.add_edge(nodes[*from_idx], nodes[to_idx], ());
            }
        }

        let sorted = toposort(&graph, None).map_err(|cycle| {
            StackError::Topology(format!(
                "dependency cycle involving service '{}'",
                graph[cycle.node_id()]
            ))
        })?;

        let mut depths: HashMap<&str, usize> = HashMap::new();
        for node in sorted {
            let name = graph[node];
            let svc = &self.services[id_to_idx[name]];
            let depth = svc
                .depends_on
                .iter()
                .map(|d| depths.get(d.service.as_str()).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            depths.insert(name, depth);
        }

        let max_depth = depths.values().copied().max().unwrap_or(0);
        let mut waves: Vec<Vec<&ServiceSpec>> = vec![vec![]; max_depth + 1];
        for svc in &self.services {
            waves[depths[svc.name.as_str()]].push(svc);
        }

        debug!(
            "start waves: {:?}",
            waves
                .iter()
                .map(|w| w.iter().map(|s| s.name.as_str()).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        );
        Ok(waves)
    }

    /// Operator-facing HTTP surfaces on the host.
    pub fn endpoints(&self, config: &StackConfig) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();
        if let Some(chat) = self.service_for(ServiceRole::Chat) {
            endpoints.push(Endpoint {
                name: "chat".into(),
                service: chat.name.clone(),
                role: ServiceRole::Chat,
                url: format!(
                    "http://localhost:{}{}",
                    config.chat.port, config.chat.health_path
                ),
            });
        }
        if let Some(store) = self.service_for(ServiceRole::ObjectStore) {
            endpoints.push(Endpoint {
                name: "object-store console".into(),
                service: store.name.clone(),
                role: ServiceRole::ObjectStore,
                url: config.object_store_console_url(),
            });
        }
        if let Some(idp) = self.service_for(ServiceRole::Identity) {
            endpoints.push(Endpoint {
                name: "identity console".into(),
                service: idp.name.clone(),
                role: ServiceRole::Identity,
                url: config.identity_console_url(),
            });
        }
        endpoints
    }

    /// Convert to the orchestration tool's service definition.
    pub fn to_compose(&self) -> ComposeFile {
        ComposeFile::from_topology(self)
    }

    /// Validate and render the service definition as YAML.
    pub fn render_compose(&self) -> CsResult<String> {
        self.validate()?;
        self.to_compose().to_yaml()
    }
}
