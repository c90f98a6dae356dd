//! Stack lifecycle: start, stop, restart, purge, logs and status.
//!
//! Every operation is a thin wrapper over one or two orchestration tool
//! invocations. A non-zero exit from the tool becomes
//! `StackError::ToolExited`, which carries the code back to `main`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use cs_api::ProbeClient;
use cs_core::config::StackConfig;
use cs_core::constants::env_keys;
use cs_core::error::{CsResult, StackError};
use cs_models::{EnvFile, Topology, VolumeUsage};

use crate::compose::ComposeCommand;
use crate::orchestrator::{ensure_success, Invocation, Orchestrator};
use crate::setup;
use crate::status::{parse_ps_output, StackStatus, VolumeStatus};

/// Drives the orchestration tool for one configured project.
pub struct StackLifecycle {
    config: StackConfig,
    orchestrator: Arc<dyn Orchestrator>,
}

impl StackLifecycle {
    pub fn new(config: StackConfig, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { config, orchestrator }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn topology(&self) -> Topology {
        Topology::from_config(&self.config)
    }

    /// Rendered service definition, validated.
    pub fn render(&self) -> CsResult<String> {
        self.topology().render_compose()
    }

    /// Write the service definition when rendering is enabled, otherwise
    /// check the operator's own file for volume mistakes.
    fn prepare_compose_file(&self) -> CsResult<()> {
        let path = self.config.compose_path()?;
        if self.config.orchestrator.render_compose {
            let yaml = self.render()?;
            std::fs::write(&path, yaml)?;
            debug!("rendered {}", path.display());
            return Ok(());
        }

        let yaml = std::fs::read_to_string(&path).map_err(|e| {
            StackError::MissingConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        // Syntax errors are the tool's to report.
        match VolumeUsage::from_yaml(&yaml) {
            Ok(usage) => {
                for problem in usage.problems() {
                    warn!("{}: {problem}", path.display());
                }
            }
            Err(e) => warn!("skipping volume check of {}: {e}", path.display()),
        }
        Ok(())
    }

    async fn run(&self, invocation: Invocation) -> CsResult<()> {
        let code = self.orchestrator.run(&invocation).await?;
        ensure_success(&invocation, code)
    }

    /// Start every service. Named volumes are created when absent and
    /// reattached otherwise.
    pub async fn up(&self) -> CsResult<()> {
        let env_path = self.config.env_path()?;
        if !env_path.exists() {
            return Err(StackError::MissingConfig(format!(
                "{} not found; run `chatstack init` first",
                env_path.display()
            )));
        }

        let env = EnvFile::load(&env_path)?;
        let missing: Vec<&str> = env_keys::IDENTITY_CREDENTIALS
            .iter()
            .copied()
            .filter(|k| !env.is_set(k))
            .collect();
        if !missing.is_empty() {
            warn!(
                "{} not set; sign-in will fail until `chatstack setup identity` is done",
                missing.join(", ")
            );
        }

        self.prepare_compose_file()?;
        info!("starting project {}", self.config.project.name);
        self.run(ComposeCommand::new(&self.config)?.up()).await
    }

    /// Stop and remove containers. Volumes are kept.
    pub async fn down(&self) -> CsResult<()> {
        if self.config.orchestrator.render_compose {
            self.prepare_compose_file()?;
        }
        info!("stopping project {}", self.config.project.name);
        self.run(ComposeCommand::new(&self.config)?.down()).await
    }

    /// `down` then `up`; a failing `down` skips the `up`.
    pub async fn restart(&self) -> CsResult<()> {
        self.down().await?;
        self.up().await
    }

    /// Stop everything and delete the named volumes.
    pub async fn purge(&self) -> CsResult<()> {
        if self.config.orchestrator.render_compose {
            self.prepare_compose_file()?;
        }
        for volume in &self.topology().volumes {
            warn!(
                "deleting volume {} ({})",
                self.config.qualified_volume_name(&volume.name),
                volume.holds
            );
        }
        self.run(ComposeCommand::new(&self.config)?.down_with_volumes())
            .await
    }

    pub async fn logs(&self, service: Option<&str>, follow: bool, tail: Option<u32>) -> CsResult<()> {
        if let Some(name) = service {
            if self.topology().service(name).is_none() {
                return Err(StackError::Config(format!("unknown service '{name}'")));
            }
        }
        self.run(ComposeCommand::new(&self.config)?.logs(service, follow, tail))
            .await
    }

    /// Containers, volumes and endpoint probes.
    pub async fn status(&self, probe: &ProbeClient) -> CsResult<StackStatus> {
        let compose = ComposeCommand::new(&self.config)?;
        let topology = self.topology();

        let ps = compose.ps_json();
        let output = self.orchestrator.capture(&ps).await?;
        if !output.success() {
            warn!("{}", output.stderr.trim());
        }
        ensure_success(&ps, output.code)?;
        let containers = parse_ps_output(&output.stdout)?;

        let missing_services = topology
            .services
            .iter()
            .filter(|svc| !containers.iter().any(|c| c.service == svc.name))
            .map(|svc| svc.name.clone())
            .collect();

        let mut volumes = Vec::with_capacity(topology.volumes.len());
        for volume in &topology.volumes {
            let qualified_name = self.config.qualified_volume_name(&volume.name);
            let inspected = self
                .orchestrator
                .capture(&compose.volume_inspect(&qualified_name))
                .await?;
            volumes.push(VolumeStatus {
                name: volume.name.clone(),
                qualified_name,
                owner: volume.owner.clone(),
                exists: inspected.success(),
            });
        }

        let endpoints = probe.check_all(&topology.endpoints(&self.config)).await;

        Ok(StackStatus {
            project: self.config.project.name.clone(),
            missing_services,
            containers,
            volumes,
            endpoints,
        })
    }

    /// Create the upload bucket and make it publicly readable.
    ///
    /// Runs a disposable client container on the project network, so the
    /// object store must already be up.
    pub async fn setup_bucket(&self, bucket: &str) -> CsResult<()> {
        setup::validate_bucket_name(bucket)?;

        let env = EnvFile::load_or_default(&self.config.env_path()?)?;
        let (user, password) = setup::object_store_credentials(&env);
        let script = setup::bucket_script(
            &self.config.object_store_internal_url(),
            &user,
            &password,
            bucket,
        );

        let invocation = ComposeCommand::new(&self.config)?.run_oneshot(
            &self.config.setup.mc_image,
            &self.config.network_name(),
            "/bin/sh",
            &["-c".to_string(), script],
        );
        info!("creating public bucket {bucket}");
        self.run(invocation).await
    }
}
