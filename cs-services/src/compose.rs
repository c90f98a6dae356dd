//! Compose command construction for one configured project.

use std::path::PathBuf;

use cs_core::config::StackConfig;
use cs_core::error::CsResult;

use crate::orchestrator::Invocation;

/// Builds the tool invocations for a project.
///
/// Every compose command pins the project name and the definition file so
/// the CLI behaves the same regardless of the directory it is run from.
#[derive(Debug, Clone)]
pub struct ComposeCommand {
    program: String,
    project: String,
    project_dir: PathBuf,
    compose_file: PathBuf,
    /// Passed with `--env-file` for `${VAR}` interpolation, when it exists.
    env_file: Option<PathBuf>,
}

impl ComposeCommand {
    /// Resolve paths for `config`.
    pub fn new(config: &StackConfig) -> CsResult<Self> {
        let env_path = config.env_path()?;
        Ok(Self {
            program: config.orchestrator.program.clone(),
            project: config.project.name.clone(),
            project_dir: config.project_dir()?,
            compose_file: config.compose_path()?,
            env_file: env_path.exists().then_some(env_path),
        })
    }

    fn base(&self) -> Invocation {
        let mut inv = Invocation::new(&self.program)
            .args(["compose", "-p", self.project.as_str()])
            .arg("-f")
            .arg(self.compose_file.display().to_string());
        if let Some(env) = &self.env_file {
            inv = inv.arg("--env-file").arg(env.display().to_string());
        }
        inv.current_dir(&self.project_dir)
    }

    /// Start everything detached; named volumes are created when absent.
    pub fn up(&self) -> Invocation {
        self.base().args(["up", "-d"])
    }

    /// Stop and remove containers. Volumes are left in place.
    pub fn down(&self) -> Invocation {
        self.base().arg("down")
    }

    /// Stop and remove containers and delete the named volumes.
    pub fn down_with_volumes(&self) -> Invocation {
        self.base().args(["down", "--volumes"])
    }

    /// Container list as JSON.
    pub fn ps_json(&self) -> Invocation {
        self.base().args(["ps", "--all", "--format", "json"])
    }

    /// Container logs, optionally for one service.
    pub fn logs(&self, service: Option<&str>, follow: bool, tail: Option<u32>) -> Invocation {
        let mut inv = self.base().arg("logs");
        if follow {
            inv = inv.arg("--follow");
        }
        if let Some(n) = tail {
            inv = inv.arg("--tail").arg(n.to_string());
        }
        if let Some(svc) = service {
            inv = inv.arg(svc);
        }
        inv
    }

    /// Look up a named volume. Exits non-zero when it does not exist.
    pub fn volume_inspect(&self, qualified_name: &str) -> Invocation {
        Invocation::new(&self.program).args(["volume", "inspect", "--format", "{{.Name}}", qualified_name])
    }

    /// Run a disposable container on the project network.
    pub fn run_oneshot(
        &self,
        image: &str,
        network: &str,
        entrypoint: &str,
        args: &[String],
    ) -> Invocation {
        Invocation::new(&self.program)
            .args(["run", "--rm", "--network", network, "--entrypoint", entrypoint, image])
            .args(args.iter().cloned())
            .current_dir(&self.project_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(dir: &std::path::Path) -> ComposeCommand {
        let mut config = StackConfig::default();
        config.project.directory = dir.display().to_string();
        ComposeCommand::new(&config).unwrap()
    }

    #[test]
    fn test_up_and_down_arguments() {
        let dir = tempfile::TempDir::new().unwrap();
        let cmd = command(dir.path());
        let compose = dir.path().join("docker-compose.yml").display().to_string();

        let up = cmd.up();
        assert_eq!(up.program, "docker");
        assert_eq!(
            up.args,
            vec!["compose", "-p", "chatstack", "-f", compose.as_str(), "up", "-d"]
        );
        assert_eq!(up.cwd.as_deref(), Some(dir.path()));

        let down = cmd.down();
        assert_eq!(down.args.last().map(String::as_str), Some("down"));
        assert!(!down.has_arg("--volumes"));
        assert!(!down.has_arg("-v"));

        assert!(cmd.down_with_volumes().has_arg("--volumes"));
    }

    #[test]
    fn test_env_file_flag_only_when_present() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(!command(dir.path()).up().has_arg("--env-file"));

        std::fs::write(dir.path().join(".env"), "A=1\n").unwrap();
        let up = command(dir.path()).up();
        assert!(up.has_arg("--env-file"));
    }

    #[test]
    fn test_logs_arguments() {
        let dir = tempfile::TempDir::new().unwrap();
        let logs = command(dir.path()).logs(Some("chat"), true, Some(50));
        let tail: Vec<_> = logs.args.iter().rev().take(5).rev().cloned().collect();
        assert_eq!(tail, vec!["logs", "--follow", "--tail", "50", "chat"]);
    }

    #[test]
    fn test_oneshot_arguments() {
        let dir = tempfile::TempDir::new().unwrap();
        let inv = command(dir.path()).run_oneshot(
            "minio/mc:latest",
            "chatstack_default",
            "/bin/sh",
            &["-c".to_string(), "mc ls".to_string()],
        );
        assert_eq!(
            inv.args,
            vec![
                "run", "--rm", "--network", "chatstack_default", "--entrypoint", "/bin/sh",
                "minio/mc:latest", "-c", "mc ls"
            ]
        );
    }
}
