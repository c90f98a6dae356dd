//! The seam between chatstack and the container orchestration tool.
//!
//! All container work is delegated to an external CLI. `run` inherits the
//! terminal so the tool's own output and errors reach the operator
//! verbatim; `capture` collects output for commands whose result we parse.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info};

use cs_core::error::{CsResult, StackError};

/// One invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the current one when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Whether `flag` appears among the arguments.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Printable command line, quoting arguments that need it.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output of a captured invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs orchestration tool commands.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Run with inherited stdio and return the exit code.
    async fn run(&self, invocation: &Invocation) -> CsResult<i32>;

    /// Run with captured stdout/stderr.
    async fn capture(&self, invocation: &Invocation) -> CsResult<CapturedOutput>;
}

/// Turn a non-zero exit code into `StackError::ToolExited`.
pub fn ensure_success(invocation: &Invocation, code: i32) -> CsResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(StackError::ToolExited {
            command: invocation.command_line(),
            code,
        })
    }
}

/// Spawns real processes through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessOrchestrator;

impl ProcessOrchestrator {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(invocation: &Invocation, e: std::io::Error) -> StackError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StackError::ToolNotFound(format!(
                "'{}' is not installed or not on PATH",
                invocation.program
            ))
        } else {
            StackError::Io(e)
        }
    }
}

#[async_trait]
impl Orchestrator for ProcessOrchestrator {
    async fn run(&self, invocation: &Invocation) -> CsResult<i32> {
        info!("running: {}", invocation.command_line());
        let status = Self::command(invocation)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(invocation, e))?;

        // Killed by a signal: report a generic failure.
        let code = status.code().unwrap_or(1);
        debug!("{} exited with {code}", invocation.program);
        Ok(code)
    }

    async fn capture(&self, invocation: &Invocation) -> CsResult<CapturedOutput> {
        debug!("capturing: {}", invocation.command_line());
        let output = Self::command(invocation)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(invocation, e))?;

        Ok(CapturedOutput {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Quote `arg` for a POSIX shell if it contains anything beyond a safe set.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_when_needed() {
        let inv = Invocation::new("docker")
            .args(["compose", "-f", "/srv/my stack/compose.yml", "up"])
            .arg("-d");
        assert_eq!(
            inv.command_line(),
            "docker compose -f '/srv/my stack/compose.yml' up -d"
        );
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain-arg"), "plain-arg");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a&&b"), "'a&&b'");
    }

    #[test]
    fn test_ensure_success() {
        let inv = Invocation::new("docker").arg("ps");
        assert!(ensure_success(&inv, 0).is_ok());
        match ensure_success(&inv, 125) {
            Err(StackError::ToolExited { command, code }) => {
                assert_eq!(command, "docker ps");
                assert_eq!(code, 125);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let inv = Invocation::new("chatstack-definitely-not-a-real-binary");
        let err = ProcessOrchestrator::new().run(&inv).await.unwrap_err();
        assert!(matches!(err, StackError::ToolNotFound(_)), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let inv = Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let out = ProcessOrchestrator::new().capture(&inv).await.unwrap();
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.success());
    }
}
