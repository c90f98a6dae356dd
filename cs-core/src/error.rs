//! Global error types for chatstack.
//!
//! Every failure the CLI can report is a `StackError`. Failures of the
//! orchestration tool itself are carried as `ToolExited` so the CLI can
//! hand the tool's own exit code back to the shell.

use thiserror::Error;

/// Convenience type alias for Results using StackError.
pub type CsResult<T> = Result<T, StackError>;

/// Unified error type covering all error categories in chatstack.
#[derive(Error, Debug)]
pub enum StackError {
    // -- Configuration errors --
    /// Failed to load or parse configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value or file is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Topology errors --
    /// The service definition is inconsistent (cycles, unknown deps, shared volumes).
    #[error("invalid topology: {0}")]
    Topology(String),

    // -- Environment file errors --
    /// The environment file could not be parsed or contains an invalid key.
    #[error("environment file error: {0}")]
    EnvFile(String),

    // -- Orchestration errors --
    /// The orchestration tool binary could not be started.
    #[error("orchestration tool not found: {0}")]
    ToolNotFound(String),

    /// The orchestration tool ran and exited unsuccessfully.
    #[error("`{command}` exited with status {code}")]
    ToolExited {
        /// The command line that was run.
        command: String,
        /// Exit code reported by the tool.
        code: i32,
    },

    // -- Network errors --
    /// HTTP probe failed.
    #[error("http error: {0}")]
    Http(String),

    /// An endpoint did not become ready before the deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackError {
    /// Process exit code to report for this error.
    ///
    /// Tool failures surface the tool's own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            StackError::ToolExited { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(e: serde_json::Error) -> Self {
        StackError::Serialization(e.to_string())
    }
}

impl From<serde_yaml_ng::Error> for StackError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        StackError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for StackError {
    fn from(e: toml::de::Error) -> Self {
        StackError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_exit_code_is_inherited() {
        let err = StackError::ToolExited {
            command: "docker compose up -d".into(),
            code: 17,
        };
        assert_eq!(err.exit_code(), 17);
        assert_eq!(err.to_string(), "`docker compose up -d` exited with status 17");
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        assert_eq!(StackError::Config("x".into()).exit_code(), 1);
        assert_eq!(
            StackError::ToolExited { command: "x".into(), code: 0 }.exit_code(),
            1
        );
    }

    #[test]
    fn test_display() {
        let err = StackError::Topology("cycle".to_string());
        assert_eq!(err.to_string(), "invalid topology: cycle");
    }
}
