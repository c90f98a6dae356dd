//! Platform-specific directory lookup.

use std::path::PathBuf;

use crate::constants::APP_DIR_NAME;
use crate::error::{CsResult, StackError};

/// Namespace for per-user directories used by the CLI.
#[derive(Debug, Clone, Copy)]
pub struct Platform;

impl Platform {
    /// Per-user data directory (logs live here).
    ///
    /// - Linux: `~/.local/share/chatstack`
    /// - macOS: `~/Library/Application Support/chatstack`
    /// - Windows: `%APPDATA%/chatstack`
    pub fn data_dir() -> CsResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| StackError::Config("could not determine data directory".into()))?;
        Ok(base.join(APP_DIR_NAME))
    }

    /// Per-user configuration directory (holds `config.toml`).
    ///
    /// - Linux: `~/.config/chatstack`
    pub fn config_dir() -> CsResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| StackError::Config("could not determine config directory".into()))?;
        Ok(base.join(APP_DIR_NAME))
    }

    /// Default log directory inside the data directory.
    pub fn log_dir() -> CsResult<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }
}
