//! Init command - write the first-run environment file.

use std::path::PathBuf;

use console::style;

use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;
use cs_services::setup;
use crate::OutputFormat;

/// Run the init command. `config_file` is set when the configuration
/// should be written out too.
pub async fn run(
    config: ConfigHandle,
    force: bool,
    config_file: Option<PathBuf>,
    format: OutputFormat,
) -> CsResult<()> {
    let cfg = config.snapshot().await;
    let path = setup::init_env_file(&cfg, force)?;
    let config_written = match &config_file {
        Some(file) => setup::init_config_file(&cfg, file, force)?,
        None => false,
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "env_file": path.display().to_string(),
                    "config_file": config_file.as_ref().map(|p| p.display().to_string()),
                    "config_written": config_written,
                })
            );
        }
        OutputFormat::Text => {
            println!("  {} Wrote {}", style("OK").green().bold(), path.display());
            println!("  A random database password was generated. Keep this file private.");
            if let Some(file) = &config_file {
                if config_written {
                    println!("  {} Wrote {}", style("OK").green().bold(), file.display());
                } else {
                    println!("  Kept existing {} (use --force to overwrite).", file.display());
                }
            }
            println!();
            println!("  Next: {}", style("chatstack up").cyan());
        }
    }
    Ok(())
}
