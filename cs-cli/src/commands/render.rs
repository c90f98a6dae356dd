//! Render command - emit the generated service definition.

use std::path::PathBuf;

use console::style;

use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;
use crate::OutputFormat;

/// Run the render command.
pub async fn run(config: ConfigHandle, output: Option<PathBuf>, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;
    let yaml = lifecycle.render()?;

    match output {
        Some(path) => {
            std::fs::write(&path, &yaml)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "written": path.display().to_string() }));
                }
                OutputFormat::Text => {
                    println!("  {} Wrote {}", style("OK").green().bold(), path.display());
                }
            }
        }
        None => match format {
            OutputFormat::Json => {
                let topology = lifecycle.topology();
                println!("{}", serde_json::to_string_pretty(&topology.to_compose())?);
            }
            OutputFormat::Text => print!("{yaml}"),
        },
    }
    Ok(())
}
