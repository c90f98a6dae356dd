//! Purge command - stop everything and delete the data volumes.

use console::style;
use dialoguer::Confirm;

use cs_core::config::ConfigHandle;
use cs_core::error::{CsResult, StackError};
use crate::OutputFormat;

/// Run the purge command.
pub async fn run(config: ConfigHandle, yes: bool, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;

    if !yes {
        println!(
            "  {} This permanently deletes the stack's data:",
            style("WARNING").red().bold()
        );
        for volume in &lifecycle.topology().volumes {
            println!(
                "    {} ({})",
                lifecycle.config().qualified_volume_name(&volume.name),
                volume.holds
            );
        }

        let confirmed = Confirm::new()
            .with_prompt("  Delete these volumes?")
            .default(false)
            .interact()
            .map_err(|e| StackError::Internal(e.to_string()))?;

        if !confirmed {
            println!("  Purge cancelled.");
            return Ok(());
        }
    }

    lifecycle.purge().await?;

    match format {
        OutputFormat::Json => super::print_json_ok("purge"),
        OutputFormat::Text => {
            println!("  {} Stack removed and data volumes deleted.", style("OK").green().bold());
        }
    }
    Ok(())
}
