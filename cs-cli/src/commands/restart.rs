//! Restart command - down then up, so services pick up environment changes.

use console::style;

use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;
use crate::OutputFormat;

/// Run the restart command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;
    let text = matches!(format, OutputFormat::Text);

    if text {
        println!("{} Restarting...", style("[1/1]").bold().dim());
    }
    lifecycle.restart().await?;

    match format {
        OutputFormat::Json => super::print_json_ok("restart"),
        OutputFormat::Text => println!("  {} Stack restarted.", style("OK").green().bold()),
    }
    Ok(())
}
