//! Up command - start every service.

use console::style;

use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;
use crate::OutputFormat;

/// Run the up command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;

    if matches!(format, OutputFormat::Text) {
        println!(
            "{} Starting project {}...",
            style("[1/1]").bold().dim(),
            style(&lifecycle.config().project.name).cyan()
        );
    }

    lifecycle.up().await?;

    match format {
        OutputFormat::Json => super::print_json_ok("up"),
        OutputFormat::Text => {
            println!("  {} Stack started.", style("OK").green().bold());
            println!();
            super::print_endpoints(lifecycle.config());
            println!();
            println!(
                "  Run {} to wait for the chat app to answer.",
                style("chatstack status --wait").cyan()
            );
        }
    }
    Ok(())
}
