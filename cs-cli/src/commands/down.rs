//! Down command - stop every service, keeping data.

use console::style;

use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;
use crate::OutputFormat;

/// Run the down command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;
    lifecycle.down().await?;

    match format {
        OutputFormat::Json => super::print_json_ok("down"),
        OutputFormat::Text => {
            println!("  {} Stack stopped. Data volumes were kept.", style("OK").green().bold());
        }
    }
    Ok(())
}
