//! Logs command - container log output from the orchestration tool.

use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;

/// Run the logs command. Output is the tool's own, so there is no JSON form.
pub async fn run(
    config: ConfigHandle,
    service: Option<String>,
    follow: bool,
    tail: Option<u32>,
) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;
    lifecycle.logs(service.as_deref(), follow, tail).await
}
