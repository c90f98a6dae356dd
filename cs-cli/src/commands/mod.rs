//! CLI command implementations.

pub mod up;
pub mod down;
pub mod restart;
pub mod status;
pub mod logs;
pub mod purge;
pub mod render;
pub mod init;
pub mod setup;

use std::sync::Arc;

use console::style;

use cs_api::ProbeClient;
use cs_core::config::{ConfigHandle, StackConfig};
use cs_core::error::CsResult;
use cs_services::{ProcessOrchestrator, StackLifecycle};

/// Helper to build the lifecycle driver from config.
pub async fn create_lifecycle(config: &ConfigHandle) -> StackLifecycle {
    StackLifecycle::new(config.snapshot().await, Arc::new(ProcessOrchestrator::new()))
}

/// Helper to create a probe client from config.
pub async fn create_probe_client(config: &ConfigHandle) -> CsResult<ProbeClient> {
    let probe_config = config.read().await.probe.clone();
    ProbeClient::new(&probe_config)
}

/// Print the operator-facing URLs.
pub fn print_endpoints(config: &StackConfig) {
    println!("{}", style("Endpoints").bold().underlined());
    println!("  Chat:                 {}", config.chat_public_url());
    println!("  Object-store console: {}", config.object_store_console_url());
    println!("  Identity console:     {}", config.identity_console_url());
}

/// Print a one-line JSON result for scripting.
pub fn print_json_ok(command: &str) {
    println!("{}", serde_json::json!({ "command": command, "ok": true }));
}
