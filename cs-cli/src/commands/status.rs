//! Status command - containers, data volumes and endpoint reachability.

use comfy_table::{Table, presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, ContentArrangement};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use cs_api::BackoffConfig;
use cs_core::config::ConfigHandle;
use cs_core::error::CsResult;
use cs_models::ServiceRole;
use cs_services::StackStatus;
use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, wait: bool, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;
    let probe = super::create_probe_client(&config).await?;

    if wait {
        let cfg = lifecycle.config();
        let chat_url = lifecycle
            .topology()
            .endpoints(cfg)
            .into_iter()
            .find(|e| e.role == ServiceRole::Chat)
            .map(|e| e.url)
            .unwrap_or_else(|| cfg.chat_public_url());
        let backoff = BackoffConfig::from(&cfg.probe);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message(format!("Waiting for {chat_url}"));

        let waited = probe
            .wait_until_ready(&chat_url, &backoff, |attempt, outcome| {
                pb.set_message(format!(
                    "Waiting for {chat_url} (attempt {attempt}: {})",
                    outcome.summary()
                ));
            })
            .await;
        pb.finish_and_clear();

        match waited {
            Ok(outcome) => {
                if matches!(format, OutputFormat::Text) {
                    println!(
                        "  {} Chat app is answering ({}).",
                        style("OK").green().bold(),
                        outcome.summary()
                    );
                    println!();
                }
            }
            Err(e) => {
                if matches!(format, OutputFormat::Text) {
                    println!("  {} {e}", style("FAIL").red().bold());
                }
                return Err(e);
            }
        }
    }

    let status = lifecycle.status(&probe).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => print_text(&status),
    }
    Ok(())
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_text(status: &StackStatus) {
    println!(
        "{} {}",
        style("Services").bold().underlined(),
        style(format!("(project {})", status.project)).dim()
    );
    let mut table = new_table();
    table.set_header(vec!["Service", "State", "Health", "Status"]);
    for c in &status.containers {
        let state = if c.is_running() {
            style(&c.state).green().to_string()
        } else {
            style(&c.state).red().to_string()
        };
        let health = match c.health.as_str() {
            "" => "-".to_string(),
            "healthy" => style(&c.health).green().to_string(),
            other => style(other).yellow().to_string(),
        };
        table.add_row(vec![c.service.clone(), state, health, c.status.clone()]);
    }
    for name in &status.missing_services {
        table.add_row(vec![
            name.clone(),
            style("missing").red().to_string(),
            "-".to_string(),
            "no container".to_string(),
        ]);
    }
    println!("{table}");

    println!();
    println!("{}", style("Data volumes").bold().underlined());
    let mut table = new_table();
    table.set_header(vec!["Volume", "Owner", "Exists"]);
    for v in &status.volumes {
        let exists = if v.exists {
            style("yes").green().to_string()
        } else {
            style("no").yellow().to_string()
        };
        table.add_row(vec![v.qualified_name.clone(), v.owner.clone(), exists]);
    }
    println!("{table}");

    println!();
    println!("{}", style("Endpoints").bold().underlined());
    for report in &status.endpoints {
        let marker = if report.outcome.is_ready() {
            style("OK").green().bold()
        } else {
            style("FAIL").red().bold()
        };
        println!(
            "  {marker} {:<22} {}  {}",
            report.endpoint.name,
            report.endpoint.url,
            style(report.outcome.summary()).dim()
        );
    }

    if !status.all_running() {
        println!();
        println!("  Start the stack with {}.", style("chatstack up").cyan());
    }
}
