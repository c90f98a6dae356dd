//! Setup commands - first-run bucket and identity-provider configuration.

use clap::Subcommand;
use console::style;
use dialoguer::{Input, Password};

use cs_core::config::{ConfigHandle, StackConfig};
use cs_core::error::{CsResult, StackError};
use cs_models::EnvFile;
use cs_services::setup::write_identity_credentials;
use cs_services::{IdentityRegistration, SetupChecklist};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum SetupAction {
    /// Create the upload bucket and make it publicly readable (stack must be up).
    Bucket {
        /// Bucket name (overrides config).
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// Register the chat app with the identity provider and store its credentials.
    Identity {
        /// Application client id from the identity console.
        #[arg(long)]
        client_id: Option<String>,
        /// Application client secret from the identity console.
        #[arg(long)]
        client_secret: Option<String>,
        /// Do not restart the stack after saving.
        #[arg(long)]
        no_restart: bool,
    },
    /// Print the first-run runbook and what is still missing.
    Guide,
}

/// Run a setup subcommand.
pub async fn run(config: ConfigHandle, action: SetupAction, format: OutputFormat) -> CsResult<()> {
    match action {
        SetupAction::Bucket { bucket } => run_bucket(config, bucket, format).await,
        SetupAction::Identity { client_id, client_secret, no_restart } => {
            run_identity(config, client_id, client_secret, no_restart, format).await
        }
        SetupAction::Guide => run_guide(config, format).await,
    }
}

async fn run_bucket(config: ConfigHandle, bucket: Option<String>, format: OutputFormat) -> CsResult<()> {
    let lifecycle = super::create_lifecycle(&config).await;
    let bucket = bucket.unwrap_or_else(|| lifecycle.config().setup.bucket.clone());

    if matches!(format, OutputFormat::Text) {
        println!(
            "{} Creating public bucket {}...",
            style("[1/1]").bold().dim(),
            style(&bucket).cyan()
        );
    }

    lifecycle.setup_bucket(&bucket).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "bucket": bucket, "ok": true })),
        OutputFormat::Text => {
            println!("  {} Bucket {bucket} is ready for uploads.", style("OK").green().bold());
            if bucket != lifecycle.config().setup.bucket {
                println!(
                    "  Point the chat app at it: set STORAGE_BUCKET={bucket} in the environment file, then {}.",
                    style("chatstack restart").cyan()
                );
            }
        }
    }
    Ok(())
}

fn print_registration(reg: &IdentityRegistration) {
    println!("{}", style("Register the chat app in the identity console").bold().underlined());
    println!("  1. Open {} and sign in as the administrator.", style(&reg.console_url).cyan());
    println!("  2. Create an application in organization '{}':", reg.organization);
    println!("       Name:         {}", reg.application_name);
    println!("       Template:     {}", reg.template);
    println!("       Redirect URI: {}", style(&reg.redirect_uri).cyan());
    println!("  3. Copy the generated client id and client secret.");
    println!();
}

fn prompt_or(value: Option<String>, prompt: &str, secret: bool) -> CsResult<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    let entered = if secret {
        Password::new().with_prompt(prompt).interact()
    } else {
        Input::<String>::new().with_prompt(prompt).interact_text()
    };
    entered.map_err(|e| StackError::Internal(e.to_string()))
}

async fn run_identity(
    config: ConfigHandle,
    client_id: Option<String>,
    client_secret: Option<String>,
    no_restart: bool,
    format: OutputFormat,
) -> CsResult<()> {
    let cfg = config.snapshot().await;
    let reg = IdentityRegistration::from_config(&cfg);
    let text = matches!(format, OutputFormat::Text);

    if text {
        print_registration(&reg);
    } else if client_id.is_none() || client_secret.is_none() {
        // Nothing to prompt in JSON mode: just describe the registration.
        println!("{}", serde_json::to_string_pretty(&reg)?);
        return Ok(());
    }

    let client_id = prompt_or(client_id, "Client ID", false)?;
    let client_secret = prompt_or(client_secret, "Client secret", true)?;

    let env_path = cfg.env_path()?;
    write_identity_credentials(&env_path, &client_id, &client_secret)?;
    if text {
        println!("  {} Saved credentials to {}", style("OK").green().bold(), env_path.display());
    }

    let restarted = if no_restart {
        if text {
            println!("  Restart with {} to apply them.", style("chatstack restart").cyan());
        }
        false
    } else {
        if text {
            println!("{} Restarting the stack...", style("[1/1]").bold().dim());
        }
        let lifecycle = super::create_lifecycle(&config).await;
        lifecycle.restart().await?;
        if text {
            println!("  {} Stack restarted. Sign-in should now work.", style("OK").green().bold());
        }
        true
    };

    if !text {
        println!(
            "{}",
            serde_json::json!({
                "env_file": env_path.display().to_string(),
                "redirect_uri": reg.redirect_uri,
                "restarted": restarted,
            })
        );
    }
    Ok(())
}

fn load_env(cfg: &StackConfig) -> CsResult<Option<EnvFile>> {
    let path = cfg.env_path()?;
    if path.exists() {
        Ok(Some(EnvFile::load(&path)?))
    } else {
        Ok(None)
    }
}

async fn run_guide(config: ConfigHandle, format: OutputFormat) -> CsResult<()> {
    let cfg = config.snapshot().await;
    let env = load_env(&cfg)?;
    let checklist = SetupChecklist::evaluate(&cfg, env.as_ref());
    let reg = IdentityRegistration::from_config(&cfg);

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "complete": checklist.complete(),
                    "checklist": checklist.items,
                    "identity": reg,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", style("First run").bold().underlined());
            println!("  1. {}   write the environment file", style("chatstack init").cyan());
            println!("  2. {}     start all four services", style("chatstack up").cyan());
            println!("  3. {}  create the public upload bucket", style("chatstack setup bucket").cyan());
            println!("  4. {} register the app and restart", style("chatstack setup identity").cyan());
            println!();
            print_registration(&reg);

            println!("{}", style("Checklist").bold().underlined());
            for item in &checklist.items {
                let marker = match item.done {
                    Some(true) => style("[x]").green().bold(),
                    Some(false) => style("[ ]").red().bold(),
                    None => style("[?]").yellow().bold(),
                };
                println!("  {marker} {}", item.label);
                if item.done != Some(true) {
                    println!("      {}", style(&item.hint).dim());
                }
            }
            println!();
            super::print_endpoints(&cfg);
        }
    }
    Ok(())
}
