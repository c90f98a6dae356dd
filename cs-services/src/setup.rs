//! First-run setup: the environment file, the public upload bucket and the
//! identity-provider application credentials.
//!
//! The identity application itself is registered by a human in the
//! provider's web console; this module only tells them what to enter and
//! writes the resulting id/secret back into the environment file.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use cs_core::config::StackConfig;
use cs_core::constants::{self, env_keys};
use cs_core::error::{CsResult, StackError};
use cs_models::EnvFile;

use crate::orchestrator::shell_quote;

lazy_static! {
    // S3 bucket naming: 3-63 chars, lowercase alphanumerics, dots and hyphens.
    static ref BUCKET_PATTERN: Regex = Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").unwrap();
}

/// Alias the one-shot client registers for the object store.
const MC_ALIAS: &str = "stack";

/// Random alphanumeric secret.
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Write the first-run environment file.
///
/// Refuses to replace an existing file unless `force` is set, since it may
/// hold the only copy of the identity-provider secret.
pub fn init_env_file(config: &StackConfig, force: bool) -> CsResult<PathBuf> {
    let path = config.env_path()?;
    if path.exists() && !force {
        return Err(StackError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let password = generate_password(constants::GENERATED_PASSWORD_LEN);
    EnvFile::template(config, &password).save(&path)?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Write `config` to `path` so the operator can edit it.
///
/// An existing file is left alone unless `force` is set; returns whether
/// the file was written.
pub fn init_config_file(config: &StackConfig, path: &Path, force: bool) -> CsResult<bool> {
    if path.exists() && !force {
        info!("keeping existing {}", path.display());
        return Ok(false);
    }
    config.save_to_file(path)?;
    info!("wrote {}", path.display());
    Ok(true)
}

/// Check a bucket name against S3 naming rules.
pub fn validate_bucket_name(bucket: &str) -> CsResult<()> {
    if BUCKET_PATTERN.is_match(bucket) && !bucket.contains("..") {
        Ok(())
    } else {
        Err(StackError::Config(format!(
            "invalid bucket name '{bucket}': use 3-63 lowercase letters, digits, dots or hyphens"
        )))
    }
}

/// Object-store admin credentials from the environment file, falling back
/// to the image's shipped login.
pub fn object_store_credentials(env: &EnvFile) -> (String, String) {
    let user = env
        .get(env_keys::MINIO_ROOT_USER)
        .filter(|v| !v.is_empty())
        .unwrap_or(constants::DEFAULT_OBJECT_STORE_USER);
    let password = env
        .get(env_keys::MINIO_ROOT_PASSWORD)
        .filter(|v| !v.is_empty())
        .unwrap_or(constants::DEFAULT_OBJECT_STORE_PASSWORD);
    (user.to_string(), password.to_string())
}

/// Shell script run inside the one-shot client container: register the
/// alias, create the bucket if missing, then make it public.
pub fn bucket_script(endpoint: &str, user: &str, password: &str, bucket: &str) -> String {
    let target = format!("{MC_ALIAS}/{bucket}");
    format!(
        "mc alias set {alias} {endpoint} {user} {password} && \
         mc mb --ignore-existing {target} && \
         mc anonymous set public {target}",
        alias = MC_ALIAS,
        endpoint = shell_quote(endpoint),
        user = shell_quote(user),
        password = shell_quote(password),
        target = shell_quote(&target),
    )
}

/// Write identity-provider application credentials into the environment file.
pub fn write_identity_credentials(
    env_path: &Path,
    client_id: &str,
    client_secret: &str,
) -> CsResult<()> {
    let client_id = client_id.trim();
    let client_secret = client_secret.trim();
    if client_id.is_empty() || client_secret.is_empty() {
        return Err(StackError::MissingConfig(
            "both the application id and secret are required".into(),
        ));
    }

    let mut env = EnvFile::load_or_default(env_path)?;
    env.set(env_keys::IDP_CLIENT_ID, client_id)?;
    env.set(env_keys::IDP_CLIENT_SECRET, client_secret)?;
    env.save(env_path)?;
    info!("stored identity application credentials in {}", env_path.display());
    Ok(())
}

/// What to enter in the identity console when registering the application.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityRegistration {
    pub console_url: String,
    pub organization: String,
    pub application_name: String,
    /// Framework template to pick when creating the application.
    pub template: String,
    /// The single redirect URI to allow.
    pub redirect_uri: String,
}

impl IdentityRegistration {
    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            console_url: config.identity_console_url(),
            organization: config.setup.organization.clone(),
            application_name: config.setup.application_name.clone(),
            template: "Web application (OAuth 2.0 / OIDC)".to_string(),
            redirect_uri: config.redirect_uri(),
        }
    }
}

/// One line of the first-run checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub label: String,
    /// `None` when the step cannot be checked from here.
    pub done: Option<bool>,
    pub hint: String,
}

/// First-run progress derived from the files on disk.
#[derive(Debug, Clone, Serialize)]
pub struct SetupChecklist {
    pub items: Vec<ChecklistItem>,
}

impl SetupChecklist {
    /// Build the checklist. `env` is `None` when the environment file is missing.
    pub fn evaluate(config: &StackConfig, env: Option<&EnvFile>) -> Self {
        let mut items = vec![ChecklistItem {
            label: "environment file".into(),
            done: Some(env.is_some()),
            hint: "chatstack init".into(),
        }];

        let db_password_set = env.is_some_and(|e| e.is_set(env_keys::POSTGRES_PASSWORD));
        items.push(ChecklistItem {
            label: "database password".into(),
            done: Some(db_password_set),
            hint: format!("set {} in the environment file", env_keys::POSTGRES_PASSWORD),
        });

        let bucket_matches = env
            .and_then(|e| e.get(env_keys::STORAGE_BUCKET))
            .is_some_and(|b| b == config.setup.bucket);
        items.push(ChecklistItem {
            label: format!("bucket '{}' referenced by the chat app", config.setup.bucket),
            done: Some(bucket_matches),
            hint: format!("set {}={}", env_keys::STORAGE_BUCKET, config.setup.bucket),
        });

        items.push(ChecklistItem {
            label: "bucket created and public".into(),
            done: None,
            hint: "chatstack setup bucket (after chatstack up)".into(),
        });

        let credentials_set = env.is_some_and(|e| {
            env_keys::IDENTITY_CREDENTIALS.iter().all(|k| e.is_set(k))
        });
        items.push(ChecklistItem {
            label: "identity application credentials".into(),
            done: Some(credentials_set),
            hint: "chatstack setup identity".into(),
        });

        Self { items }
    }

    /// Every checkable step is done.
    pub fn complete(&self) -> bool {
        self.items.iter().all(|i| i.done != Some(false))
    }
}
