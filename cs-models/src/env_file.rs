//! The environment file shared by every container of the stack.
//!
//! Edits are line-preserving: comments, blank lines, ordering and the exact
//! spelling of untouched entries survive a load/modify/save cycle, so an
//! operator's hand-written notes are never lost when the CLI writes the
//! identity-provider credentials back into the file.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use cs_core::config::StackConfig;
use cs_core::constants::{self, env_keys};
use cs_core::error::{CsResult, StackError};

lazy_static! {
    static ref KEY_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Entry {
        key: String,
        value: String,
        /// Original text, kept until the entry is modified.
        raw: Option<String>,
    },
    Other(String),
}

/// A parsed environment file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    /// Parse `KEY=VALUE` lines. Comments (`#`) and blank lines are kept.
    pub fn parse(contents: &str) -> CsResult<Self> {
        let mut lines = Vec::new();
        for (idx, raw) in contents.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                lines.push(Line::Other(raw.to_string()));
                continue;
            }

            let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let (key, value) = body.split_once('=').ok_or_else(|| {
                StackError::EnvFile(format!("line {}: expected KEY=VALUE", idx + 1))
            })?;
            let key = key.trim();
            validate_key(key).map_err(|e| StackError::EnvFile(format!("line {}: {e}", idx + 1)))?;

            lines.push(Line::Entry {
                key: key.to_string(),
                value: unquote(value.trim()),
                raw: Some(raw.to_string()),
            });
        }
        Ok(Self { lines })
    }

    /// Read and parse a file.
    pub fn load(path: &Path) -> CsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Read a file if it exists, otherwise start empty.
    pub fn load_or_default(path: &Path) -> CsResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Value of `key`. The last assignment wins, as with the orchestration tool.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Whether `key` is present with a non-empty value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Set `key`, updating the last existing assignment in place or appending.
    pub fn set(&mut self, key: &str, value: &str) -> CsResult<()> {
        validate_key(key)?;
        let existing = self.lines.iter_mut().rev().find_map(|line| match line {
            Line::Entry { key: k, value, raw } if k == key => Some((value, raw)),
            _ => None,
        });
        match existing {
            Some((v, raw)) => {
                if v.as_str() != value {
                    *v = value.to_string();
                    *raw = None;
                }
            }
            None => self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
                raw: None,
            }),
        }
        Ok(())
    }

    /// Remove every assignment of `key`. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if k == key));
        self.lines.len() != before
    }

    /// Keys in file order, without duplicates.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for line in &self.lines {
            if let Line::Entry { key, .. } = line {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Render back to text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Other(text) => out.push_str(text),
                Line::Entry { raw: Some(raw), .. } => out.push_str(raw),
                Line::Entry { key, value, raw: None } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote(value));
                }
            }
            out.push('\n');
        }
        out
    }

    /// Write to `path`, readable only by the owner on Unix (the file holds secrets).
    pub fn save(&self, path: &Path) -> CsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        debug!("wrote environment file {}", path.display());
        Ok(())
    }

    /// First-run environment file for `config`.
    ///
    /// The object store keeps its shipped administrator login, the database
    /// gets `db_password`, and the identity-provider credentials are left
    /// empty until the application is registered.
    pub fn template(config: &StackConfig, db_password: &str) -> Self {
        let db = &config.database;
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db.user,
            db_password,
            db.service_name,
            constants::DATABASE_PORT,
            db.name
        );

        let mut env = Self::default();
        env.push_comment(&format!(
            "# chatstack environment, generated {}",
            chrono::Utc::now().format("%Y-%m-%d")
        ));
        env.push_comment("# Read by every container at start-up. Restart the stack after editing:");
        env.push_comment("#   chatstack restart");
        env.push_comment("");

        env.push_comment("# Relational store");
        env.push_entry(env_keys::POSTGRES_USER, &db.user);
        env.push_entry(env_keys::POSTGRES_PASSWORD, db_password);
        env.push_entry(env_keys::POSTGRES_DB, &db.name);
        env.push_entry(env_keys::DATABASE_URL, &database_url);
        env.push_comment("");

        env.push_comment("# Object store (shipped administrator login)");
        env.push_entry(env_keys::MINIO_ROOT_USER, constants::DEFAULT_OBJECT_STORE_USER);
        env.push_entry(env_keys::MINIO_ROOT_PASSWORD, constants::DEFAULT_OBJECT_STORE_PASSWORD);
        env.push_entry(env_keys::STORAGE_ENDPOINT, &config.object_store_internal_url());
        env.push_entry(env_keys::STORAGE_BUCKET, &config.setup.bucket);
        env.push_entry(
            env_keys::STORAGE_PUBLIC_URL,
            &format!(
                "http://localhost:{}/{}",
                config.object_store.api_port, config.setup.bucket
            ),
        );
        env.push_comment("");

        env.push_comment("# Identity provider. Fill in after registering the application:");
        env.push_comment("#   chatstack setup identity");
        env.push_entry(
            env_keys::IDP_ENDPOINT,
            &format!("http://{}:8000", config.identity.service_name),
        );
        env.push_entry(env_keys::IDP_ORGANIZATION, &config.setup.organization);
        env.push_entry(env_keys::IDP_APPLICATION, &config.setup.application_name);
        env.push_entry(env_keys::IDP_CLIENT_ID, "");
        env.push_entry(env_keys::IDP_CLIENT_SECRET, "");
        env
    }

    fn push_comment(&mut self, text: &str) {
        self.lines.push(Line::Other(text.to_string()));
    }

    fn push_entry(&mut self, key: &str, value: &str) {
        self.lines.push(Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
            raw: None,
        });
    }
}

fn validate_key(key: &str) -> CsResult<()> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(StackError::EnvFile(format!("invalid variable name '{key}'")))
    }
}

fn unquote(value: &str) -> String {
    // Anything after the closing quote is an inline comment.
    if let Some(rest) = value.strip_prefix('"') {
        let mut out = String::with_capacity(rest.len());
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return out,
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                },
                _ => out.push(c),
            }
        }
    }
    if let Some(rest) = value.strip_prefix('\'') {
        if let Some(end) = rest.find('\'') {
            return rest[..end].to_string();
        }
    }

    // Unterminated quotes are kept literally, like any unquoted value.
    if value.starts_with('#') {
        return String::new();
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}

fn quote(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# stack secrets
POSTGRES_USER=chat

export MINIO_ROOT_USER = minioadmin
IDP_CLIENT_ID=   # filled in later
GREETING=\"hello \\\"world\\\"\"
LITERAL='a # b'
";

    #[test]
    fn test_parse_values() {
        let env = EnvFile::parse(SAMPLE).unwrap();
        assert_eq!(env.get("POSTGRES_USER"), Some("chat"));
        assert_eq!(env.get("MINIO_ROOT_USER"), Some("minioadmin"));
        assert_eq!(env.get("IDP_CLIENT_ID"), Some(""));
        assert!(!env.is_set("IDP_CLIENT_ID"));
        assert_eq!(env.get("GREETING"), Some("hello \"world\""));
        assert_eq!(env.get("LITERAL"), Some("a # b"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn test_comment_after_quoted_value() {
        let env = EnvFile::parse(
            "MINIO_ROOT_PASSWORD=\"s3cret\" # rotated\nSINGLE='pw' # old\nOPEN=\"abc\n",
        )
        .unwrap();
        assert_eq!(env.get("MINIO_ROOT_PASSWORD"), Some("s3cret"));
        assert_eq!(env.get("SINGLE"), Some("pw"));
        assert_eq!(env.get("OPEN"), Some("\"abc"));
    }

    #[test]
    fn test_untouched_file_renders_identically() {
        let env = EnvFile::parse(SAMPLE).unwrap();
        assert_eq!(env.render(), SAMPLE);
    }

    #[test]
    fn test_set_updates_in_place_and_appends() {
        let mut env = EnvFile::parse(SAMPLE).unwrap();
        env.set("IDP_CLIENT_ID", "abc123").unwrap();
        env.set("IDP_CLIENT_SECRET", "s3cr3t with space").unwrap();

        let rendered = env.render();
        assert!(rendered.starts_with("# stack secrets\nPOSTGRES_USER=chat\n"));
        assert!(rendered.contains("\nIDP_CLIENT_ID=abc123\nGREETING="));
        assert!(rendered.ends_with("IDP_CLIENT_SECRET=\"s3cr3t with space\"\n"));

        let reparsed = EnvFile::parse(&rendered).unwrap();
        assert_eq!(reparsed.get("IDP_CLIENT_SECRET"), Some("s3cr3t with space"));
        assert_eq!(reparsed.keys().len(), 6);
    }

    #[test]
    fn test_last_assignment_wins() {
        let mut env = EnvFile::parse("A=1\nA=2\n").unwrap();
        assert_eq!(env.get("A"), Some("2"));
        env.set("A", "3").unwrap();
        assert_eq!(env.render(), "A=1\nA=3\n");
        assert!(env.remove("A"));
        assert_eq!(env.render(), "");
        assert!(!env.remove("A"));
    }

    #[test]
    fn test_rejects_bad_lines() {
        let err = EnvFile::parse("OK=1\nnot an assignment\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");

        let err = EnvFile::parse("9LIVES=1\n").unwrap_err();
        assert!(err.to_string().contains("invalid variable name"), "{err}");

        let mut env = EnvFile::default();
        assert!(env.set("BAD-KEY", "x").is_err());
    }

    #[test]
    fn test_template_contents() {
        let config = StackConfig::default();
        let env = EnvFile::template(&config, "pw");
        assert_eq!(env.get(env_keys::MINIO_ROOT_USER), Some("minioadmin"));
        assert_eq!(env.get(env_keys::POSTGRES_PASSWORD), Some("pw"));
        assert_eq!(
            env.get(env_keys::DATABASE_URL),
            Some("postgres://chatstack:pw@database:5432/chatstack")
        );
        assert_eq!(env.get(env_keys::STORAGE_BUCKET), Some("chat-files"));
        assert_eq!(env.get(env_keys::STORAGE_ENDPOINT), Some("http://object-store:9000"));
        assert!(!env.is_set(env_keys::IDP_CLIENT_ID));
        assert!(!env.is_set(env_keys::IDP_CLIENT_SECRET));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let mut env = EnvFile::load_or_default(&path).unwrap();
        env.set("KEY", "value").unwrap();
        env.save(&path).unwrap();

        let loaded = EnvFile::load(&path).unwrap();
        assert_eq!(loaded.get("KEY"), Some("value"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
