//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `--config <path>` on the command line
//! 2. `$MAILCAST_CONFIG` (environment variable)
//! 3. `~/.config/mailcast/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailcast\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! Credentials never live in the file: they come from `GMAIL_USER` and
//! `GMAIL_APP_PASS`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MailcastError, Result};
use crate::rate_limit::{interval_for, DEFAULT_EMAILS_PER_MINUTE};
use crate::transport::retry::DEFAULT_MAX_RETRIES;

/// Environment variable holding the submission identity (sender address).
pub const ENV_USER: &str = "GMAIL_USER";
/// Environment variable holding the app-scoped password.
pub const ENV_PASSWORD: &str = "GMAIL_APP_PASS";
/// Environment variable holding the sender display name.
pub const ENV_SENDER_NAME: &str = "MAILCAST_SENDER_NAME";
/// Environment variable overriding the config file location.
pub const ENV_CONFIG: &str = "MAILCAST_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Campaign inputs and pacing.
    pub campaign: CampaignConfig,
    /// Submission server.
    pub smtp: SmtpConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for diagnostic logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Campaign inputs and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Contact table.
    pub contacts: PathBuf,
    /// File attached to every message.
    pub attachment: PathBuf,
    /// Template document; `None` looks for `email_template.txt`, then
    /// falls back to the built-in template.
    pub template: Option<PathBuf>,
    /// Append-only outcome log.
    pub log_path: PathBuf,
    /// Sending rate for live runs.
    pub emails_per_minute: f64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain connection upgraded with STARTTLS (port 587).
    StartTls,
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// No encryption. Only for local test servers.
    None,
}

/// Submission server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Per-command network timeout in seconds.
    pub timeout_secs: u64,
    pub security: Security,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            contacts: PathBuf::from("sample_hr.csv"),
            attachment: PathBuf::from("resume.pdf"),
            template: None,
            log_path: PathBuf::from("send_log.csv"),
            emails_per_minute: DEFAULT_EMAILS_PER_MINUTE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            timeout_secs: 30,
            security: Security::StartTls,
        }
    }
}

impl CampaignConfig {
    /// Reject settings that would make the run meaningless.
    ///
    /// Runs before any contact is read.
    pub fn validate(&self) -> Result<()> {
        interval_for(self.emails_per_minute)?;
        if self.attachment.as_os_str().is_empty() {
            return Err(MailcastError::config("no attachment path given"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(MailcastError::config("no run log path given"));
        }
        Ok(())
    }
}

// ── Credentials ─────────────────────────────────────────────────

/// Submission identity and secret.
#[derive(Clone)]
pub struct Credentials {
    /// Sender address used to log in.
    pub user: String,
    secret: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// Read credentials from `GMAIL_USER` / `GMAIL_APP_PASS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from any key lookup (the environment in production).
    ///
    /// Missing or blank values are configuration errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        match (get(ENV_USER), get(ENV_PASSWORD)) {
            (Some(user), Some(secret)) => Ok(Self::new(user, secret)),
            _ => Err(MailcastError::config(format!(
                "{ENV_USER} and {ENV_PASSWORD} must be set in the environment to send emails"
            ))),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Sender display name from `MAILCAST_SENDER_NAME`, if set.
pub fn sender_name_from_env() -> Option<String> {
    std::env::var(ENV_SENDER_NAME)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// An explicit path that does not exist is an error; otherwise the default
/// configuration is returned if no file is found or on parse error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let contents =
            std::fs::read_to_string(path).map_err(|e| MailcastError::open(path, e))?;
        return toml::from_str::<Config>(&contents).map_err(|e| {
            MailcastError::config(format!("invalid config file {}: {e}", path.display()))
        });
    }

    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return Ok(cfg);
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Ok(Config::default())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(ENV_CONFIG) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailcast").join("config.toml"))
}

/// The file [`load_config`] reads for `explicit`: that path when given, else
/// the default location if a file exists there. `None` means built-in
/// defaults are in effect.
pub fn config_source(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config_file_path().filter(|p| p.exists()),
    }
}

/// Return the cache directory for diagnostic logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailcast")
}
