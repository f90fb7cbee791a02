//! RSVP Relay configuration system.
//!
//! Resolution order (later wins): built-in defaults → TOML file → environment.
//! Missing credentials are not rejected here; they surface as faults at the
//! first fetch or send that needs them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RsvpError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RsvpConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

impl RsvpConfig {
    /// Load config from the default path (~/.rsvp-relay/config.toml), falling
    /// back to defaults, then overlay the process environment.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific TOML file (no environment overlay).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RsvpError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RsvpError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rsvp-relay")
            .join("config.toml")
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup. Blank values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GOOGLE_SHEET_ID") {
            self.sheet.spreadsheet_id = v;
        }
        if let Some(v) = get("SHEET_NAME") {
            self.sheet.tab_name = v;
        }
        if let Some(v) = get("GOOGLE_SERVICE_ACCOUNT_KEY") {
            self.sheet.credentials_path = v;
        }
        if let Some(v) = get("GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            self.sheet.service_account_email = v;
        }
        if let Some(v) = get("GMAIL_USER") {
            self.mail.username = v;
        }
        if let Some(v) = get("GMAIL_PASS") {
            self.mail.password = v;
        }
        if let Some(v) = get("SMTP_HOST") {
            self.mail.smtp_host = v;
        }
        if let Some(v) = get("SMTP_PORT") {
            match v.trim().parse() {
                Ok(port) => self.mail.smtp_port = port,
                Err(_) => tracing::warn!("⚠️ Ignoring invalid SMTP_PORT '{v}'"),
            }
        }
        if let Some(v) = get("RSVP_FROM_NAME") {
            self.mail.from_name = v;
        }
        if let Some(v) = get("RSVP_IMAGE_PATH") {
            self.mail.image_path = v;
        }
        if let Some(v) = get("RSVP_LEDGER_PATH") {
            self.ledger.path = v;
        }
        if let Some(v) = get("POLL_INTERVAL_SECS") {
            match v.trim().parse() {
                Ok(secs) if secs > 0 => self.poll.interval_secs = secs,
                _ => tracing::warn!("⚠️ Ignoring invalid POLL_INTERVAL_SECS '{v}'"),
            }
        }
    }
}

/// Expand `~` in a configured path.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).as_ref())
}

/// Spreadsheet source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default = "default_tab_name")]
    pub tab_name: String,
    /// Column span fetched from each tab.
    #[serde(default = "default_columns")]
    pub columns: String,
    /// Service-account key file: JSON, or `.p12` together with
    /// `service_account_email`.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Issuer for `.p12` keys, which do not carry the account email.
    #[serde(default)]
    pub service_account_email: String,
    #[serde(default = "default_sheets_base_url")]
    pub api_base_url: String,
}

fn default_tab_name() -> String { "RSVP".into() }
fn default_columns() -> String { "A:Z".into() }
fn default_credentials_path() -> String { "service-account-key.json".into() }
fn default_sheets_base_url() -> String { "https://sheets.googleapis.com".into() }

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            tab_name: default_tab_name(),
            columns: default_columns(),
            credentials_path: default_credentials_path(),
            service_account_email: String::new(),
            api_base_url: default_sheets_base_url(),
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Inline image for the thank-you template. Optional on disk.
    #[serde(default = "default_image_path")]
    pub image_path: String,
    #[serde(default = "default_image_cid")]
    pub image_content_id: String,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_smtp_host() -> String { "smtp.gmail.com".into() }
fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "Mạnh Hùng & Ngọc Ánh".into() }
fn default_image_path() -> String { "just.png".into() }
fn default_image_cid() -> String { "just_married_image".into() }
fn default_send_timeout() -> u64 { 30 }

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_name: default_from_name(),
            image_path: default_image_path(),
            image_content_id: default_image_cid(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

/// Processed-email ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

fn default_ledger_path() -> String { "processed_emails.json".into() }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { path: default_ledger_path() }
    }
}

/// Continuous-mode polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 { 60 }

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: default_interval_secs() }
    }
}
