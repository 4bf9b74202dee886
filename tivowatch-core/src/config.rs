//! Explicit runtime configuration.
//!
//! Every knob lives in [`Config`], built once at start-up and passed down;
//! no component reads the ambient environment directly. Each field has a
//! named default, so an empty environment yields a fully usable config.
//!
//! Key names keep the surface the original watcher deployment used
//! (`TIVO_IP`, `WATCH_DIR`, `CHECK_INTERVAL`, `MIN_FILE_AGE`,
//! `SEQUENCE_NAME`) plus the lock/log/mail settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{DeviceAddr, SequenceName, ShareName};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_DEVICE: &str = "192.168.1.185";
pub const DEFAULT_WATCH_DIR: &str = "/mnt/cloud/tivowatch";
pub const DEFAULT_SEQUENCE: &str = "watcher";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MIN_FILE_AGE_SECS: u64 = 60;
pub const DEFAULT_TRANSFER_CMD: &str = "pytivo-transfer";
pub const DEFAULT_LOCK_FILE: &str = "/tmp/tivowatch.pid";
pub const DEFAULT_LOG_FILE: &str = "/var/log/tivowatch.log";
pub const DEFAULT_SMTP_HOST: &str = "localhost";
pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_MAIL_FROM: &str = "tivowatch@localhost";

/// Media extensions eligible for transfer, lowercase, no leading dot.
pub const DEFAULT_EXTENSIONS: &[&str] =
    &["mkv", "mp4", "avi", "m4v", "mov", "mpg", "mpeg", "ts"];

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Mail-relay settings. Notification is opt-in: with no recipient set,
/// every run is classified normally but nothing is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub relay_host: String,
    pub relay_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_host: DEFAULT_SMTP_HOST.to_string(),
            relay_port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            from: DEFAULT_MAIL_FROM.to_string(),
            to: None,
        }
    }
}

/// Full runtime configuration for one tivowatch process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub device: DeviceAddr,
    pub watch_dir: PathBuf,
    pub sequence: SequenceName,
    pub check_interval: Duration,
    pub min_file_age: Duration,
    /// Lowercase extensions without the leading dot.
    pub extensions: Vec<String>,
    /// Explicit destination label; skips share discovery when set.
    pub share_override: Option<ShareName>,
    pub transfer_cmd: PathBuf,
    pub lock_file: PathBuf,
    pub log_file: PathBuf,
    pub mail: MailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceAddr::from(DEFAULT_DEVICE),
            watch_dir: PathBuf::from(DEFAULT_WATCH_DIR),
            sequence: SequenceName::from(DEFAULT_SEQUENCE),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            min_file_age: Duration::from_secs(DEFAULT_MIN_FILE_AGE_SECS),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            share_override: None,
            transfer_cmd: PathBuf::from(DEFAULT_TRANSFER_CMD),
            lock_file: PathBuf::from(DEFAULT_LOCK_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            mail: MailConfig::default(),
        }
    }
}

impl Config {
    /// Build a config from the ambient process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from explicit key/value pairs. Unknown keys are
    /// ignored; absent keys fall back to the named defaults.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let mut config = Config::default();

        if let Some(value) = non_empty(&vars, "TIVO_IP")? {
            config.device = DeviceAddr::from(value);
        }
        if let Some(value) = non_empty(&vars, "WATCH_DIR")? {
            config.watch_dir = PathBuf::from(value);
        }
        if let Some(value) = non_empty(&vars, "SEQUENCE_NAME")? {
            config.sequence = SequenceName::from(value);
        }
        if let Some(secs) = parse_secs(&vars, "CHECK_INTERVAL")? {
            config.check_interval = secs;
        }
        if let Some(secs) = parse_secs(&vars, "MIN_FILE_AGE")? {
            config.min_file_age = secs;
        }
        if let Some(value) = non_empty(&vars, "VIDEO_EXTENSIONS")? {
            config.extensions = value
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
        }
        if let Some(value) = non_empty(&vars, "TIVO_SHARE")? {
            config.share_override = Some(ShareName::from(value));
        }
        if let Some(value) = non_empty(&vars, "TRANSFER_CMD")? {
            config.transfer_cmd = PathBuf::from(value);
        }
        if let Some(value) = non_empty(&vars, "LOCK_FILE")? {
            config.lock_file = PathBuf::from(value);
        }
        if let Some(value) = non_empty(&vars, "LOG_FILE")? {
            config.log_file = PathBuf::from(value);
        }

        if let Some(value) = non_empty(&vars, "SMTP_HOST")? {
            config.mail.relay_host = value;
        }
        if let Some(value) = non_empty(&vars, "SMTP_PORT")? {
            config.mail.relay_port =
                value.parse().map_err(|_| ConfigError::Invalid {
                    key: "SMTP_PORT",
                    value,
                    expected: "a port number",
                })?;
        }
        config.mail.username = non_empty(&vars, "SMTP_USER")?;
        config.mail.password = non_empty(&vars, "SMTP_PASS")?;
        if let Some(value) = non_empty(&vars, "MAIL_FROM")? {
            config.mail.from = value;
        }
        config.mail.to = non_empty(&vars, "MAIL_TO")?;

        Ok(config)
    }
}

/// `Some(value)` when the key is set and non-blank; unset keys are `None`.
/// A key set to whitespace only is a config error, not a silent default.
fn non_empty(
    vars: &HashMap<String, String>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match vars.get(key) {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(ConfigError::Empty { key })
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

fn parse_secs(
    vars: &HashMap<String, String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    match non_empty(vars, key)? {
        None => Ok(None),
        Some(value) => {
            let secs: u64 = value.parse().map_err(|_| ConfigError::Invalid {
                key,
                value,
                expected: "a whole number of seconds",
            })?;
            Ok(Some(Duration::from_secs(secs)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
