//! Sync configuration at ~/.config/calsync/config.toml

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{CalSyncError, CalSyncResult};

static DEFAULT_CALENDAR_DIR: &str = "~/calendar";
static DEFAULT_MAILBOX_DIR: &str = "~/calsync-mail";
static DEFAULT_EMAIL_SUBJECT: &str = "CalSync Synchronization Message";
static DEFAULT_FOLDER_NAME: &str = "CalSync Messages";
static DEFAULT_RULE_NAME: &str = "CalSync Folder Rule";

pub const MAX_SYNC_RANGE_DAYS: u32 = 366;

fn default_true() -> bool {
    true
}

fn default_calendar_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CALENDAR_DIR)
}

fn default_mailbox_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MAILBOX_DIR)
}

fn default_email_subject() -> String {
    DEFAULT_EMAIL_SUBJECT.to_string()
}

fn default_folder_name() -> String {
    DEFAULT_FOLDER_NAME.to_string()
}

fn default_rule_name() -> String {
    DEFAULT_RULE_NAME.to_string()
}

/// Everything one run needs to know. Only a validated value leaves
/// [`SyncConfig::load`] or [`SyncConfig::from_toml_str`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Width of the sync window in days, starting today.
    pub sync_range_days: u32,

    /// Where outbound snapshots are mailed. Required when sending.
    #[serde(default)]
    pub target_address: Option<String>,

    #[serde(default = "default_true")]
    pub enable_send: bool,

    #[serde(default = "default_true")]
    pub enable_receive: bool,

    #[serde(default = "default_calendar_dir")]
    pub calendar_dir: PathBuf,

    #[serde(default = "default_mailbox_dir")]
    pub mailbox_dir: PathBuf,

    #[serde(default = "default_email_subject")]
    pub email_subject: String,

    #[serde(default = "default_folder_name")]
    pub folder_name: String,

    #[serde(default = "default_rule_name")]
    pub rule_name: String,
}

impl SyncConfig {
    pub fn config_path() -> CalSyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalSyncError::Config("Could not determine config directory".into()))?
            .join("calsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, or from the default location.
    ///
    /// A missing default file is created with every option commented out,
    /// then reported as an error since `sync_range_days` has no default.
    /// `CALSYNC_*` environment variables override file values.
    pub fn load(path: Option<&Path>) -> CalSyncResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            if path.is_none() {
                Self::create_default_config(&config_path)?;
                return Err(CalSyncError::Config(format!(
                    "Created {}; set sync_range_days and target_address, then run again",
                    config_path.display()
                )));
            }
            return Err(CalSyncError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let config: SyncConfig = Config::builder()
            .add_source(File::from(config_path.as_path()))
            .add_source(Environment::with_prefix("CALSYNC").try_parsing(true))
            .build()
            .map_err(|e| CalSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalSyncError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path = %config_path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text, without environment overrides.
    pub fn from_toml_str(contents: &str) -> CalSyncResult<Self> {
        let config: SyncConfig = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .map_err(|e| CalSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalSyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CalSyncResult<()> {
        if !(1..=MAX_SYNC_RANGE_DAYS).contains(&self.sync_range_days) {
            return Err(CalSyncError::Config(format!(
                "sync_range_days must be between 1 and {MAX_SYNC_RANGE_DAYS}, got {}",
                self.sync_range_days
            )));
        }

        if self.enable_send {
            match self.target_address.as_deref() {
                None => {
                    return Err(CalSyncError::Config(
                        "target_address is required when enable_send is true".into(),
                    ));
                }
                Some(address) if !is_plausible_address(address) => {
                    return Err(CalSyncError::Config(format!(
                        "target_address is not an email address: {address}"
                    )));
                }
                Some(_) => {}
            }
        }

        for (key, value) in [
            ("email_subject", &self.email_subject),
            ("folder_name", &self.folder_name),
            ("rule_name", &self.rule_name),
        ] {
            if value.trim().is_empty() {
                return Err(CalSyncError::Config(format!("{key} must not be empty")));
            }
        }

        Ok(())
    }

    pub fn calendar_path(&self) -> PathBuf {
        expand(&self.calendar_dir)
    }

    pub fn mailbox_path(&self) -> PathBuf {
        expand(&self.mailbox_dir)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalSyncResult<()> {
        let contents = format!(
            "\
# calsync configuration

# Number of days to sync, starting today (1-{MAX_SYNC_RANGE_DAYS}):
# sync_range_days = 14

# Address that receives your busy blocks:
# target_address = \"me@example.com\"

# enable_send = true
# enable_receive = true

# Where your calendar lives:
# calendar_dir = \"{DEFAULT_CALENDAR_DIR}\"

# Where the mailbox folders live:
# mailbox_dir = \"{DEFAULT_MAILBOX_DIR}\"

# email_subject = \"{DEFAULT_EMAIL_SUBJECT}\"
# folder_name = \"{DEFAULT_FOLDER_NAME}\"
# rule_name = \"{DEFAULT_RULE_NAME}\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalSyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalSyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn is_plausible_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
}
