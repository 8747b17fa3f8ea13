//! One-time mailbox bootstrap: the sync folder and the rule that routes
//! sync messages into it.

use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::error::CalSyncResult;

/// Subject prefixes of replies and forwards, which stay in the inbox.
pub const EXCLUDED_PREFIXES: [&str; 2] = ["RE: ", "FW: "];

/// Moves received messages whose subject contains `subject_contains` into
/// `target_folder`, unless the subject starts with one of the exceptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRule {
    pub name: String,
    pub subject_contains: String,
    pub target_folder: String,
    pub except_subject_prefixes: Vec<String>,
}

impl FolderRule {
    pub fn for_config(config: &SyncConfig) -> Self {
        FolderRule {
            name: config.rule_name.clone(),
            subject_contains: config.email_subject.clone(),
            target_folder: config.folder_name.clone(),
            except_subject_prefixes: EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn matches(&self, subject: &str) -> bool {
        subject.contains(&self.subject_contains)
            && !self
                .except_subject_prefixes
                .iter()
                .any(|prefix| subject.starts_with(prefix.as_str()))
    }
}

/// Folder and rule management on the mail account.
pub trait MailboxProvisioner {
    fn folder_exists(&self, name: &str) -> CalSyncResult<bool>;
    fn create_folder(&self, name: &str) -> CalSyncResult<()>;
    fn rule_exists(&self, name: &str) -> CalSyncResult<bool>;
    fn create_rule(&self, rule: &FolderRule) -> CalSyncResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub created_folder: bool,
    pub created_rule: bool,
}

impl SetupReport {
    pub fn changed_anything(&self) -> bool {
        self.created_folder || self.created_rule
    }
}

pub struct MailboxSetup<'a> {
    provisioner: &'a dyn MailboxProvisioner,
    folder_name: &'a str,
    rule: FolderRule,
}

impl<'a> MailboxSetup<'a> {
    pub fn new(provisioner: &'a dyn MailboxProvisioner, config: &'a SyncConfig) -> Self {
        MailboxSetup {
            provisioner,
            folder_name: &config.folder_name,
            rule: FolderRule::for_config(config),
        }
    }

    /// Provisioned means the sync folder exists.
    pub fn is_complete(&self) -> CalSyncResult<bool> {
        self.provisioner.folder_exists(self.folder_name)
    }

    /// Create whatever is missing. Safe to call repeatedly.
    pub fn install(&self) -> CalSyncResult<SetupReport> {
        let mut report = SetupReport::default();

        if !self.provisioner.folder_exists(self.folder_name)? {
            self.provisioner.create_folder(self.folder_name)?;
            tracing::info!(folder = self.folder_name, "created sync folder");
            report.created_folder = true;
        }

        if !self.provisioner.rule_exists(&self.rule.name)? {
            self.provisioner.create_rule(&self.rule)?;
            tracing::info!(rule = %self.rule.name, "created folder rule");
            report.created_rule = true;
        }

        Ok(report)
    }
}
