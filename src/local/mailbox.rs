//! A mailbox kept on disk: each folder is a directory, each message a JSON
//! file. An external mailer delivers into `Inbox` and drains `Outbox`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use calsync_core::collaborators::{
    Attachment, InboundMessage, InboundSource, MailFolder, MailTransport,
};
use calsync_core::setup::{FolderRule, MailboxProvisioner};
use calsync_core::{CalSyncError, CalSyncResult};

const RULES_FILE: &str = "rules.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAttachment {
    filename: String,
    /// Calendar data is text, so attachments are kept as UTF-8.
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    subject: String,
    #[serde(default)]
    body: String,
    received_at: DateTime<Utc>,
    #[serde(default)]
    attachments: Vec<StoredAttachment>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<FolderRule>,
}

pub struct Mailbox {
    root: PathBuf,
}

impl Mailbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Mailbox { root: root.into() }
    }

    fn folder_path(&self, folder: &MailFolder) -> PathBuf {
        self.root.join(folder.dir_name())
    }

    fn message_files(&self, folder: &MailFolder) -> CalSyncResult<Vec<PathBuf>> {
        let dir = self.folder_path(folder);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_message(path: &Path) -> CalSyncResult<StoredMessage> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| CalSyncError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Messages in `folder` that parse, keyed by file stem.
    fn read_folder(&self, folder: &MailFolder) -> CalSyncResult<Vec<(String, PathBuf, StoredMessage)>> {
        let mut messages = Vec::new();
        for path in self.message_files(folder)? {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            match Self::read_message(&path) {
                Ok(message) => messages.push((id, path, message)),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable message"),
            }
        }
        Ok(messages)
    }

    fn write_message(&self, folder: &MailFolder, message: &StoredMessage) -> CalSyncResult<String> {
        let dir = self.folder_path(folder);
        std::fs::create_dir_all(&dir)?;

        let id = format!(
            "{}-{}",
            message.received_at.format("%Y%m%dT%H%M%S"),
            uuid::Uuid::new_v4().simple()
        );
        let content = serde_json::to_string_pretty(message)
            .map_err(|e| CalSyncError::Serialization(e.to_string()))?;

        let path = dir.join(format!("{id}.json"));
        let temp = dir.join(format!("{id}.json.tmp"));
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;
        Ok(id)
    }

    fn read_rules(&self) -> CalSyncResult<RulesFile> {
        let path = self.root.join(RULES_FILE);
        if !path.exists() {
            return Ok(RulesFile::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents).map_err(|e| CalSyncError::Serialization(e.to_string()))
    }

    /// Move `Inbox` messages into the folder named by the first matching
    /// rule. Returns how many were moved.
    pub fn apply_rules(&self) -> CalSyncResult<usize> {
        let rules = self.read_rules()?.rules;
        if rules.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;
        for (id, path, message) in self.read_folder(&MailFolder::Inbox)? {
            let Some(rule) = rules.iter().find(|r| r.matches(&message.subject)) else {
                continue;
            };
            let target = self.folder_path(&MailFolder::Named(rule.target_folder.clone()));
            std::fs::create_dir_all(&target)?;
            std::fs::rename(&path, target.join(format!("{id}.json")))?;
            tracing::debug!(message = %id, rule = %rule.name, "moved message");
            moved += 1;
        }
        Ok(moved)
    }
}

impl MailTransport for Mailbox {
    fn send_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: &Attachment,
    ) -> CalSyncResult<()> {
        let content = String::from_utf8(attachment.data.clone()).map_err(|e| {
            CalSyncError::Transport(format!("Attachment {} is not text: {e}", attachment.filename))
        })?;
        let message = StoredMessage {
            to: Some(to.to_string()),
            subject: subject.to_string(),
            body: body.to_string(),
            received_at: Utc::now(),
            attachments: vec![StoredAttachment {
                filename: attachment.filename.clone(),
                content,
            }],
        };

        let id = self.write_message(&MailFolder::Outbox, &message)?;
        self.write_message(&MailFolder::Sent, &message)?;
        tracing::info!(%to, message = %id, "queued message in outbox");
        Ok(())
    }

    fn delete_messages_matching(&self, folder: &MailFolder, subject: &str) -> CalSyncResult<usize> {
        let mut deleted = 0;
        for (_, path, message) in self.read_folder(folder)? {
            if message.subject == subject {
                std::fs::remove_file(&path)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

impl InboundSource for Mailbox {
    fn list_messages(&self, folder: &MailFolder) -> CalSyncResult<Vec<InboundMessage>> {
        if !self.folder_path(folder).is_dir() {
            return Err(CalSyncError::Transport(format!("Mail folder not found: {folder}")));
        }

        Ok(self
            .read_folder(folder)?
            .into_iter()
            .map(|(id, _, message)| InboundMessage {
                id,
                subject: message.subject,
                received_at: message.received_at,
                attachments: message
                    .attachments
                    .into_iter()
                    .map(|a| Attachment {
                        filename: a.filename,
                        data: a.content.into_bytes(),
                    })
                    .collect(),
            })
            .collect())
    }

    fn delete_message(&self, folder: &MailFolder, id: &str) -> CalSyncResult<()> {
        let path = self.folder_path(folder).join(format!("{id}.json"));
        std::fs::remove_file(&path)?;
        Ok(())
    }
}

impl MailboxProvisioner for Mailbox {
    fn folder_exists(&self, name: &str) -> CalSyncResult<bool> {
        Ok(self.root.join(name).is_dir())
    }

    fn create_folder(&self, name: &str) -> CalSyncResult<()> {
        std::fs::create_dir_all(self.root.join(name))?;
        Ok(())
    }

    fn rule_exists(&self, name: &str) -> CalSyncResult<bool> {
        Ok(self.read_rules()?.rules.iter().any(|r| r.name == name))
    }

    fn create_rule(&self, rule: &FolderRule) -> CalSyncResult<()> {
        let mut file = self.read_rules()?;
        file.rules.push(rule.clone());

        std::fs::create_dir_all(&self.root)?;
        let content =
            toml::to_string_pretty(&file).map_err(|e| CalSyncError::Serialization(e.to_string()))?;
        let path = self.root.join(RULES_FILE);
        let temp = self.root.join(format!("{RULES_FILE}.tmp"));
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }
}
