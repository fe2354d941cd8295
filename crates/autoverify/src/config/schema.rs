use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

/// Daemon configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mailbox login (usually the full address).
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password_env_var: Option<String>,

    #[serde(default = "default_imap_host")]
    pub imap_host: String,

    #[serde(default = "default_imap_port")]
    pub imap_port: u16,

    #[serde(default = "default_folder")]
    pub folder: String,

    /// Value of the `FROM` search key used to find verification mail.
    #[serde(default = "default_sender")]
    pub sender: String,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    #[serde(default = "default_processed_file")]
    pub processed_file: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// A message is only acted upon if its subject contains one of these
    /// (case-insensitive).
    #[serde(default = "default_subject_keywords")]
    pub subject_keywords: Vec<String>,

    /// Fetch with `BODY[]` on a read-write folder, so handled mail shows as read.
    #[serde(default = "default_true")]
    pub mark_seen: bool,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_mailbox_timeout")]
    pub mailbox_timeout_secs: u64,
}

impl Config {
    /// Builds a config with every optional field at its default.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            app_password: None,
            app_password_file: None,
            app_password_env_var: None,
            imap_host: default_imap_host(),
            imap_port: default_imap_port(),
            folder: default_folder(),
            sender: default_sender(),
            check_interval_secs: default_check_interval(),
            processed_file: default_processed_file(),
            log_file: default_log_file(),
            subject_keywords: default_subject_keywords(),
            mark_seen: true,
            http_timeout_secs: default_http_timeout(),
            mailbox_timeout_secs: default_mailbox_timeout(),
        }
    }

    pub fn password_source(&self) -> SecretSource<'_> {
        SecretSource {
            direct: self.app_password.as_deref(),
            file_path: self.app_password_file.as_deref(),
            env_var: self.app_password_env_var.as_deref(),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn mailbox_timeout(&self) -> Duration {
        Duration::from_secs(self.mailbox_timeout_secs)
    }

    /// Returns true if the subject marks a verification message. Blank
    /// keywords never match.
    pub fn is_verification_subject(&self, subject: &str) -> bool {
        let subject = subject.to_lowercase();
        self.subject_keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .any(|keyword| subject.contains(&keyword.to_lowercase()))
    }
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_folder() -> String {
    "INBOX".to_string()
}

fn default_sender() -> String {
    "netflix".to_string()
}

fn default_check_interval() -> u64 {
    30
}

fn default_processed_file() -> PathBuf {
    PathBuf::from("processed_emails.json")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("daemon.log")
}

fn default_subject_keywords() -> Vec<String> {
    vec!["存取碼".to_string(), "verify".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_http_timeout() -> u64 {
    30
}

fn default_mailbox_timeout() -> u64 {
    60
}
