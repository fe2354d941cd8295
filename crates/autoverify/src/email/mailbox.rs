//! The mailbox session boundary used by the poller.

use std::fmt;

use async_trait::async_trait;

use super::error::Result;

/// Search criteria, rendered as IMAP `SEARCH` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// Messages without `\Seen` from the given sender.
    UnseenFrom(String),
    /// Every message from the given sender.
    From(String),
}

impl SearchCriteria {
    pub fn to_imap_query(&self) -> String {
        match self {
            SearchCriteria::UnseenFrom(sender) => format!("UNSEEN FROM {}", quote(sender)),
            SearchCriteria::From(sender) => format!("FROM {}", quote(sender)),
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_imap_query())
    }
}

/// IMAP quoted string: wraps in double quotes and escapes `\` and `"`.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Processed-set key for a message: its UID qualified by the folder's
/// UIDVALIDITY, so keys stay valid across sessions.
pub fn message_key(uidvalidity: u32, uid: u32) -> String {
    format!("{}:{}", uidvalidity, uid)
}

/// Processed-set key derived from a Message-ID header.
pub fn message_id_key(message_id: &str) -> String {
    format!("mid:{}", message_id.trim().trim_matches(|c| c == '<' || c == '>'))
}

/// An authenticated connection to a mail store.
///
/// Implementations must make `disconnect` safe to call after any failure,
/// including a failed `connect`.
#[async_trait(?Send)]
pub trait Mailbox {
    /// Connects and logs in. A no-op when already connected.
    async fn connect(&mut self) -> Result<()>;

    /// Opens a folder and returns its UIDVALIDITY.
    async fn select_folder(&mut self, folder: &str) -> Result<u32>;

    /// Returns the UIDs matching the criteria, in ascending order.
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>>;

    /// Returns the raw RFC 822 bytes of one message.
    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>>;

    /// Logs out and releases the connection.
    async fn disconnect(&mut self) -> Result<()>;
}
