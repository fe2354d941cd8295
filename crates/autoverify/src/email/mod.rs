//! Mailbox access, message decoding and processed-message tracking.
//!
//! The poller talks to the mail store only through the [`Mailbox`] trait;
//! [`ImapClient`] is the production implementation.

pub mod client;
pub mod error;
pub mod mailbox;
pub mod parser;
pub mod tracker;

pub use client::ImapClient;
pub use error::EmailError;
pub use mailbox::{message_id_key, message_key, Mailbox, SearchCriteria};
pub use parser::{parse, ParsedMessage};
pub use tracker::ProcessedSet;
