//! Mailbox and message error types.

use thiserror::Error;

/// Errors raised while talking to the mailbox or decoding a message.
#[derive(Error, Debug)]
pub enum EmailError {
    /// Failed to connect to the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Login rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The app password could not be resolved.
    #[error("Credentials not found: {0}")]
    CredentialsNotFound(String),

    /// IMAP protocol error.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Folder not found.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// Operation attempted before `connect` or after `disconnect`.
    #[error("Not connected to the mailbox")]
    NotConnected,

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A text part declared a charset that cannot be decoded.
    #[error("Unsupported charset '{0}'")]
    UnsupportedCharset(String),

    /// A part that was expected to carry text does not.
    #[error("Part is not text: {0}")]
    NotText(String),
}

impl From<async_native_tls::Error> for EmailError {
    fn from(err: async_native_tls::Error) -> Self {
        EmailError::TlsError(err.to_string())
    }
}

/// Result type for email operations.
pub type Result<T> = std::result::Result<T, EmailError>;
