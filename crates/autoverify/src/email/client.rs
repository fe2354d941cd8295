//! IMAP implementation of the mailbox session.

use std::future::Future;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;

use super::error::{EmailError, Result};
use super::mailbox::{Mailbox, SearchCriteria};

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// IMAP client over implicit TLS with password (app password) login.
pub struct ImapClient {
    session: Option<Session<TlsStream>>,
    host: String,
    port: u16,
    username: String,
    password: SecretString,
    timeout: Duration,
    mark_seen: bool,
    current_folder: Option<String>,
}

impl ImapClient {
    /// Creates a client from the daemon config, resolving the app password.
    pub fn from_config(config: &Config) -> Result<Self> {
        let password = config
            .password_source()
            .resolve()
            .map_err(|e| EmailError::CredentialsNotFound(e.to_string()))?;

        Ok(Self {
            session: None,
            host: config.imap_host.clone(),
            port: config.imap_port,
            username: config.email.clone(),
            password,
            timeout: config.mailbox_timeout(),
            mark_seen: config.mark_seen,
            current_folder: None,
        })
    }

    /// Checks if the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the folder opened by the last `select_folder`.
    pub fn current_folder(&self) -> Option<&str> {
        self.current_folder.as_deref()
    }

    fn fetch_query(&self) -> &'static str {
        // BODY[] sets \Seen on a read-write folder; PEEK leaves flags alone.
        if self.mark_seen {
            "BODY[]"
        } else {
            "BODY.PEEK[]"
        }
    }
}

/// Runs `fut`, failing with `EmailError::Timeout` once `limit` elapses.
async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        EmailError::Timeout(format!("{} after {}s", operation, limit.as_secs()))
    })
}

fn protocol_error(err: async_imap::error::Error) -> EmailError {
    EmailError::ProtocolError(err.to_string())
}

#[async_trait(?Send)]
impl Mailbox for ImapClient {
    async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        info!("Connecting to IMAP server at {}", addr);

        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| EmailError::ConnectionFailed(format!("{}: {}", addr, e)))?
            .next()
            .ok_or_else(|| {
                EmailError::ConnectionFailed(format!("{} did not resolve to an address", addr))
            })?;

        let std_stream = TcpStream::connect_timeout(&socket_addr, self.timeout)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;

        let tls = TlsConnector::new();
        let tls_stream = bounded(
            self.timeout,
            "TLS handshake",
            tls.connect(&self.host, tcp_stream),
        )
        .await??;

        let client = async_imap::Client::new(tls_stream);
        let session = bounded(
            self.timeout,
            "login",
            client.login(&self.username, self.password.expose_secret()),
        )
        .await?
        .map_err(|(e, _)| EmailError::AuthenticationFailed(e.to_string()))?;

        info!("Successfully authenticated to IMAP server");
        self.session = Some(session);
        Ok(())
    }

    async fn select_folder(&mut self, folder: &str) -> Result<u32> {
        let timeout = self.timeout;
        let read_write = self.mark_seen;
        let session = self.session.as_mut().ok_or(EmailError::NotConnected)?;

        info!(
            "Opening folder {} ({})",
            folder,
            if read_write { "read-write" } else { "read-only" }
        );

        let opened = bounded(timeout, "select", async {
            if read_write {
                session.select(folder).await
            } else {
                session.examine(folder).await
            }
        })
        .await?;

        let mailbox = opened.map_err(|e| {
            if e.to_string().contains("Mailbox doesn't exist") || e.to_string().contains("NO") {
                EmailError::FolderNotFound(folder.to_string())
            } else {
                protocol_error(e)
            }
        })?;

        let uidvalidity = mailbox.uid_validity.ok_or_else(|| {
            EmailError::ProtocolError("Server did not provide UIDVALIDITY".to_string())
        })?;

        self.current_folder = Some(folder.to_string());
        debug!(
            "Folder '{}' opened with UIDVALIDITY={}",
            folder, uidvalidity
        );
        Ok(uidvalidity)
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let timeout = self.timeout;
        let session = self.session.as_mut().ok_or(EmailError::NotConnected)?;

        let query = criteria.to_imap_query();
        debug!("Searching with query: {}", query);

        let uids = bounded(timeout, "search", session.uid_search(&query))
            .await?
            .map_err(protocol_error)?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        debug!("Found {} messages matching search", uid_list.len());
        Ok(uid_list)
    }

    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let query = self.fetch_query();
        let session = self.session.as_mut().ok_or(EmailError::NotConnected)?;

        debug!("Fetching email with UID {} ({})", uid, query);

        let body = bounded(timeout, "fetch", async {
            let mut messages = session
                .uid_fetch(uid.to_string(), query)
                .await
                .map_err(protocol_error)?;

            // Drain the whole response; servers may interleave unsolicited
            // FETCH updates for other messages.
            let mut body = None;
            while let Some(message) = messages.next().await {
                let message = message.map_err(protocol_error)?;
                if body.is_some() || message.uid.is_some_and(|u| u != uid) {
                    continue;
                }
                body = message.body().map(|b| b.to_vec());
            }
            Ok::<_, EmailError>(body)
        })
        .await??;

        body.ok_or_else(|| {
            EmailError::ProtocolError(format!("Message with UID {} has no body", uid))
        })
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.current_folder = None;
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            bounded(self.timeout, "logout", session.logout())
                .await?
                .map_err(protocol_error)?;
        }
        Ok(())
    }
}

impl Drop for ImapClient {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapClient dropped without explicit disconnect - session will be closed");
        }
    }
}
