//! The poll loop: query the mailbox, act on new verification mail, record
//! what was handled, sleep, repeat.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::email::{
    message_id_key, message_key, parse, EmailError, Mailbox, ParsedMessage, ProcessedSet,
    SearchCriteria,
};
use crate::error::StoreError;
use crate::sanitize::redact_link;
use crate::verify::{codes, extract, first_link, LinkVerifier};

use super::report::{CycleReport, Disposition};

/// How often the shutdown flag is checked while sleeping between cycles.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Continuous daemon: unseen mail only.
    Daemon,
    /// One-shot operator check: falls back to all mail from the sender when
    /// nothing is unseen, and prints message headers.
    Manual,
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleMode::Daemon => f.write_str("daemon"),
            CycleMode::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    CycleRunning,
}

/// Drives poll cycles against a mailbox and a verifier.
///
/// Everything runs on the caller's task: cycles never overlap and messages
/// within a cycle are handled one after another.
pub struct Poller<'a, M, V> {
    config: &'a Config,
    mailbox: M,
    verifier: V,
    processed: ProcessedSet,
    shutdown: Arc<AtomicBool>,
    state: PollerState,
}

impl<'a, M, V> Poller<'a, M, V>
where
    M: Mailbox,
    V: LinkVerifier,
{
    pub fn new(
        config: &'a Config,
        mailbox: M,
        verifier: V,
        processed: ProcessedSet,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            mailbox,
            verifier,
            processed,
            shutdown,
            state: PollerState::Idle,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Runs cycles until the shutdown flag is set. Cycle errors are logged
    /// and never end the loop.
    pub async fn run(&mut self) {
        info!("Auto-verifier daemon started");
        info!("Checking every {} seconds", self.config.check_interval_secs);

        while !self.is_shutting_down() {
            match self.run_cycle(CycleMode::Daemon).await {
                Ok(report) if report.verified > 0 => {
                    info!("Verified {} email(s)", report.verified);
                }
                Ok(_) => {}
                Err(e) => error!("Loop error: {}", e),
            }

            self.sleep_until_next_cycle().await;
        }

        if let Err(e) = self.persist() {
            error!("Failed to persist processed set on shutdown: {}", e);
        }
        info!("Daemon stopped");
    }

    /// Runs one cycle: connect, search, handle new messages, disconnect,
    /// persist.
    ///
    /// The mailbox is always disconnected and the processed set is always
    /// flushed, even when the cycle stops early on a mailbox error.
    pub async fn run_cycle(&mut self, mode: CycleMode) -> Result<CycleReport, EmailError> {
        let span = info_span!("poll_cycle", mode = %mode);
        self.cycle(mode).instrument(span).await
    }

    async fn cycle(&mut self, mode: CycleMode) -> Result<CycleReport, EmailError> {
        self.state = PollerState::CycleRunning;
        let mut report = CycleReport::default();

        let result = match self.mailbox.connect().await {
            Ok(()) => self.process_mailbox(mode, &mut report).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.mailbox.disconnect().await {
            warn!("Failed to close mailbox session: {}", e);
        }

        match self.persist() {
            Ok(written) => report.persisted = written,
            Err(e) => {
                report.persist_failed = true;
                error!(
                    "Failed to persist processed set: {}. Messages handled this cycle may be \
                     verified again after a restart.",
                    e
                );
            }
        }

        self.state = PollerState::Idle;
        result.map(|()| report)
    }

    async fn process_mailbox(
        &mut self,
        mode: CycleMode,
        report: &mut CycleReport,
    ) -> Result<(), EmailError> {
        let uidvalidity = self.mailbox.select_folder(&self.config.folder).await?;
        let uids = self.find_candidates(mode).await?;
        report.found = uids.len();

        if uids.is_empty() {
            debug!("No new emails from {}", self.config.sender);
            return Ok(());
        }
        debug!("Found {} candidate email(s)", uids.len());

        for uid in uids {
            if self.is_shutting_down() {
                info!("Shutdown requested, leaving remaining emails for the next run");
                break;
            }

            let key = message_key(uidvalidity, uid);
            if self.processed.contains(&key) {
                report.already_processed += 1;
                continue;
            }

            let raw = self.mailbox.fetch(uid).await?;
            let message = parse(&raw);
            let disposition = self.handle_message(&message, mode).await;
            report.record(&disposition);

            // Marked regardless of outcome; failures are not retried.
            self.processed.insert(key);
            if let Some(message_id) = &message.message_id {
                self.processed.insert(message_id_key(message_id));
            }
        }

        Ok(())
    }

    async fn find_candidates(&mut self, mode: CycleMode) -> Result<Vec<u32>, EmailError> {
        let sender = &self.config.sender;
        let unseen = self
            .mailbox
            .search(&SearchCriteria::UnseenFrom(sender.clone()))
            .await?;

        if unseen.is_empty() && mode == CycleMode::Manual {
            info!("No unread emails, checking recent emails from {}", sender);
            return self
                .mailbox
                .search(&SearchCriteria::From(sender.clone()))
                .await;
        }

        Ok(unseen)
    }

    async fn handle_message(&self, message: &ParsedMessage, mode: CycleMode) -> Disposition {
        if mode == CycleMode::Manual {
            info!(
                from = %message.sender,
                date = %message.date,
                "Processing email: {}",
                message.subject
            );
        }

        if let Some(message_id) = &message.message_id {
            if self.processed.contains(&message_id_key(message_id)) {
                info!(
                    "Email <{}> was already handled, skipping: {}",
                    message_id, message.subject
                );
                return Disposition::Duplicate;
            }
        }

        if !self.config.is_verification_subject(&message.subject) {
            debug!("Skipping non-verification email: {}", message.subject);
            return Disposition::NotVerification;
        }

        info!("New verification email: {}", message.subject);

        let artifacts = extract(&message.body);

        if let Some(link) = first_link(&artifacts) {
            if artifacts.len() > 1 {
                debug!("Ignoring {} additional link(s)", artifacts.len() - 1);
            }

            info!(link = %redact_link(link), "Opening verification link");
            let outcome = self.verifier.verify(link).await;

            return if outcome.success {
                info!(
                    final_url = %outcome.final_url.as_deref().map(redact_link).unwrap_or_default(),
                    keyword = outcome.matched_keyword.as_deref().unwrap_or("-"),
                    "Verification link opened successfully ({})",
                    outcome.detail()
                );
                Disposition::Verified(outcome)
            } else {
                warn!("Verification failed: {}", outcome.detail());
                Disposition::VerificationFailed(outcome)
            };
        }

        let found_codes = codes(&artifacts);
        if !found_codes.is_empty() {
            info!("Verification codes found: {}", found_codes.join(", "));
            return Disposition::CodesOnly(found_codes.into_iter().map(String::from).collect());
        }

        info!("No verification links or codes found");
        Disposition::NoArtifacts
    }

    fn persist(&mut self) -> Result<bool, StoreError> {
        self.processed.persist()
    }

    async fn sleep_until_next_cycle(&self) {
        let deadline = tokio::time::Instant::now() + self.config.check_interval();
        while !self.is_shutting_down() {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep((deadline - now).min(SHUTDOWN_POLL)).await;
        }
    }
}
