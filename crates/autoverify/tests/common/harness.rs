//! In-memory mailbox and verifier used to drive the poller.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use autoverify::email::{EmailError, Mailbox, SearchCriteria};
use autoverify::verify::{FailureKind, LinkVerifier, VerificationOutcome};

/// A mailbox holding messages in memory, with call recording and failure
/// injection.
pub struct FakeMailbox {
    pub uidvalidity: u32,
    pub messages: BTreeMap<u32, Vec<u8>>,
    pub unseen: BTreeSet<u32>,
    /// Fetching removes the message from `unseen`.
    pub mark_seen: bool,
    pub fail_connect: bool,
    /// Number of upcoming `search` calls that fail.
    pub failing_searches: usize,
    /// Set after the first fetch, to simulate a signal mid-cycle.
    pub shutdown_on_fetch: Option<Arc<AtomicBool>>,

    pub connected: bool,
    pub connects: usize,
    pub disconnects: usize,
    pub searches: Vec<SearchCriteria>,
    pub fetched: Vec<u32>,
}

impl FakeMailbox {
    pub fn new(uidvalidity: u32) -> Self {
        Self {
            uidvalidity,
            messages: BTreeMap::new(),
            unseen: BTreeSet::new(),
            mark_seen: false,
            fail_connect: false,
            failing_searches: 0,
            shutdown_on_fetch: None,
            connected: false,
            connects: 0,
            disconnects: 0,
            searches: Vec::new(),
            fetched: Vec::new(),
        }
    }

    /// Adds an unseen message.
    pub fn with_unseen(mut self, uid: u32, raw: Vec<u8>) -> Self {
        self.messages.insert(uid, raw);
        self.unseen.insert(uid);
        self
    }

    /// Adds a message that is already marked seen.
    pub fn with_seen(mut self, uid: u32, raw: Vec<u8>) -> Self {
        self.messages.insert(uid, raw);
        self
    }

    fn ensure_connected(&self) -> Result<(), EmailError> {
        if self.connected {
            Ok(())
        } else {
            Err(EmailError::NotConnected)
        }
    }
}

#[async_trait(?Send)]
impl Mailbox for FakeMailbox {
    async fn connect(&mut self) -> Result<(), EmailError> {
        self.connects += 1;
        if self.fail_connect {
            return Err(EmailError::ConnectionFailed("connection refused".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    async fn select_folder(&mut self, _folder: &str) -> Result<u32, EmailError> {
        self.ensure_connected()?;
        Ok(self.uidvalidity)
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, EmailError> {
        self.ensure_connected()?;
        self.searches.push(criteria.clone());

        if self.failing_searches > 0 {
            self.failing_searches -= 1;
            return Err(EmailError::ProtocolError("SEARCH failed".to_string()));
        }

        Ok(match criteria {
            SearchCriteria::UnseenFrom(_) => self.unseen.iter().copied().collect(),
            SearchCriteria::From(_) => self.messages.keys().copied().collect(),
        })
    }

    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>, EmailError> {
        self.ensure_connected()?;
        self.fetched.push(uid);

        if let Some(flag) = &self.shutdown_on_fetch {
            flag.store(true, Ordering::Relaxed);
        }
        if self.mark_seen {
            self.unseen.remove(&uid);
        }

        self.messages
            .get(&uid)
            .cloned()
            .ok_or_else(|| EmailError::ProtocolError(format!("no message with UID {}", uid)))
    }

    async fn disconnect(&mut self) -> Result<(), EmailError> {
        self.disconnects += 1;
        self.connected = false;
        Ok(())
    }
}

/// A verifier that records every link and replays scripted outcomes.
///
/// Once the script runs out every call succeeds with HTTP 200.
#[derive(Default)]
pub struct RecordingVerifier {
    pub calls: RefCell<Vec<String>>,
    script: RefCell<VecDeque<VerificationOutcome>>,
}

impl RecordingVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, outcome: VerificationOutcome) -> Self {
        self.script.borrow_mut().push_back(outcome);
        self
    }

    pub fn then_fail(self, kind: FailureKind) -> Self {
        self.then(VerificationOutcome::failed(kind, "scripted failure"))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

pub fn success_outcome() -> VerificationOutcome {
    VerificationOutcome {
        success: true,
        status: Some(200),
        ..Default::default()
    }
}

#[async_trait(?Send)]
impl LinkVerifier for RecordingVerifier {
    async fn verify(&self, link: &str) -> VerificationOutcome {
        self.calls.borrow_mut().push(link.to_string());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(success_outcome)
    }
}
