use crate::verify::VerificationOutcome;

/// What happened to one fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Its Message-ID was already handled under a different key.
    Duplicate,
    /// Subject does not look like a verification email.
    NotVerification,
    /// The first link was opened and classified as success.
    Verified(VerificationOutcome),
    /// The first link was opened and classified as failure.
    VerificationFailed(VerificationOutcome),
    /// No link; codes are surfaced for a human.
    CodesOnly(Vec<String>),
    NoArtifacts,
}

/// Counters for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// UIDs returned by the mailbox search.
    pub found: usize,
    /// UIDs skipped because their key was already in the processed set.
    pub already_processed: usize,
    pub duplicates: usize,
    pub not_verification: usize,
    pub verified: usize,
    pub failed: usize,
    pub codes_only: usize,
    pub no_artifacts: usize,
    /// The processed set was written at the end of the cycle.
    pub persisted: bool,
    /// Writing the processed set failed.
    pub persist_failed: bool,
}

impl CycleReport {
    pub fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Duplicate => self.duplicates += 1,
            Disposition::NotVerification => self.not_verification += 1,
            Disposition::Verified(_) => self.verified += 1,
            Disposition::VerificationFailed(_) => self.failed += 1,
            Disposition::CodesOnly(_) => self.codes_only += 1,
            Disposition::NoArtifacts => self.no_artifacts += 1,
        }
    }

    /// Messages fetched and marked processed during the cycle.
    pub fn handled(&self) -> usize {
        self.duplicates
            + self.not_verification
            + self.verified
            + self.failed
            + self.codes_only
            + self.no_artifacts
    }

    /// Number of verifier invocations.
    pub fn verification_attempts(&self) -> usize {
        self.verified + self.failed
    }
}
