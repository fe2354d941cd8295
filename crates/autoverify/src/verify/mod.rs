//! Verification artifacts and the action taken on them.

pub mod extractor;
pub mod verifier;

pub use extractor::{codes, extract, first_link, Artifact};
pub use verifier::{
    FailureKind, HttpVerifier, LinkVerifier, VerificationOutcome, VerifyFailure,
};
