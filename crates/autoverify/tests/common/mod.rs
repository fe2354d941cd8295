//! Shared test utilities for autoverify integration tests.
//!
//! This module provides:
//! - `FakeMailbox` and `RecordingVerifier`, in-memory stand-ins for IMAP and HTTP
//! - Builders for raw RFC 5322 messages and test configurations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
