pub mod config;
pub mod email;
pub mod error;
pub mod logging;
pub mod sanitize;
pub mod secrets;
pub mod verify;
pub mod worker;

pub use config::{load_config, load_config_from_str, Config};
pub use email::{EmailError, ImapClient, Mailbox, ParsedMessage, ProcessedSet, SearchCriteria};
pub use error::{AutoVerifyError, ConfigError, LoggingError, Result, StoreError};
pub use logging::init_logging;
pub use secrets::{SecretError, SecretSource};
pub use verify::{Artifact, HttpVerifier, LinkVerifier, VerificationOutcome};
pub use worker::{CycleMode, CycleReport, Poller, PollerState};
