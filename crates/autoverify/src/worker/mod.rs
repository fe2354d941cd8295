pub mod poller;
pub mod report;

pub use poller::{CycleMode, Poller, PollerState};
pub use report::{CycleReport, Disposition};
