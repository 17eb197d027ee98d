//! nsync-sync: the sync engine
//!
//! - `story`: the step machine that drives one sync run
//! - `resolver`: find the transfer code that opens a cloud blob
//! - `merge`: combine two repository snapshots
//! - `mode`: what kinds of interaction a run may use
//! - `frontend`: the user interface seam
//! - `guard`: at most one run at a time

pub mod error;
pub mod frontend;
pub mod guard;
pub mod merge;
pub mod message;
pub mod mode;
pub mod resolver;
pub mod session;
pub mod story;

pub use error::{SyncError, SyncResult};
pub use frontend::{HeadlessFrontend, MergeChoice, SyncFrontend};
pub use guard::{RunGuard, RunPermit};
pub use merge::merge;
pub use message::MessageKey;
pub use mode::ExecutionMode;
pub use resolver::{resolve_and_promote, try_decrypt, Resolved};
pub use story::{Outcome, StepId, SyncOptions, SyncReport, SyncStory, Transition};
