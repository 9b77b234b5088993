//! Scheduled notification dispatch.
//!
//! [`Dispatcher::run_batch`] is the single entry point used by the HTTP
//! trigger, the in-process cron trigger and the `dispatch` subcommand.

mod clock;
mod dispatcher;
mod error;
mod scheduler;
mod store;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::FixedClock;
pub use dispatcher::{BatchSummary, Dispatcher, DispatcherConfig};
pub use error::DispatchError;
pub use scheduler::DispatchScheduler;
pub use store::{MemoryJobStore, NotificationJobStore, StaleRecovery};
#[cfg(test)]
pub use store::UnreachableJobStore;
pub(crate) use store::abandoned_message;
