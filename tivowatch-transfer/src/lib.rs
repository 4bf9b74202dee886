//! Transfer dispatch and share resolution for tivowatch.
//!
//! - [`dispatch`] — run the external transfer client as a supervised child
//!   process with line-streamed output capture
//! - [`resolver`] — map the watch directory to a destination share label
//! - [`transfer_log`] — append-only, per-line-timestamped durable log

pub mod dispatch;
pub mod error;
pub mod resolver;
pub mod transfer_log;

pub use dispatch::Dispatch;
pub use error::TransferError;
pub use transfer_log::TransferLog;
