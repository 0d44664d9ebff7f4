//! Cooperative cancellation.
//!
//! Each operation class (prediction load, quick search, item initialization)
//! owns one [`OperationSlot`]. Starting a new operation supersedes the old one,
//! and the old operation's result is discarded instead of reaching view state.

mod deadline;
mod source;

pub use deadline::{cancel_after, Deadline};
pub use source::{CancellationTokenSource, OperationSlot};

pub use tokio_util::sync::CancellationToken;
